//! Configuration module for the echo harness.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ECHO_HARNESS_CONFIG` environment variable (explicit path)
//! 2. `./echo-harness.toml` (current directory)
//! 3. `~/.config/cdc-echo-harness/config.toml` (or the platform equivalent)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Scalar values can be overridden via environment variables.
//! The pattern is: `ECHO_HARNESS_<SECTION>_<KEY>`
//!
//! Examples:
//! - `ECHO_HARNESS_SERIAL_BAUD_RATE=9600`
//! - `ECHO_HARNESS_DISCOVERY_PRODUCT_ID=0x0008`
//! - `ECHO_HARNESS_SESSION_SHOW_TIMESTAMPS=true`
//!
//! # Example
//!
//! ```rust,ignore
//! use cdc_echo_harness::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Baud: {}", config.serial.baud_rate);
//! println!("Device: {:04x}:{:04x}", config.discovery.vendor_id, config.discovery.product_id);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, parse_usb_id, resolve_config_path, ConfigLoader};
pub use schema::{
    Config, DiscoveryConfig, LogFormat, LoggingConfig, SerialConfig, SessionConfig,
};
