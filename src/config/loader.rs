//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ECHO_HARNESS";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "echo-harness.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ECHO_HARNESS_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ECHO_HARNESS_CONFIG` environment variable (explicit path)
    /// 2. `./echo-harness.toml` (current directory)
    /// 3. `<platform config dir>/cdc-echo-harness/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %path.display(), "{CONFIG_PATH_ENV} points to a missing file; ignoring");
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cdc-echo-harness")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `ECHO_HARNESS_<key>` and parse it, if set.
fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, what)),
        Err(_) => Ok(None),
    }
}

/// Parse a USB identifier written either as hex (`0x0D7D`) or decimal.
pub fn parse_usb_id(value: &str) -> Option<u16> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn env_usb_id(key: &str) -> ConfigResult<Option<u16>> {
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(val) => parse_usb_id(&val)
            .map(Some)
            .ok_or_else(|| ConfigError::env_parse(var, "Invalid USB identifier")),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ECHO_HARNESS_<SECTION>_<KEY>`
/// For example:
/// - `ECHO_HARNESS_SERIAL_BAUD_RATE=9600`
/// - `ECHO_HARNESS_DISCOVERY_VENDOR_ID=0x04B4`
/// - `ECHO_HARNESS_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some(val) = env_value("SERIAL_BAUD_RATE", "Invalid baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = env_value("SERIAL_TIMEOUT_MS", "Invalid timeout")? {
        config.serial.timeout_ms = val;
    }
    if let Some(val) = env_value("SERIAL_POLL_INTERVAL_MS", "Invalid poll interval")? {
        config.serial.poll_interval_ms = val;
    }
    if let Some(val) = env_value("SERIAL_SETTLE_DELAY_MS", "Invalid settle delay")? {
        config.serial.settle_delay_ms = val;
    }

    // Discovery overrides
    if let Some(val) = env_usb_id("DISCOVERY_VENDOR_ID")? {
        config.discovery.vendor_id = val;
    }
    if let Some(val) = env_usb_id("DISCOVERY_PRODUCT_ID")? {
        config.discovery.product_id = val;
    }

    // Session overrides
    if let Some(val) = env_value("SESSION_INTER_MESSAGE_DELAY_MS", "Invalid delay")? {
        config.session.inter_message_delay_ms = val;
    }
    if let Some(val) = env_value("SESSION_SHOW_TIMESTAMPS", "Expected true or false")? {
        config.session.show_timestamps = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{ENV_PREFIX}_LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = env_value("LOGGING_FORMAT", "Expected json, pretty or compact")? {
        config.logging.format = val;
    }

    Ok(())
}
