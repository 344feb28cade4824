//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::{self, SerialConfig as LineConfig, MAX_LINE_BYTES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line timing
    pub serial: SerialConfig,
    /// Device identity used for auto-detection
    pub discovery: DiscoveryConfig,
    /// Scripted and interactive phase settings
    pub session: SessionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that would otherwise fail deep inside a session.
    pub fn validate(&self) -> ConfigResult<()> {
        let serial = &self.serial;
        if serial.baud_rate == 0 {
            return Err(ConfigError::validation("serial.baud_rate", "must be non-zero"));
        }
        if serial.timeout_ms == 0 {
            return Err(ConfigError::validation("serial.timeout_ms", "must be non-zero"));
        }
        if serial.poll_interval_ms == 0 || serial.poll_interval_ms > serial.timeout_ms {
            return Err(ConfigError::validation(
                "serial.poll_interval_ms",
                "must be non-zero and not larger than serial.timeout_ms",
            ));
        }
        if serial.max_line_bytes == 0 || serial.max_line_bytes > MAX_LINE_BYTES {
            return Err(ConfigError::validation(
                "serial.max_line_bytes",
                format!("must be between 1 and {MAX_LINE_BYTES}"),
            ));
        }
        if self
            .discovery
            .description_patterns
            .iter()
            .any(|group| group.is_empty() || group.iter().any(|term| term.trim().is_empty()))
        {
            return Err(ConfigError::validation(
                "discovery.description_patterns",
                "pattern groups and their terms must not be empty",
            ));
        }
        if self.session.quit_commands.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::validation(
                "session.quit_commands",
                "at least one quit command is required",
            ));
        }
        Ok(())
    }
}

/// Serial line section.
///
/// Only timing and the baud rate are configurable; framing stays 8-N-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate the device firmware expects
    pub baud_rate: u32,
    /// Window for one line read, in milliseconds
    pub timeout_ms: u64,
    /// Granularity of blocking reads, in milliseconds
    pub poll_interval_ms: u64,
    /// Wait after opening before the first write, in milliseconds
    pub settle_delay_ms: u64,
    /// Largest inbound line handed out at once
    pub max_line_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: port::DEFAULT_BAUD_RATE,
            timeout_ms: port::DEFAULT_READ_TIMEOUT.as_millis() as u64,
            poll_interval_ms: port::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            settle_delay_ms: port::DEFAULT_SETTLE_DELAY.as_millis() as u64,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

impl SerialConfig {
    /// Build the line configuration for a specific port.
    pub fn line_config(&self, port_name: impl Into<String>) -> LineConfig {
        LineConfig {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            ..LineConfig::new(port_name)
        }
    }
}

/// Device identity section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// USB vendor ID reserved for the echo device
    pub vendor_id: u16,
    /// USB product ID reserved for the echo device
    pub product_id: u16,
    /// Fallback description heuristics: a port matches when every term of any
    /// one group occurs in its description (case-insensitive)
    pub description_patterns: Vec<Vec<String>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let group = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Self {
            vendor_id: 0x0D7D,
            product_id: 0x1234,
            description_patterns: vec![
                group(&["CDC"]),
                group(&["SERIAL", "USB"]),
                group(&["ZYNQ"]),
                group(&["VIRTUAL", "COM"]),
            ],
        }
    }
}

/// Session section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Messages sent, in order, during the scripted phase
    pub payloads: Vec<String>,
    /// Pause between scripted messages, in milliseconds
    pub inter_message_delay_ms: u64,
    /// Operator inputs that end the interactive phase (case-insensitive)
    pub quit_commands: Vec<String>,
    /// Prefix device output with the local time
    pub show_timestamps: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            payloads: crate::session::DEFAULT_PAYLOADS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            inter_message_delay_ms: 1000,
            quit_commands: vec!["quit".to_string(), "exit".to_string(), "q".to_string()],
            show_timestamps: false,
        }
    }
}

impl SessionConfig {
    pub fn inter_message_delay(&self) -> Duration {
        Duration::from_millis(self.inter_message_delay_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
