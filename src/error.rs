use crate::config::ConfigError;
use crate::discovery::DeviceCandidate;
use crate::port::PortError;
use thiserror::Error;

/// Unified application error type.
///
/// Every variant is fatal to the run; in-phase read faults and timeouts never
/// reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Nothing matched the device identity or the description heuristics.
    /// Carries the full enumeration for diagnostics.
    #[error("No CDC-ACM device found ({} serial port(s) present)", .available.len())]
    NoDeviceFound { available: Vec<DeviceCandidate> },

    /// The operator's choice among several candidates was not usable.
    #[error("Invalid selection: '{0}'")]
    InvalidSelection(String),

    /// The port could not be opened.
    #[error("Could not open {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: PortError,
    },

    /// Writing to the device failed.
    #[error("Write to device failed: {0}")]
    Io(#[source] PortError),

    /// Serial ports could not be enumerated at all.
    #[error("Could not enumerate serial ports: {0}")]
    Enumeration(#[source] PortError),

    /// Operator console I/O failed.
    #[error("Console I/O failed: {0}")]
    Console(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    pub fn connection(port: impl Into<String>, source: PortError) -> Self {
        Self::Connection {
            port: port.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type AppResult<T> = Result<T, AppError>;
