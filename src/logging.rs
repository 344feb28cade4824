//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never interleave with the operator console on
//! stdout. `RUST_LOG` wins over the configured level.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
