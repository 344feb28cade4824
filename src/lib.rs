//! CDC-ACM echo harness library
//!
//! Host-side tooling for exercising a USB CDC-ACM echo device: find it, open
//! it, run a scripted echo check and then an interactive console.
//!
//! # Modules
//!
//! - `port`: serial transport, line framing and a mock device
//! - `discovery`: enumeration, ranking and selection of candidate ports
//! - `session`: the scripted and interactive phases
//! - `config`: TOML configuration with environment overrides
//! - `app`: command-line front end tying the pieces together
//! - `console`, `logging`, `error`: operator output, diagnostics and errors

pub mod app;
pub mod config;
pub mod console;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod port;
pub mod session;

pub use app::{run, run_session, Cli, SessionOutcome};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use console::{CapturedOutput, Console};
pub use discovery::{
    discover, select_device, DeviceCandidate, DeviceMatcher, DiscoveryReport, MatchKind,
    PortEnumerator, StaticEnumerator, SystemEnumerator,
};
pub use error::{AppError, AppResult};
pub use port::{
    Connection, DataBits, FlowControl, LineReader, MockSerialPort, Parity, PortError,
    SerialConfig, SerialPortAdapter, StopBits, SyncSerialPort,
};
pub use session::{
    run_interactive, run_scripted, InteractiveSummary, ScriptedReport, SessionSettings,
    Termination,
};
