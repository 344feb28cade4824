//! Port abstraction layer for serial communication.
//!
//! Provides the adapter trait with a real and a mock implementation, line
//! framing, and the [`Connection`] that owns an open port.

pub mod connection;
pub mod error;
pub mod framing;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use connection::{Connection, LineReader};
pub use error::PortError;
pub use framing::{decode_line, encode_line, LineBuffer, MAX_LINE_BYTES};
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
