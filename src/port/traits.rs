//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock implementations to be used interchangeably, plus the line
//! configuration a connection is opened with.

use super::error::PortError;
use std::fmt;
use std::time::Duration;

/// Baud rate the echo firmware is built for.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Window a single line read may wait for data.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Granularity of blocking reads; bounds how long a closed connection takes to be noticed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time the device needs after enumeration before it accepts data.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Parameters a connection is opened with.
///
/// The echo device has a fixed line setup (one baud rate, 8-N-1); the constructor
/// produces exactly that, callers only adjust timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// System path or name of the port (e.g. "/dev/ttyACM0" or "COM3").
    pub port_name: String,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Overall window for one `read_line` call.
    pub read_timeout: Duration,

    /// Timeout applied to each underlying read.
    pub poll_interval: Duration,

    /// Fixed wait between opening the port and the first write.
    pub settle_delay: Duration,
}

impl SerialConfig {
    /// Echo-device line setup for the given port: 115200 baud, 8-N-1, no flow control.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Line settings in the usual `<baud> baud, <bits>-<parity>-<stop>` form.
    pub fn describe(&self) -> String {
        format!(
            "{} baud, {}-{}-{}",
            self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        write!(f, "{n}")
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parity::None => "N",
            Parity::Odd => "O",
            Parity::Even => "E",
        })
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopBits::One => "1",
            StopBits::Two => "2",
        })
    }
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until everything written so far has been handed to the device.
    fn flush(&mut self) -> Result<(), PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured timeout. Returns the number of bytes
    /// actually read; an elapsed timeout is reported as an `Io` error of kind
    /// `TimedOut` or `WouldBlock` (see [`PortError::is_timeout`]).
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Set the timeout for subsequent reads.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Open a second handle onto the same port.
    ///
    /// Used to split a connection into independent read and write directions.
    fn try_clone(&self) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
