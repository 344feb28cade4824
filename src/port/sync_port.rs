//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait so the connection logic can run against a mock as well.

use super::error::PortError;
use super::traits::{SerialConfig, SerialPortAdapter};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// The OS-level timeout is the configuration's poll interval; the overall
    /// line window is enforced one layer up by [`Connection`](super::Connection).
    ///
    /// # Example
    /// ```no_run
    /// use cdc_echo_harness::port::{SerialConfig, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open(&SerialConfig::new("/dev/ttyACM0"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self, PortError> {
        let port_name = config.port_name.as_str();
        debug!(port = port_name, settings = %config.describe(), "opening serial port");

        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.poll_interval)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port.flush().map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port.set_timeout(timeout).map_err(PortError::Serial)
    }

    fn try_clone(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = self.port.try_clone().map_err(PortError::Serial)?;
        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
        }))
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}
