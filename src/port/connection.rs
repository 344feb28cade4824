//! Connection lifecycle and line-oriented I/O over a serial port adapter.

use super::error::PortError;
use super::framing::{encode_line, LineBuffer, MAX_LINE_BYTES};
use super::sync_port::SyncSerialPort;
use super::traits::{SerialConfig, SerialPortAdapter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// An open serial connection.
///
/// Owns the port exclusively. The read direction can be split off with
/// [`Connection::reader`]; closing the connection (explicitly or by dropping it)
/// makes every reader return [`PortError::NotOpen`] within one poll interval.
#[derive(Debug)]
pub struct Connection {
    port: Box<dyn SerialPortAdapter>,
    config: SerialConfig,
    open: Arc<AtomicBool>,
    buffer: LineBuffer,
}

impl Connection {
    /// Open the port named in `config` and wait out the device's settle delay.
    pub fn open(config: &SerialConfig) -> Result<Self, PortError> {
        let port = SyncSerialPort::open(config)?;
        let connection = Self::from_adapter(Box::new(port), config.clone())?;
        info!(
            port = %config.port_name,
            settings = %config.describe(),
            "serial port opened"
        );
        Ok(connection)
    }

    /// Wrap an already opened adapter.
    ///
    /// Applies the poll interval as the adapter timeout, then sleeps for the
    /// settle delay before returning.
    pub fn from_adapter(
        mut port: Box<dyn SerialPortAdapter>,
        config: SerialConfig,
    ) -> Result<Self, PortError> {
        port.set_timeout(config.poll_interval)?;

        if !config.settle_delay.is_zero() {
            debug!(delay = ?config.settle_delay, "waiting for device to settle");
            std::thread::sleep(config.settle_delay);
        }

        Ok(Self {
            port,
            config,
            open: Arc::new(AtomicBool::new(true)),
            buffer: LineBuffer::new(),
        })
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Write all of `data` and flush; returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PortError> {
        if !self.is_open() {
            return Err(PortError::NotOpen);
        }

        let mut written = 0;
        while written < data.len() {
            match self.port.write_bytes(&data[written..])? {
                0 => {
                    return Err(PortError::Io(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "serial port accepted no bytes",
                    )))
                }
                n => written += n,
            }
        }
        self.port.flush()?;

        trace!(bytes = written, "wrote to serial port");
        Ok(written)
    }

    /// Encode `text` with the line terminator and write it.
    pub fn write_line(&mut self, text: &str) -> Result<usize, PortError> {
        self.write(&encode_line(text))
    }

    /// Read one line of at most `max` bytes within the configured read window.
    ///
    /// An empty result means nothing arrived in time; it is not an error.
    pub fn read_line(&mut self, max: usize) -> Result<Vec<u8>, PortError> {
        let line = read_line_with(
            self.port.as_mut(),
            &mut self.buffer,
            &self.open,
            self.config.read_timeout,
            max,
        )?;
        Ok(line.unwrap_or_else(|| self.buffer.take_partial()))
    }

    /// Split off an independent read handle bound to this connection's lifetime.
    ///
    /// Bytes already buffered by [`Connection::read_line`] move to the reader.
    pub fn reader(&mut self) -> Result<LineReader, PortError> {
        if !self.is_open() {
            return Err(PortError::NotOpen);
        }

        let mut port = self.port.try_clone()?;
        port.set_timeout(self.config.poll_interval)?;

        let mut buffer = LineBuffer::new();
        buffer.extend(&self.buffer.take_partial());

        Ok(LineReader {
            port,
            open: Arc::clone(&self.open),
            buffer,
            read_timeout: self.config.read_timeout,
        })
    }

    /// Mark the connection closed. Idempotent.
    pub fn close(&mut self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!(port = %self.port.name(), "serial port closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read half of a [`Connection`], for use on a background task.
#[derive(Debug)]
pub struct LineReader {
    port: Box<dyn SerialPortAdapter>,
    open: Arc<AtomicBool>,
    buffer: LineBuffer,
    read_timeout: Duration,
}

impl LineReader {
    /// Wait up to one read window for the next complete line.
    ///
    /// Unlike [`Connection::read_line`], an expired window yields `None` and
    /// keeps any partial line buffered for the next call. A line is complete at
    /// the delimiter or at `max` bytes. Fails with [`PortError::NotOpen`] once
    /// the connection is closed.
    pub fn next_line(&mut self, max: usize) -> Result<Option<Vec<u8>>, PortError> {
        read_line_with(
            self.port.as_mut(),
            &mut self.buffer,
            &self.open,
            self.read_timeout,
            max,
        )
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

fn read_line_with(
    port: &mut dyn SerialPortAdapter,
    buffer: &mut LineBuffer,
    open: &AtomicBool,
    window: Duration,
    max: usize,
) -> Result<Option<Vec<u8>>, PortError> {
    let max = max.clamp(1, MAX_LINE_BYTES);
    let deadline = Instant::now() + window;
    let mut chunk = [0u8; MAX_LINE_BYTES];

    loop {
        if !open.load(Ordering::Acquire) {
            return Err(PortError::NotOpen);
        }
        if let Some(line) = buffer.next_line(max) {
            return Ok(Some(line));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }

        let want = max - buffer.len();
        match port.read_bytes(&mut chunk[..want]) {
            Ok(n) => buffer.extend(&chunk[..n]),
            Err(e) if e.is_timeout() => {}
            Err(_) if !open.load(Ordering::Acquire) => return Err(PortError::NotOpen),
            Err(e) => return Err(e),
        }
    }
}
