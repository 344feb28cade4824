//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial port behavior without
//! requiring actual hardware. Reads block up to the handle's timeout like a real
//! port, and an optional echo responder plays the part of the device firmware.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answers each received line the way the echo firmware does.
#[derive(Debug, Default)]
struct EchoResponder {
    /// Bytes received since the last line terminator.
    partial: Vec<u8>,
    /// Number of lines echoed so far.
    counter: u32,
}

impl EchoResponder {
    /// Feed written bytes; returns the responses for every completed line.
    fn feed(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for &byte in data {
            if byte == b'\n' {
                let mut line = std::mem::take(&mut self.partial);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                self.counter += 1;
                out.extend_from_slice(format!("[Echo #{}] ", self.counter).as_bytes());
                out.extend_from_slice(&line);
                out.extend_from_slice(b"\r\n");
            } else {
                self.partial.push(byte);
            }
        }
        out
    }
}

/// Inner state of the mock port, shared by every handle cloned from it.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Simulated device firmware, if enabled.
    echo: Option<EchoResponder>,
    /// Error returned by the next read.
    read_fault: Option<io::ErrorKind>,
    /// Error returned by the next write.
    write_fault: Option<io::ErrorKind>,
    /// Whether the device has been unplugged.
    disconnected: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    data_ready: Condvar,
}

/// Mock serial port implementation for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Echo written lines back as `[Echo #N] <line>` like the device firmware
/// - Inspect what data was written
/// - Inject read and write faults, or unplug the device
///
/// # Example
/// ```
/// use cdc_echo_harness::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::with_echo("MOCK0");
/// port.write_bytes(b"ping\r\n").unwrap();
///
/// let mut buffer = [0u8; 32];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"[Echo #1] ping\r\n");
/// assert_eq!(port.get_write_log(), vec![b"ping\r\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// Read timeout of this handle.
    timeout: Duration,
    /// State shared between cloned handles.
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new mock serial port that never answers on its own.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: Duration::from_millis(100),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Create a mock port that echoes every written line with an incrementing marker.
    pub fn with_echo(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.shared.state.lock().echo = Some(EchoResponder::default());
        port
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    ///
    /// Wakes any handle currently blocked in a read.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.data_ready.notify_all();
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// Make the next read fail with the given I/O error kind.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.shared.state.lock().read_fault = Some(kind);
        self.shared.data_ready.notify_all();
    }

    /// Make the next write fail with the given I/O error kind.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.shared.state.lock().write_fault = Some(kind);
    }

    /// Simulate the device disappearing: pending and future I/O fails.
    pub fn disconnect(&self) {
        self.shared.state.lock().disconnected = true;
        self.shared.data_ready.notify_all();
    }

    /// Number of lines the echo responder has answered.
    pub fn echo_count(&self) -> u32 {
        self.shared
            .state
            .lock()
            .echo
            .as_ref()
            .map_or(0, |echo| echo.counter)
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.disconnected {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        if let Some(kind) = state.write_fault.take() {
            return Err(PortError::Io(io::Error::new(kind, "injected write fault")));
        }

        state.write_log.push(data.to_vec());

        let response = state.echo.as_mut().map(|echo| echo.feed(data));
        if let Some(response) = response.filter(|r| !r.is_empty()) {
            state.read_queue.extend(response);
            self.shared.data_ready.notify_all();
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.shared.state.lock();

        loop {
            if let Some(kind) = state.read_fault.take() {
                return Err(PortError::Io(io::Error::new(kind, "injected read fault")));
            }

            if !state.read_queue.is_empty() {
                let n = buffer.len().min(state.read_queue.len());
                for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }

            if state.disconnected {
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "device disconnected",
                )));
            }

            if self
                .shared
                .data_ready
                .wait_until(&mut state, deadline)
                .timed_out()
                && state.read_queue.is_empty()
                && state.read_fault.is_none()
            {
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "Operation timed out",
                )));
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.timeout = timeout;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
