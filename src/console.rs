//! Operator-facing output.
//!
//! Everything the harness shows the operator goes through a [`Console`]; logs go
//! to stderr via `tracing`. The console is cheap to clone and shared by the
//! interactive writer loop and the display task.

use parking_lot::Mutex;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
pub struct Console {
    out: Sink,
}

impl Console {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// A console writing into memory, plus a handle to read what was written.
    pub fn captured() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::from_writer(captured.clone()), captured)
    }

    /// Print one line.
    pub fn line(&self, text: impl Display) {
        let mut out = self.out.lock();
        // Output errors (closed pipe, full disk) are not worth aborting a session for.
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    /// Print text without a newline, e.g. an input prompt.
    pub fn prompt(&self, text: impl Display) {
        let mut out = self.out.lock();
        let _ = write!(out, "{text}");
        let _ = out.flush();
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// In-memory console output.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
