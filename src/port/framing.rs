//! Line framing for the echo protocol.
//!
//! Outbound messages are UTF-8 text followed by CR LF. Inbound bytes are split on
//! LF with a hard cap on line length, and decoded leniently for display.

use memchr::memchr;
use std::borrow::Cow;
use tracing::debug;

/// Terminator appended to every outbound message.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Delimiter that ends an inbound line.
pub const LINE_DELIMITER: u8 = b'\n';

/// Largest inbound line handed out in one piece.
pub const MAX_LINE_BYTES: usize = 512;

/// Encode a text message as it goes on the wire.
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    bytes.extend_from_slice(text.as_bytes());
    bytes.extend_from_slice(LINE_TERMINATOR);
    bytes
}

/// Decode a received line for display.
///
/// Invalid UTF-8 sequences are replaced, never rejected; surrounding whitespace
/// (including the CR LF terminator) is trimmed.
pub fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        debug!(len = bytes.len(), "received bytes were not valid UTF-8; replaced");
    }
    text.trim().to_string()
}

/// Accumulates received bytes and hands them out one line at a time.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Take the next complete line (delimiter included), or `max` bytes if no
    /// delimiter appears within them.
    pub fn next_line(&mut self, max: usize) -> Option<Vec<u8>> {
        let window = &self.pending[..self.pending.len().min(max)];
        if let Some(pos) = memchr(LINE_DELIMITER, window) {
            return Some(self.pending.drain(..=pos).collect());
        }
        if max > 0 && self.pending.len() >= max {
            return Some(self.pending.drain(..max).collect());
        }
        None
    }

    /// Take everything buffered, complete or not.
    pub fn take_partial(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    /// Number of bytes buffered.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
