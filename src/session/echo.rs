//! Echo protocol expectations.
//!
//! The device answers every line with `[Echo #N] <line>`, N counting up from 1
//! since it booted. The harness only reports on this framing, it never enforces it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ECHO_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[Echo #(\d+)\] ?(.*)$").expect("echo pattern is valid"));

/// A response in the device's echo framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoResponse<'a> {
    pub counter: u32,
    pub payload: &'a str,
}

/// Split a decoded line into echo counter and payload, if it has the echo framing.
pub fn parse_echo(line: &str) -> Option<EchoResponse<'_>> {
    let caps = ECHO_LINE.captures(line)?;
    let counter = caps.get(1)?.as_str().parse().ok()?;
    let payload = caps.get(2).map_or("", |m| m.as_str());
    Some(EchoResponse { counter, payload })
}

/// A sent message and the response it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoExpectation {
    /// 1-based position in the scripted sequence.
    pub sequence: u32,
    pub payload: String,
}

impl EchoExpectation {
    pub fn new(sequence: u32, payload: impl Into<String>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// The response a freshly booted device gives.
    pub fn expected_response(&self) -> String {
        format!("[Echo #{}] {}", self.sequence, self.payload)
    }

    /// Compare a decoded response against this expectation.
    ///
    /// The counter is not required to equal `sequence`: a device that already
    /// echoed lines before the run starts further along. Payloads are compared
    /// without surrounding whitespace, since received lines are trimmed.
    pub fn evaluate(&self, received: &str) -> ExchangeOutcome {
        if received.is_empty() {
            return ExchangeOutcome::Timeout;
        }
        match parse_echo(received) {
            Some(echo) if echo.payload.trim() == self.payload.trim() => ExchangeOutcome::Matched {
                counter: echo.counter,
            },
            _ => ExchangeOutcome::Unexpected {
                received: received.to_string(),
            },
        }
    }
}

/// What happened to one scripted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Echoed back unchanged.
    Matched { counter: u32 },
    /// Something arrived, but not the echo of this payload.
    Unexpected { received: String },
    /// Nothing arrived within the read window.
    Timeout,
    /// The read itself failed; the phase carried on.
    ReadFailed { reason: String },
}

impl fmt::Display for ExchangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { counter } => write!(f, "echoed (#{counter})"),
            Self::Unexpected { received } => write!(f, "unexpected response '{received}'"),
            Self::Timeout => f.write_str("no response"),
            Self::ReadFailed { reason } => write!(f, "read failed: {reason}"),
        }
    }
}
