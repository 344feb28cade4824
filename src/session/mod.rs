//! Session controller.
//!
//! A session runs two phases over one open [`Connection`](crate::port::Connection),
//! in order and never revisited:
//!
//! 1. the scripted phase ([`run_scripted`]): a fixed list of payloads, each sent,
//!    answered (or timed out) and reported before the next,
//! 2. the interactive phase ([`run_interactive`]): a background reader printing
//!    device output while the operator types lines to send, until a quit command,
//!    end of input or an interrupt.

mod echo;
mod interactive;
mod scripted;

pub use echo::{parse_echo, EchoExpectation, EchoResponse, ExchangeOutcome};
pub use interactive::{
    operator_input, run_interactive, DeviceEvent, InteractiveSummary, Termination,
};
pub use scripted::{run_scripted, Exchange, ScriptedReport};

use crate::config::Config;
use crate::port::MAX_LINE_BYTES;
use std::time::Duration;

/// Payloads of the scripted phase. Covers plain ASCII, a long line, multi-byte
/// text and shell-special characters.
pub const DEFAULT_PAYLOADS: [&str; 7] = [
    "Hello from PC!",
    "Test message 1",
    "Test message 2",
    "Are you there?",
    "This is a longer test message to check buffer handling.",
    "中文测试消息",
    "Special chars: !@#$%^&*()",
];

/// Everything both phases need besides the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub payloads: Vec<String>,
    pub inter_message_delay: Duration,
    pub quit_commands: Vec<String>,
    pub max_line_bytes: usize,
    pub show_timestamps: bool,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            payloads: config.session.payloads.clone(),
            inter_message_delay: config.session.inter_message_delay(),
            quit_commands: config.session.quit_commands.clone(),
            max_line_bytes: config.serial.max_line_bytes,
            show_timestamps: config.session.show_timestamps,
        }
    }

    /// Whether an operator line ends the interactive phase.
    pub fn is_quit_command(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.quit_commands
            .iter()
            .any(|cmd| cmd.trim().to_lowercase() == input)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            payloads: DEFAULT_PAYLOADS.iter().map(|p| p.to_string()).collect(),
            inter_message_delay: Duration::from_secs(1),
            quit_commands: vec!["quit".into(), "exit".into(), "q".into()],
            max_line_bytes: MAX_LINE_BYTES,
            show_timestamps: false,
        }
    }
}
