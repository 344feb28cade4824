//! Interactive phase: background device reader plus operator-driven writer.
//!
//! The reader runs as a blocking task that owns the read half of the
//! connection and forwards decoded lines over a channel to a display task. The
//! writer loop waits for operator lines and sends them. Closing the connection
//! stops the reader; the reader dropping its sender stops the display task.

use super::SessionSettings;
use crate::console::Console;
use crate::error::{AppError, AppResult};
use crate::port::{decode_line, Connection, LineReader, PortError};
use chrono::Local;
use parking_lot::Mutex;
use std::future::Future;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const PROMPT: &str = "You: ";

/// Pause after a failed read so a persistently failing port does not spin.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Operator lines buffered between the stdin thread and the writer loop.
const INPUT_QUEUE_DEPTH: usize = 16;

/// Something the reader task observed on the device side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A complete, decoded, non-empty line.
    Line(String),
    /// A read failed while the connection was still open. Repeats of the
    /// same failure are reported once.
    ReadError(String),
    /// The device went away; the reader has stopped.
    Disconnected(String),
}

/// Why the interactive phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The operator typed a quit command.
    Sentinel,
    /// An interrupt arrived while waiting for input.
    Interrupted,
    /// The operator input stream ended.
    InputClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveSummary {
    pub lines_sent: usize,
    pub lines_received: usize,
    pub ended_by: Termination,
}

/// Forward operator lines from stdin on a dedicated thread.
///
/// A console read cannot be cancelled portably; when the phase ends for another
/// reason the thread stays parked in `read_line` until the process exits.
pub fn operator_input() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(INPUT_QUEUE_DEPTH);
    std::thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut lines = stdin.lock();
            loop {
                let mut line = String::new();
                match lines.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = line.trim_end_matches(['\r', '\n']).to_string();
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read operator input");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Run the interactive phase until a quit command, end of input or `interrupt`.
///
/// Consumes the connection: it is closed on every exit path, and the reader
/// task is joined before this returns. A write fault ends the phase with
/// [`AppError::Io`].
pub async fn run_interactive<I>(
    mut conn: Connection,
    settings: &SessionSettings,
    mut input: mpsc::Receiver<String>,
    interrupt: I,
    console: Console,
) -> AppResult<InteractiveSummary>
where
    I: Future<Output = ()>,
{
    console.line("");
    console.line(format!(
        "Entering interactive mode (type '{}' to exit)...",
        settings.quit_commands.first().map_or("quit", String::as_str)
    ));
    console.line("Type messages and press Enter to send them to the device.");

    let reader = conn
        .reader()
        .map_err(|e| AppError::connection(conn.port_name(), e))?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let max_line = settings.max_line_bytes;
    let reader_task = tokio::task::spawn_blocking(move || pump_lines(reader, events_tx, max_line));
    let display_task = tokio::spawn(display(events_rx, console.clone(), settings.show_timestamps));

    // Writes run on the blocking pool; the writer loop is the only user.
    let conn = Arc::new(Mutex::new(conn));
    let mut lines_sent = 0;

    tokio::pin!(interrupt);
    let outcome = loop {
        console.prompt(PROMPT);

        let line = tokio::select! {
            biased;
            _ = &mut interrupt => {
                console.line("");
                console.line("Exiting interactive mode...");
                break Ok(Termination::Interrupted);
            }
            line = input.recv() => line,
        };

        let Some(line) = line else {
            console.line("");
            break Ok(Termination::InputClosed);
        };
        if settings.is_quit_command(&line) {
            break Ok(Termination::Sentinel);
        }

        let writer = Arc::clone(&conn);
        let written = tokio::task::spawn_blocking(move || writer.lock().write_line(&line))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))
            .and_then(|result| result);

        match written {
            Ok(n) => {
                lines_sent += 1;
                debug!(bytes = n, "operator line sent");
            }
            Err(e) => {
                console.line(format!("Write error: {e}"));
                break Err(AppError::Io(e));
            }
        }
    };

    conn.lock().close();
    if let Err(e) = reader_task.await {
        warn!(error = %e, "reader task ended abnormally");
    }
    let lines_received = display_task.await.unwrap_or_default();
    console.line("Serial port closed.");

    let ended_by = outcome?;
    info!(?ended_by, lines_sent, lines_received, "interactive phase finished");
    Ok(InteractiveSummary {
        lines_sent,
        lines_received,
        ended_by,
    })
}

/// Reader loop: runs until the connection closes, the device disappears or
/// nobody listens anymore.
fn pump_lines(
    mut reader: LineReader,
    events: mpsc::UnboundedSender<DeviceEvent>,
    max_line: usize,
) {
    let mut last_error: Option<String> = None;

    while !events.is_closed() {
        let event = match reader.next_line(max_line) {
            Ok(None) => continue,
            Ok(Some(bytes)) => {
                last_error = None;
                let line = decode_line(&bytes);
                if line.is_empty() {
                    continue;
                }
                DeviceEvent::Line(line)
            }
            Err(PortError::NotOpen) => break,
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, "device disconnected, reader stopping");
                let _ = events.send(DeviceEvent::Disconnected(e.to_string()));
                break;
            }
            Err(e) => {
                std::thread::sleep(READ_ERROR_BACKOFF);
                if !reader.is_open() {
                    break;
                }
                let reason = e.to_string();
                if last_error.as_deref() == Some(reason.as_str()) {
                    debug!(error = %e, "read error repeated");
                    continue;
                }
                warn!(error = %e, "read error");
                last_error = Some(reason.clone());
                DeviceEvent::ReadError(reason)
            }
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!("reader task stopped");
}

/// Display sink: prints device events and returns how many lines it showed.
async fn display(
    mut events: mpsc::UnboundedReceiver<DeviceEvent>,
    console: Console,
    show_timestamps: bool,
) -> usize {
    let mut shown = 0;
    while let Some(event) = events.recv().await {
        let stamp = if show_timestamps {
            format!("[{}] ", Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        console.line("");
        match event {
            DeviceEvent::Line(line) => {
                shown += 1;
                console.line(format!("{stamp}Device: {line}"));
            }
            DeviceEvent::ReadError(reason) => console.line(format!("{stamp}Read error: {reason}")),
            DeviceEvent::Disconnected(reason) => console.line(format!(
                "{stamp}Read error: {reason} (device disconnected, no further output)"
            )),
        }
        console.prompt(PROMPT);
    }
    shown
}
