//! Command-line front end: resolve a port, open it, run both session phases.

use crate::config::Config;
use crate::console::Console;
use crate::discovery::{self, DeviceMatcher, SystemEnumerator};
use crate::error::{AppError, AppResult};
use crate::port::Connection;
use crate::session::{
    operator_input, run_interactive, run_scripted, InteractiveSummary, ScriptedReport,
    SessionSettings,
};
use clap::Parser;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{info, warn};

const BANNER: &str = "CDC-ACM Echo Harness";

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "cdc-echo-harness",
    version,
    about = "Exercise a USB CDC-ACM echo device: scripted echo checks, then an interactive console.",
    long_about = "Finds the echo device (or uses PORT), sends a fixed set of test messages and \
                  reports each echo, then forwards typed lines to the device while printing \
                  everything it sends back. Type 'quit', 'exit' or 'q', or press Ctrl-C, to leave."
)]
pub struct Cli {
    /// Serial port to use, e.g. /dev/ttyACM0 or COM5. Skips device discovery.
    pub port: Option<String>,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub scripted: ScriptedReport,
    pub interactive: InteractiveSummary,
}

/// Full run against the host's real ports, stdin and Ctrl-C.
pub async fn run(cli: Cli, config: Config) -> AppResult<SessionOutcome> {
    let console = Console::stdout();
    console.line(BANNER);
    console.line("=".repeat(BANNER.len()));

    let port_name = match cli.port {
        Some(port) => {
            console.line(format!("Using specified port: {port}"));
            port
        }
        None => {
            let matcher = DeviceMatcher::new(&config.discovery);
            let picker = console.clone();
            tokio::task::spawn_blocking(move || {
                let report = discovery::discover(&SystemEnumerator, &matcher)?;
                let stdin = std::io::stdin();
                discovery::select_device(report, &picker, &mut stdin.lock())
            })
            .await
            .map_err(|e| AppError::Console(std::io::Error::other(e)))??
            .port_name
        }
    };

    console.line("");
    console.line(format!("Opening serial port: {port_name}"));
    let line_config = config.serial.line_config(port_name.as_str());
    let conn = tokio::task::spawn_blocking(move || Connection::open(&line_config))
        .await
        .map_err(|e| AppError::Console(std::io::Error::other(e)))?
        .map_err(|e| AppError::connection(port_name.as_str(), e))?;

    console.line(format!("Serial port opened: {}", conn.port_name()));
    console.line(format!("Settings: {}", conn.config().describe()));

    let input = operator_input()?;
    run_session(
        conn,
        SessionSettings::from_config(&config),
        input,
        interrupt_signal(),
        console,
    )
    .await
}

/// Run the scripted phase, then the interactive phase, over one connection.
///
/// The connection is closed on every path out of here.
pub async fn run_session<I>(
    mut conn: Connection,
    settings: SessionSettings,
    input: mpsc::Receiver<String>,
    interrupt: I,
    console: Console,
) -> AppResult<SessionOutcome>
where
    I: Future<Output = ()>,
{
    console.line("");
    console.line("Sending test messages...");

    let scripted_settings = settings.clone();
    let scripted_console = console.clone();
    let (mut conn, scripted) = tokio::task::spawn_blocking(move || {
        let report = run_scripted(&mut conn, &scripted_settings, &scripted_console);
        (conn, report)
    })
    .await
    .map_err(|e| AppError::Console(std::io::Error::other(e)))?;

    let scripted = match scripted {
        Ok(report) => report,
        Err(e) => {
            conn.close();
            console.line("Serial port closed.");
            return Err(e);
        }
    };

    let interactive = run_interactive(conn, &settings, input, interrupt, console).await?;
    info!(
        matched = scripted.matched(),
        sent = interactive.lines_sent,
        received = interactive.lines_received,
        "session finished"
    );
    Ok(SessionOutcome {
        scripted,
        interactive,
    })
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
