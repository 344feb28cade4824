//! Resolving a discovery report down to one device.

use super::{DeviceCandidate, DiscoveryReport, MatchKind};
use crate::console::Console;
use crate::error::{AppError, AppResult};
use std::io::BufRead;
use tracing::info;

/// Pick the device to connect to.
///
/// No match prints the full enumeration and fails with `NoDeviceFound`; a single
/// match is taken without asking; several matches are listed and one line of
/// `input` chooses (1-based). A bad choice fails with `InvalidSelection`, there
/// is no second attempt.
pub fn select_device(
    report: DiscoveryReport,
    console: &Console,
    input: &mut dyn BufRead,
) -> AppResult<DeviceCandidate> {
    for ranked in &report.matches {
        let label = match ranked.kind {
            MatchKind::KnownIdentity => "Found echo device",
            MatchKind::Heuristic => "Found potential CDC device",
        };
        console.line(format!("{label}: {}", ranked.candidate));
    }

    let DiscoveryReport { all, mut matches } = report;

    match matches.len() {
        0 => {
            console.line("No CDC-ACM devices found.");
            console.line("Available ports:");
            if all.is_empty() {
                console.line("  (none)");
            }
            for candidate in &all {
                console.line(format!("  {}", candidate.diagnostic_line()));
            }
            Err(AppError::NoDeviceFound { available: all })
        }
        1 => {
            let chosen = matches.remove(0).candidate;
            info!(port = %chosen.port_name, "auto-selected the only candidate");
            Ok(chosen)
        }
        n => {
            console.line("Multiple CDC-ACM devices found:");
            for (i, ranked) in matches.iter().enumerate() {
                console.line(format!("  {}: {}", i + 1, ranked.candidate));
            }
            console.prompt(format!("Select device (1-{n}): "));

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            let answer = answer.trim();

            let index = answer
                .parse::<usize>()
                .ok()
                .filter(|choice| (1..=n).contains(choice))
                .ok_or_else(|| {
                    console.line("Invalid selection.");
                    AppError::InvalidSelection(answer.to_string())
                })?;

            let chosen = matches.swap_remove(index - 1).candidate;
            info!(port = %chosen.port_name, "operator selected device");
            Ok(chosen)
        }
    }
}
