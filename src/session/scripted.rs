//! Scripted phase: fixed payloads, one bounded read each.

use super::echo::{EchoExpectation, ExchangeOutcome};
use super::SessionSettings;
use crate::console::Console;
use crate::error::{AppError, AppResult};
use crate::port::{decode_line, Connection};
use tracing::{info, warn};

/// One sent payload and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub expectation: EchoExpectation,
    pub outcome: ExchangeOutcome,
}

/// Results of the scripted phase, in send order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedReport {
    pub exchanges: Vec<Exchange>,
}

impl ScriptedReport {
    pub fn matched(&self) -> usize {
        self.echo_counters().count()
    }

    /// Echo counters of the matched exchanges, in send order.
    pub fn echo_counters(&self) -> impl Iterator<Item = u32> + '_ {
        self.exchanges.iter().filter_map(|x| match x.outcome {
            ExchangeOutcome::Matched { counter } => Some(counter),
            _ => None,
        })
    }

    pub fn counters_strictly_increasing(&self) -> bool {
        let counters: Vec<u32> = self.echo_counters().collect();
        counters.windows(2).all(|w| w[0] < w[1])
    }

    pub fn summary(&self) -> String {
        format!(
            "Scripted phase: {}/{} echoes matched, counters {}",
            self.matched(),
            self.exchanges.len(),
            if self.counters_strictly_increasing() {
                "strictly increasing"
            } else {
                "out of order"
            }
        )
    }
}

/// Send each payload, wait for its response, and report.
///
/// Strictly sequential, no retries: a timeout or read fault is reported and the
/// next payload goes out after the inter-message delay. A write fault ends the
/// phase with [`AppError::Io`].
pub fn run_scripted(
    conn: &mut Connection,
    settings: &SessionSettings,
    console: &Console,
) -> AppResult<ScriptedReport> {
    let mut report = ScriptedReport::default();

    for (i, payload) in settings.payloads.iter().enumerate() {
        if i > 0 && !settings.inter_message_delay.is_zero() {
            std::thread::sleep(settings.inter_message_delay);
        }

        let expectation = EchoExpectation::new(i as u32 + 1, payload.as_str());
        console.line("");
        console.line(format!("Sending message {}: {payload}", expectation.sequence));

        let written = conn.write_line(payload).map_err(AppError::Io)?;
        console.line(format!("Sent {written} bytes"));

        let outcome = match conn.read_line(settings.max_line_bytes) {
            Ok(bytes) => {
                let response = decode_line(&bytes);
                if response.is_empty() {
                    console.line("No response received (timeout)");
                } else {
                    console.line(format!("Received: {response}"));
                }
                expectation.evaluate(&response)
            }
            Err(e) => {
                warn!(error = %e, sequence = expectation.sequence, "error reading response");
                console.line(format!("Error reading response: {e}"));
                ExchangeOutcome::ReadFailed {
                    reason: e.to_string(),
                }
            }
        };

        if let ExchangeOutcome::Unexpected { received } = &outcome {
            warn!(
                expected = %expectation.expected_response(),
                received = %received,
                "response does not echo the payload"
            );
        }

        report.exchanges.push(Exchange {
            expectation,
            outcome,
        });
    }

    info!(
        matched = report.matched(),
        total = report.exchanges.len(),
        "scripted phase finished"
    );
    console.line("");
    console.line(report.summary());
    Ok(report)
}
