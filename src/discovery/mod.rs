//! Device discovery.
//!
//! Enumerates serial endpoints, ranks the ones that look like the echo device
//! and resolves the final choice (see [`select_device`]).
//!
//! Classification, per candidate:
//! 1. exact vendor/product ID match: ranked first,
//! 2. description heuristic match,
//! 3. anything else is excluded but kept for the diagnostic listing.
//!
//! Within a class the enumeration order is preserved.

mod enumerator;
mod select;

pub use enumerator::{PortEnumerator, StaticEnumerator, SystemEnumerator};
pub use select::select_device;

#[cfg(test)]
pub use enumerator::MockPortEnumerator;

use crate::config::DiscoveryConfig;
use crate::error::{AppError, AppResult};
use std::fmt;
use tracing::{debug, info};

/// A serial endpoint seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub port_name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub description: String,
}

impl DeviceCandidate {
    pub fn new(
        port_name: impl Into<String>,
        vid: Option<u16>,
        pid: Option<u16>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            vid,
            pid,
            description: description.into(),
        }
    }

    /// `port - description (VID: 0x...., PID: 0x....)`, as shown in diagnostics.
    pub fn diagnostic_line(&self) -> String {
        let id = |v: Option<u16>| v.map_or_else(|| "n/a".to_string(), |v| format!("0x{v:04x}"));
        format!(
            "{} - {} (VID: {}, PID: {})",
            self.port_name,
            self.description,
            id(self.vid),
            id(self.pid)
        )
    }
}

impl fmt::Display for DeviceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.port_name, self.description)
    }
}

/// Why a candidate was kept. Orders by rank: identity matches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    KnownIdentity,
    Heuristic,
}

/// A candidate that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    pub kind: MatchKind,
    pub candidate: DeviceCandidate,
}

/// Decides whether a candidate looks like the echo device.
#[derive(Debug, Clone)]
pub struct DeviceMatcher {
    vendor_id: u16,
    product_id: u16,
    /// Upper-cased term groups; any fully contained group is a match.
    patterns: Vec<Vec<String>>,
}

impl DeviceMatcher {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            patterns: config
                .description_patterns
                .iter()
                .map(|group| group.iter().map(|term| term.to_uppercase()).collect())
                .collect(),
        }
    }

    pub fn classify(&self, candidate: &DeviceCandidate) -> Option<MatchKind> {
        if candidate.vid == Some(self.vendor_id) && candidate.pid == Some(self.product_id) {
            return Some(MatchKind::KnownIdentity);
        }

        let description = candidate.description.to_uppercase();
        self.patterns
            .iter()
            .any(|group| group.iter().all(|term| description.contains(term.as_str())))
            .then_some(MatchKind::Heuristic)
    }
}

impl Default for DeviceMatcher {
    fn default() -> Self {
        Self::new(&DiscoveryConfig::default())
    }
}

/// Outcome of one enumeration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Everything the host reported, unfiltered, in enumeration order.
    pub all: Vec<DeviceCandidate>,
    /// Matching candidates, best first.
    pub matches: Vec<RankedCandidate>,
}

impl DiscoveryReport {
    /// Classify and rank an enumeration.
    pub fn classify(all: Vec<DeviceCandidate>, matcher: &DeviceMatcher) -> Self {
        let mut matches: Vec<RankedCandidate> = all
            .iter()
            .filter_map(|candidate| {
                let kind = matcher.classify(candidate);
                if kind.is_none() {
                    debug!(port = %candidate.port_name, description = %candidate.description, "excluded");
                }
                kind.map(|kind| RankedCandidate {
                    kind,
                    candidate: candidate.clone(),
                })
            })
            .collect();

        // Stable: enumeration order survives within each class.
        matches.sort_by_key(|m| m.kind);

        Self { all, matches }
    }

    /// Matching candidates, best first.
    pub fn candidates(&self) -> impl Iterator<Item = &DeviceCandidate> {
        self.matches.iter().map(|m| &m.candidate)
    }
}

/// Enumerate the host's ports and rank the ones that look like the echo device.
pub fn discover(
    enumerator: &dyn PortEnumerator,
    matcher: &DeviceMatcher,
) -> AppResult<DiscoveryReport> {
    let all = enumerator.enumerate().map_err(AppError::Enumeration)?;
    let report = DiscoveryReport::classify(all, matcher);
    info!(
        ports = report.all.len(),
        candidates = report.matches.len(),
        "serial port enumeration finished"
    );
    Ok(report)
}
