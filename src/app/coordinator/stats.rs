//! Per-wave reports and the final session result

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome counts for one wave
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveReport {
    /// Zero-based wave index
    pub wave: u32,
    /// Concurrency the wave ran at
    pub concurrency: usize,
    /// URLs submitted to the wave
    pub submitted: usize,
    /// URLs actually dispatched (less than `submitted` only on cancellation)
    pub dispatched: usize,
    /// Transfers that completed
    pub succeeded: usize,
    /// Transfers that failed or were never dispatched
    pub failed: usize,
    /// Wall-clock time of the wave
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// Final result of a download session
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    /// URLs in the run after de-duplication
    pub total_urls: usize,
    /// URLs whose files are complete on disk
    pub succeeded: usize,
    /// URLs still failing after the last wave, in input order
    pub remaining_failures: Vec<String>,
    /// One report per wave that ran
    pub waves: Vec<WaveReport>,
    /// Failure ledger location, if one was written
    pub ledger_path: Option<PathBuf>,
    /// Whether the run stopped early on a shutdown request
    pub cancelled: bool,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Time taken for the entire session
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,
}

impl SessionResult {
    /// Whether every URL was fetched
    pub fn is_success(&self) -> bool {
        self.remaining_failures.is_empty()
    }

    /// Number of URLs that could not be fetched
    pub fn failed_count(&self) -> usize {
        self.remaining_failures.len()
    }

    /// Human-readable summary of the session
    pub fn summary(&self) -> String {
        let waves = self.waves.len();
        if self.is_success() {
            format!(
                "All {} files downloaded in {} wave(s) ({:.1?})",
                self.total_urls, waves, self.total_duration
            )
        } else {
            let ledger = self
                .ledger_path
                .as_ref()
                .map(|p| format!("; see {}", p.display()))
                .unwrap_or_default();
            format!(
                "{} of {} files downloaded in {} wave(s){}; {} could not be fetched{}",
                self.succeeded,
                self.total_urls,
                waves,
                if self.cancelled { " (cancelled)" } else { "" },
                self.failed_count(),
                ledger
            )
        }
    }
}
