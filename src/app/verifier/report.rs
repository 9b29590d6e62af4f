//! Verification reports

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::app::hash::Digest;
use crate::app::models::VerificationOutcome;

/// Details about an entry that did not verify
#[derive(Debug, Clone, Serialize)]
pub struct VerificationFailure {
    /// File that failed verification
    pub path: PathBuf,
    /// Reason for failure
    pub reason: String,
    /// Expected digest
    pub expected: Digest,
    /// Actual digest, if one could be computed
    pub actual: Option<Digest>,
    /// Whether the file was removed
    pub deleted: bool,
}

/// Result of verifying one manifest
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    /// Manifest the entries came from, if any
    pub manifest: Option<PathBuf>,
    /// Entries whose digest matched
    pub matched: usize,
    /// Entries that did not match, including missing and unreadable files
    pub mismatched: usize,
    /// Of the mismatched entries, files that did not exist
    pub missing: usize,
    /// Of the mismatched entries, files that could not be hashed
    pub unreadable: usize,
    /// Files deleted because their digest differed
    pub deleted: usize,
    /// Failed entries with details
    pub failures: Vec<VerificationFailure>,
    /// Total verification time
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl VerificationReport {
    /// Create an empty report for `manifest`
    pub fn new(manifest: Option<PathBuf>) -> Self {
        Self {
            manifest,
            ..Default::default()
        }
    }

    /// Entries checked
    pub fn total(&self) -> usize {
        self.matched + self.mismatched
    }

    /// Whether every entry matched
    pub fn is_successful(&self) -> bool {
        self.mismatched == 0
    }

    /// Record one entry's outcome
    pub fn record(
        &mut self,
        path: PathBuf,
        expected: Digest,
        outcome: VerificationOutcome,
        deleted: bool,
    ) {
        let (reason, actual) = match outcome {
            VerificationOutcome::Match => {
                self.matched += 1;
                return;
            }
            VerificationOutcome::Mismatch { actual } => ("Digest mismatch".to_string(), Some(actual)),
            VerificationOutcome::Missing => {
                self.missing += 1;
                ("File not found".to_string(), None)
            }
            VerificationOutcome::Unreadable { reason } => {
                self.unreadable += 1;
                (format!("Unreadable: {}", reason), None)
            }
        };

        self.mismatched += 1;
        if deleted {
            self.deleted += 1;
        }
        self.failures.push(VerificationFailure {
            path,
            reason,
            expected,
            actual,
            deleted,
        });
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let name = self
            .manifest
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "manifest".to_string());
        format!(
            "{}: {} matched, {} not matched ({} missing, {} deleted) in {:.1?}",
            name, self.matched, self.mismatched, self.missing, self.deleted, self.duration
        )
    }
}
