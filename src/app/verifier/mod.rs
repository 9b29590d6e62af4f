//! Integrity verification of downloaded files against digest manifests
//!
//! Hashing is CPU-bound, so each file is hashed on a blocking thread and the
//! number of files in flight is bounded by the configured concurrency. A file
//! whose recomputed digest differs from the manifest is deleted so that the
//! next download run fetches it again. Missing and unreadable files are
//! reported but never touched.

pub mod config;
pub mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::hash::compute_file_digest;
use crate::app::manifest::{discover_manifests, read_digest_manifest};
use crate::app::models::{ManifestEntry, VerificationOutcome};
use crate::app::progress::{emit, ProgressEvent, ProgressSender};
use crate::errors::{DigestError, Result};

pub use config::VerifierConfig;
pub use report::{VerificationFailure, VerificationReport};

/// Outcome for one entry, after any deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryVerification {
    /// File that was checked
    pub path: PathBuf,
    /// What the check found
    pub outcome: VerificationOutcome,
    /// Whether the file was deleted
    pub deleted: bool,
}

/// Checks files against their expected digests
pub struct IntegrityVerifier {
    config: VerifierConfig,
    progress: Option<ProgressSender>,
}

impl IntegrityVerifier {
    /// Create a verifier
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Report progress events on `sender`
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Verifier configuration
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Manifests in `dir` matching the configured suffix
    pub async fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(discover_manifests(dir, &self.config.manifest_suffix).await?)
    }

    /// Verify one entry, deleting the file if its digest differs
    pub async fn verify_entry(&self, entry: &ManifestEntry, base_dir: &Path) -> EntryVerification {
        let path = entry.path_under(base_dir);
        let algorithm = self.config.algorithm;
        let chunk_size = self.config.chunk_size;

        let hash_path = path.clone();
        let computed = tokio::task::spawn_blocking(move || {
            compute_file_digest(&hash_path, algorithm, chunk_size)
        })
        .await;

        let outcome = match computed {
            Ok(Ok(actual)) if actual == entry.expected_digest => VerificationOutcome::Match,
            Ok(Ok(actual)) => VerificationOutcome::Mismatch { actual },
            Ok(Err(DigestError::NotFound { .. })) => VerificationOutcome::Missing,
            Ok(Err(e)) => VerificationOutcome::Unreadable {
                reason: e.to_string(),
            },
            Err(join_error) => VerificationOutcome::Unreadable {
                reason: format!("hashing task failed: {}", join_error),
            },
        };

        let mut deleted = false;
        match &outcome {
            VerificationOutcome::Match => {
                debug!("{} matched", path.display());
            }
            VerificationOutcome::Mismatch { actual } => {
                warn!(
                    "Digest mismatch for {} (expected {}, got {}); deleting",
                    path.display(),
                    entry.expected_digest,
                    actual
                );
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => deleted = true,
                    Err(e) => error!("Failed to delete {}: {}", path.display(), e),
                }
            }
            VerificationOutcome::Missing => {
                warn!("File does not exist: {}", path.display());
            }
            VerificationOutcome::Unreadable { reason } => {
                warn!("Could not hash {}: {}", path.display(), reason);
            }
        }

        EntryVerification {
            path,
            outcome,
            deleted,
        }
    }

    /// Verify `entries` under `base_dir` with bounded parallelism
    ///
    /// Results are aggregated in completion order; the counts do not depend
    /// on it.
    pub async fn verify_entries(
        &self,
        entries: &[ManifestEntry],
        base_dir: &Path,
        manifest: Option<PathBuf>,
    ) -> VerificationReport {
        let start = Instant::now();
        let mut report = VerificationReport::new(manifest);
        let progress_path = report.manifest.clone().unwrap_or_default();

        emit(
            &self.progress,
            ProgressEvent::ManifestStarted {
                path: progress_path.clone(),
                entries: entries.len(),
            },
        );

        let mut results = stream::iter(entries)
            .map(|entry| async move { (entry, self.verify_entry(entry, base_dir).await) })
            .buffer_unordered(self.config.effective_concurrency());

        while let Some((entry, checked)) = results.next().await {
            emit(
                &self.progress,
                ProgressEvent::EntryVerified {
                    path: checked.path.clone(),
                    matched: checked.outcome.is_match(),
                },
            );
            report.record(
                checked.path,
                entry.expected_digest.clone(),
                checked.outcome,
                checked.deleted,
            );
        }

        report.duration = start.elapsed();
        emit(
            &self.progress,
            ProgressEvent::ManifestFinished {
                path: progress_path,
                matched: report.matched,
                mismatched: report.mismatched,
            },
        );
        report
    }

    /// Read the manifest at `manifest` and verify every entry under `base_dir`
    pub async fn verify_manifest(&self, manifest: &Path, base_dir: &Path) -> Result<VerificationReport> {
        let entries = read_digest_manifest(manifest, self.config.algorithm).await?;
        let span = info_span!("manifest", path = %manifest.display(), entries = entries.len());

        let report = self
            .verify_entries(&entries, base_dir, Some(manifest.to_path_buf()))
            .instrument(span)
            .await;

        info!("{}", report.summary());
        Ok(report)
    }

    /// Verify several manifests one after another
    ///
    /// A manifest that cannot be read or parsed stops the run.
    pub async fn verify_manifests(
        &self,
        manifests: &[PathBuf],
        base_dir: &Path,
    ) -> Result<Vec<VerificationReport>> {
        self.config.validate()?;

        let mut reports = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            reports.push(self.verify_manifest(manifest, base_dir).await?);
        }
        Ok(reports)
    }
}
