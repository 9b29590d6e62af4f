//! Data shapes shared by the orchestrator and the verifier
//!
//! A [`UrlRecord`] is one downloadable resource and where it lands on disk.
//! A [`ManifestEntry`] is one expected digest for a file under a base
//! directory. Per-unit results are plain tagged outcomes so that pool-level
//! aggregation never needs an error path.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use url::Url;

use crate::app::hash::Digest;
use crate::errors::{ConfigError, ConfigResult, TransferError};

/// A single downloadable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlRecord {
    /// Full source URL
    pub source_url: String,
    /// URL with the configured prefix stripped
    pub relative_path: String,
    /// Destination on the local filesystem
    pub local_path: PathBuf,
}

impl UrlRecord {
    /// Build a record from a URL, the required prefix and the base directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the URL does not parse,
    /// `ConfigError::PrefixMismatch` if it does not start with `prefix`, and `ConfigError::UnsafePath` if the remainder is empty,
    /// absolute, or climbs out of the base directory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::path::Path;
    /// use shard_fetcher::app::UrlRecord;
    ///
    /// let record = UrlRecord::new(
    ///     "https://data.example/v1/book/book.jsonl",
    ///     "https://data.example/v1/",
    ///     Path::new("/scratch"),
    /// )?;
    /// assert_eq!(record.relative_path, "book/book.jsonl");
    /// assert_eq!(record.local_path, Path::new("/scratch/book/book.jsonl"));
    /// # Ok::<(), shard_fetcher::errors::ConfigError>(())
    /// ```
    pub fn new(source_url: &str, prefix: &str, base_dir: &Path) -> ConfigResult<Self> {
        Url::parse(source_url).map_err(|e| ConfigError::InvalidUrl {
            url: source_url.to_string(),
            error: e.to_string(),
        })?;

        let relative_path =
            source_url
                .strip_prefix(prefix)
                .ok_or_else(|| ConfigError::PrefixMismatch {
                    url: source_url.to_string(),
                    prefix: prefix.to_string(),
                })?;

        if let Some(reason) = unsafe_relative_path(relative_path) {
            return Err(ConfigError::UnsafePath {
                url: source_url.to_string(),
                reason: reason.to_string(),
            });
        }

        Ok(Self {
            source_url: source_url.to_string(),
            relative_path: relative_path.to_string(),
            local_path: base_dir.join(relative_path),
        })
    }
}

/// Why `path` cannot be joined onto a base directory, if it cannot
///
/// Empty paths, directory paths, absolute paths and paths with `..`
/// components are rejected.
pub fn unsafe_relative_path(path: &str) -> Option<&'static str> {
    if path.is_empty() || path.ends_with('/') {
        return Some("no file name");
    }

    Path::new(path)
        .components()
        .find_map(|component| match component {
            Component::Normal(_) | Component::CurDir => None,
            Component::ParentDir => Some("contains '..'"),
            Component::RootDir | Component::Prefix(_) => Some("is absolute"),
        })
}

/// How a transfer reached completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionKind {
    /// Local file already had the remote size; nothing was fetched
    AlreadyPresent,
    /// The body was streamed to disk
    Downloaded { bytes: u64 },
}

/// Result of one transfer worker invocation
#[derive(Debug)]
pub enum TransferOutcome {
    /// The local file is complete
    Complete(CompletionKind),
    /// The server signalled back-pressure
    RateLimited { status: u16 },
    /// Any other transport or filesystem failure
    Failed(TransferError),
}

impl TransferOutcome {
    /// Whether the outcome counts as success for the orchestrator
    pub fn is_complete(&self) -> bool {
        matches!(self, TransferOutcome::Complete(_))
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            TransferOutcome::Complete(CompletionKind::AlreadyPresent) => "skipped",
            TransferOutcome::Complete(CompletionKind::Downloaded { .. }) => "downloaded",
            TransferOutcome::RateLimited { .. } => "rate-limited",
            TransferOutcome::Failed(_) => "failed",
        }
    }
}

/// One expected digest from a verification manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Digest the file must have
    pub expected_digest: Digest,
    /// Path relative to the data directory
    pub relative_filename: String,
}

impl ManifestEntry {
    /// Absolute location of the file under `base_dir`
    pub fn path_under(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.relative_filename)
    }
}

/// Result of verifying one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Recomputed digest equals the expected one
    Match,
    /// Recomputed digest differs
    Mismatch { actual: Digest },
    /// File is absent
    Missing,
    /// File exists but could not be hashed
    Unreadable { reason: String },
}

impl VerificationOutcome {
    /// Whether the entry passed verification
    pub fn is_match(&self) -> bool {
        matches!(self, VerificationOutcome::Match)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "https://data.together.xyz/redpajama-data-1T/v1.0.0/";

    #[test]
    fn test_record_strips_prefix() {
        let record = UrlRecord::new(
            &format!("{}arxiv/arxiv_0.jsonl", PREFIX),
            PREFIX,
            Path::new("/scratch/redpajama"),
        )
        .unwrap();

        assert_eq!(record.relative_path, "arxiv/arxiv_0.jsonl");
        assert_eq!(
            record.local_path,
            PathBuf::from("/scratch/redpajama/arxiv/arxiv_0.jsonl")
        );
    }

    #[test]
    fn test_record_rejects_wrong_prefix() {
        let result = UrlRecord::new(
            "https://mirror.example/arxiv/arxiv_0.jsonl",
            PREFIX,
            Path::new("/data"),
        );
        assert!(matches!(result, Err(ConfigError::PrefixMismatch { .. })));
    }

    #[test]
    fn test_record_rejects_unparseable_url() {
        let result = UrlRecord::new("not a url/arxiv_0.jsonl", "not a url/", Path::new("/data"));
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_record_rejects_escaping_paths() {
        for suffix in ["", "dir/", "../etc/passwd", "a/../../b", "/etc/passwd"] {
            let result = UrlRecord::new(&format!("{}{}", PREFIX, suffix), PREFIX, Path::new("/d"));
            assert!(
                matches!(result, Err(ConfigError::UnsafePath { .. })),
                "suffix {:?} should be rejected",
                suffix
            );
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert!(TransferOutcome::Complete(CompletionKind::AlreadyPresent).is_complete());
        assert!(!TransferOutcome::RateLimited { status: 429 }.is_complete());
        assert_eq!(
            TransferOutcome::Failed(TransferError::ServerError { status: 500 }).label(),
            "failed"
        );
    }
}
