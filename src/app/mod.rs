//! Core application logic for Shard Fetcher
//!
//! This module contains the HTTP client, the data models and manifest
//! readers, the transfer worker, the wave-based download coordinator and the
//! integrity verifier.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use shard_fetcher::app::{IntegrityVerifier, VerifierConfig};
//!
//! # async fn example() -> shard_fetcher::errors::Result<()> {
//! let verifier = IntegrityVerifier::new(VerifierConfig::default());
//! let manifests = verifier.discover(Path::new("sha256")).await?;
//!
//! for report in verifier.verify_manifests(&manifests, Path::new("data")).await? {
//!     println!("{}", report.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod hash;
pub mod manifest;
pub mod models;
pub mod progress;
pub mod verifier;
pub mod worker;

// Re-export main public API
pub use client::{ClientConfig, FetchClient, HttpHandler};
pub use coordinator::{
    create_shutdown_channel, ConcurrencyStrategy, Coordinator, CoordinatorConfig, FailureLedger,
    SessionResult, ShutdownReceiver, ShutdownSender, SignalHandler, WaveReport,
};
pub use hash::{compute_file_digest, digest_bytes, Digest, DigestAlgorithm};
pub use manifest::{
    build_url_records, discover_manifests, load_url_records, parse_manifest_line,
    read_digest_manifest, read_url_lines,
};
pub use models::{
    CompletionKind, ManifestEntry, TransferOutcome, UrlRecord, VerificationOutcome,
};
pub use progress::{progress_channel, ProgressEvent, ProgressSender};
pub use verifier::{
    EntryVerification, IntegrityVerifier, VerificationFailure, VerificationReport, VerifierConfig,
};
pub use worker::{MissingLengthPolicy, TransferConfig, TransferWorker};
