//! Transfer workers
//!
//! A [`TransferWorker`] performs exactly one URL-to-file transfer per call:
//!
//! 1. If the local file exists, a HEAD request compares the declared
//!    `Content-Length` with the local size; equal sizes skip the download.
//! 2. Otherwise the body is streamed to disk through a fixed-size buffer.
//! 3. HTTP 429/503 responses are retried in place with a doubling backoff,
//!    up to [`TransferConfig::max_rate_limit_retries`].
//!
//! The orchestrator layers its own wave-level retries on top of this.
//!
//! # Module Organization
//!
//! - [`config`] - Worker configuration and the missing-length policy
//! - [`core`] - The worker itself

pub mod config;
pub mod core;

pub use config::{MissingLengthPolicy, TransferConfig};
pub use self::core::{is_rate_limited, TransferWorker};
