//! Transfer worker: one URL to one local file
//!
//! Each invocation checks whether an existing local file is already complete,
//! otherwise streams the body to disk, and retries rate-limited attempts with
//! a doubling backoff. Every path ends in a [`TransferOutcome`]; nothing is
//! propagated as an error to the pool.

use std::io::ErrorKind;
use std::sync::Arc;

use reqwest::StatusCode;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use super::config::{MissingLengthPolicy, TransferConfig};
use crate::app::client::{declared_length, FetchClient};
use crate::app::models::{CompletionKind, TransferOutcome, UrlRecord};
use crate::constants::http::RATE_LIMIT_STATUSES;
use crate::errors::{TransferError, TransferResult};

/// Whether a status is a server back-pressure signal
pub fn is_rate_limited(status: StatusCode) -> bool {
    RATE_LIMIT_STATUSES.contains(&status.as_u16())
}

/// Performs transfers for the orchestrator; cheap to share across tasks
#[derive(Debug, Clone)]
pub struct TransferWorker {
    client: Arc<FetchClient>,
    config: TransferConfig,
}

impl TransferWorker {
    /// Create a worker around a shared client
    pub fn new(client: Arc<FetchClient>, config: TransferConfig) -> Self {
        Self { client, config }
    }

    /// Worker configuration
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Fetch `record` to its local path, retrying rate-limited attempts
    ///
    /// Returns `Complete` on success. Rate limiting that outlasts
    /// `max_rate_limit_retries` is reported as `Failed(RateLimitExhausted)`,
    /// so callers only ever see `Complete` or `Failed` from this method.
    pub async fn transfer(&self, record: &UrlRecord) -> TransferOutcome {
        let mut retries = 0;

        loop {
            match self.attempt(record).await {
                TransferOutcome::RateLimited { status } => {
                    if retries >= self.config.max_rate_limit_retries {
                        warn!(
                            "Giving up on {} after {} rate-limited retries",
                            record.source_url, retries
                        );
                        return TransferOutcome::Failed(TransferError::RateLimitExhausted {
                            retries,
                            status,
                        });
                    }

                    let delay = self.config.backoff_delay(retries);
                    retries += 1;
                    warn!(
                        "Rate limited (HTTP {}) on {}. Retry {}/{} in {:?}",
                        status,
                        record.source_url,
                        retries,
                        self.config.max_rate_limit_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                TransferOutcome::Failed(e) => {
                    warn!(
                        "An error occurred while downloading '{}': {}",
                        record.local_path.display(),
                        e
                    );
                    return TransferOutcome::Failed(e);
                }
                complete => return complete,
            }
        }
    }

    /// One attempt bounded by `download_timeout`, without any retry
    pub async fn attempt(&self, record: &UrlRecord) -> TransferOutcome {
        match tokio::time::timeout(self.config.download_timeout, self.attempt_inner(record)).await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => TransferOutcome::Failed(e),
            Err(_) => TransferOutcome::Failed(TransferError::Timeout {
                seconds: self.config.download_timeout.as_secs(),
            }),
        }
    }

    async fn attempt_inner(&self, record: &UrlRecord) -> TransferResult<TransferOutcome> {
        if let Some(parent) = record.local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Some(outcome) = self.check_existing(record).await? {
            return Ok(outcome);
        }

        self.stream_to_disk(record).await
    }

    /// Decide whether an existing local file can be kept
    ///
    /// `Ok(None)` means the file must be (re-)downloaded.
    async fn check_existing(&self, record: &UrlRecord) -> TransferResult<Option<TransferOutcome>> {
        let local_len = match tokio::fs::metadata(&record.local_path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let response = self.client.http().head(&record.source_url).await?;
        let status = response.status();
        if is_rate_limited(status) {
            return Ok(Some(TransferOutcome::RateLimited {
                status: status.as_u16(),
            }));
        }
        if !status.is_success() {
            return Err(TransferError::ServerError {
                status: status.as_u16(),
            });
        }

        match declared_length(&response) {
            Some(remote_len) if remote_len == local_len => {
                info!(
                    "File '{}' already exists, and it is complete. Skipping download.",
                    record.local_path.display()
                );
                Ok(Some(TransferOutcome::Complete(CompletionKind::AlreadyPresent)))
            }
            Some(remote_len) => {
                info!(
                    "File '{}' already exists, but it's incomplete ({} of {} bytes). Downloading.",
                    record.local_path.display(),
                    local_len,
                    remote_len
                );
                Ok(None)
            }
            None => match self.config.missing_length_policy {
                MissingLengthPolicy::Skip => {
                    warn!(
                        "No Content-Length for {}; keeping existing file of {} bytes",
                        record.source_url, local_len
                    );
                    Ok(Some(TransferOutcome::Complete(CompletionKind::AlreadyPresent)))
                }
                MissingLengthPolicy::Redownload => {
                    warn!(
                        "No Content-Length for {}; cannot confirm existing file, downloading again",
                        record.source_url
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Stream the GET body into the local file, overwriting it
    async fn stream_to_disk(&self, record: &UrlRecord) -> TransferResult<TransferOutcome> {
        let mut response = self.client.http().get(&record.source_url).await?;
        let status = response.status();
        if is_rate_limited(status) {
            return Ok(TransferOutcome::RateLimited {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(TransferError::ServerError {
                status: status.as_u16(),
            });
        }

        let expected = declared_length(&response);
        let file = File::create(&record.local_path).await?;
        let mut writer = BufWriter::with_capacity(self.config.chunk_size, file);
        let mut received: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            received += chunk.len() as u64;
        }
        writer.flush().await?;

        if let Some(expected) = expected {
            if received != expected {
                return Err(TransferError::IncompleteDownload { received, expected });
            }
        }

        debug!(
            "Wrote {} bytes to {}",
            received,
            record.local_path.display()
        );
        Ok(TransferOutcome::Complete(CompletionKind::Downloaded {
            bytes: received,
        }))
    }
}
