//! Transfer worker configuration
//!
//! Controls the inner rate-limit retry loop, streamed write chunking and the
//! policy for servers that omit `Content-Length` on existing files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::transfer;
use crate::errors::{ConfigError, ConfigResult};

/// What to do with an existing local file when the server declares no length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingLengthPolicy {
    /// Fetch the file again (a stale partial file can never pass as complete)
    #[default]
    Redownload,
    /// Trust the existing file
    Skip,
}

/// Configuration for transfer workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Retries allowed for a rate-limited URL before giving up on it
    pub max_rate_limit_retries: u32,
    /// Delay before the first rate-limit retry; doubles each time
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Cap for a single backoff delay
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Buffer size for streamed writes
    pub chunk_size: usize,
    /// Timeout for one attempt (metadata check plus body)
    #[serde(with = "humantime_serde")]
    pub download_timeout: Duration,
    /// Handling of existing files when the server omits `Content-Length`
    pub missing_length_policy: MissingLengthPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: transfer::MAX_RATE_LIMIT_RETRIES,
            initial_backoff: transfer::INITIAL_BACKOFF,
            max_backoff: transfer::MAX_BACKOFF,
            chunk_size: transfer::CHUNK_SIZE,
            download_timeout: transfer::DOWNLOAD_TIMEOUT,
            missing_length_policy: MissingLengthPolicy::default(),
        }
    }
}

impl TransferConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.chunk_size".to_string(),
                value: "0".to_string(),
                reason: "Chunk size must be greater than zero".to_string(),
            });
        }

        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::InvalidValue {
                field: "transfer.initial_backoff".to_string(),
                value: format!("{:?}", self.initial_backoff),
                reason: "Initial backoff must not exceed max_backoff".to_string(),
            });
        }

        if self.download_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "transfer.download_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Download timeout cannot be zero".to_string(),
            });
        }

        Ok(())
    }

    /// Sleep before rate-limit retry number `retry` (0-based)
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_backoff)
    }
}
