//! Configuration for the integrity verifier

use serde::{Deserialize, Serialize};

use crate::app::hash::DigestAlgorithm;
use crate::constants::verify;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for manifest verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Digest algorithm used by the manifests
    pub algorithm: DigestAlgorithm,
    /// Files hashed at once; `None` uses the available processing units
    pub concurrency: Option<usize>,
    /// Read buffer size used while hashing
    pub chunk_size: usize,
    /// Suffix that identifies manifests when a directory is given
    pub manifest_suffix: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            concurrency: None,
            chunk_size: verify::HASH_CHUNK_SIZE,
            manifest_suffix: verify::MANIFEST_SUFFIX.to_string(),
        }
    }
}

impl VerifierConfig {
    /// Number of files hashed concurrently
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "verify.concurrency".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1; omit it to use every processing unit".to_string(),
            });
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "verify.chunk_size".to_string(),
                value: "0".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.manifest_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "verify.manifest_suffix".to_string(),
                value: String::new(),
                reason: "An empty suffix would treat every file as a manifest".to_string(),
            });
        }

        Ok(())
    }
}
