//! Error types for Shard Fetcher
//!
//! Configuration and manifest errors are fatal for a run. Transfer and digest
//! errors describe a single unit of work and are carried inside outcomes so
//! that the worker pools never have to unwind.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration could not be rendered back to TOML
    #[error("Failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// URL could not be parsed
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// URL does not start with the configured prefix
    #[error("URL {url} does not start with the required prefix {prefix}")]
    PrefixMismatch { url: String, prefix: String },

    /// Relative path derived from a URL would escape the base directory
    #[error("URL {url} maps to an unsafe relative path: {reason}")]
    UnsafePath { url: String, reason: String },

    /// Two distinct URLs map to one local file
    #[error("URLs {first} and {second} both map to {path}")]
    PathCollision {
        first: String,
        second: String,
        path: PathBuf,
    },

    /// Could not determine a platform directory
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Manifest reading errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid manifest line
    #[error("Invalid manifest format in {path} at line {line}: {reason}")]
    InvalidFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Invalid hex digest
    #[error("Invalid {algorithm} digest: {digest}")]
    InvalidDigest { algorithm: String, digest: String },
}

/// Errors from a single transfer attempt
#[derive(Error, Debug)]
pub enum TransferError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server returned an error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Download timeout
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Rate limiting persisted through every inner retry
    #[error("Rate limit persisted after {retries} retries (last status HTTP {status})")]
    RateLimitExhausted { retries: u32, status: u16 },

    /// Body ended before the declared length
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },
}

impl TransferError {
    /// Whether the error came from the server or network rather than the local disk
    pub fn is_transport(&self) -> bool {
        !matches!(self, TransferError::Io(_))
    }
}

/// Errors from the digest engine
#[derive(Error, Debug)]
pub enum DigestError {
    /// File does not exist
    #[error("File does not exist: {path}")]
    NotFound { path: PathBuf },

    /// File exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Digest error
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Transfer(e) => e.is_transport(),
            AppError::Config(_) | AppError::Manifest(_) => false,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Manifest(_) => "manifest",
            AppError::Transfer(_) => "transfer",
            AppError::Digest(_) => "digest",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Digest result type alias
pub type DigestResult<T> = std::result::Result<T, DigestError>;
