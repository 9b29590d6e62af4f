//! Application constants for Shard Fetcher
//!
//! This module centralizes the defaults used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Dataset source defaults
pub mod source {
    /// URL prefix every manifest entry must start with
    pub const DEFAULT_URL_PREFIX: &str = "https://data.together.xyz/redpajama-data-1T/v1.0.0/";

    /// Default directory that downloaded files are placed under
    pub const DEFAULT_BASE_DIR: &str = "./data";

    /// Default name of the URL list read by the download command
    pub const DEFAULT_URL_LIST: &str = "urls.txt";

    /// Default name of the failure ledger
    pub const DEFAULT_LEDGER_FILE: &str = "failed_urls.txt";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("shard-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections kept per host
    pub const POOL_MAX_PER_HOST: usize = 32;

    /// Status codes treated as server back-pressure
    pub const RATE_LIMIT_STATUSES: [u16; 2] = [429, 503];
}

/// Transfer worker defaults
pub mod transfer {
    use super::Duration;

    /// Retries allowed for a rate-limited URL inside one worker invocation
    pub const MAX_RATE_LIMIT_RETRIES: u32 = 5;

    /// First backoff delay; doubles on every further rate-limited attempt
    pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

    /// Upper bound for a single backoff sleep
    pub const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);

    /// Chunk size for streamed writes (1 MiB)
    pub const CHUNK_SIZE: usize = 1024 * 1024;

    /// Timeout for one download attempt
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
}

/// Download orchestration defaults
pub mod download {
    use super::Duration;

    /// Concurrency of the first wave
    pub const INITIAL_CONCURRENCY: usize = 32;

    /// Upper bound accepted for any wave's concurrency
    pub const MAX_CONCURRENCY: usize = 512;

    /// Retry waves after the first one
    pub const MAX_RETRY_WAVES: u32 = 10;

    /// Pause between two waves
    pub const WAVE_DELAY: Duration = Duration::from_secs(10);
}

/// Verification defaults
pub mod verify {
    /// Suffix identifying digest manifests inside a manifest directory
    pub const MANIFEST_SUFFIX: &str = "_SHA256SUMS.txt";

    /// Read buffer used while hashing (64 KiB)
    pub const HASH_CHUNK_SIZE: usize = 64 * 1024;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Log file name used when file logging is enabled without a path
    pub const DEFAULT_LOG_FILE: &str = "download.log";
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "shard-fetcher.toml";

    /// Directory name under the user config directory
    pub const APP_DIR: &str = "shard-fetcher";
}

pub use download::{INITIAL_CONCURRENCY, MAX_RETRY_WAVES};
pub use http::USER_AGENT;
pub use source::DEFAULT_URL_PREFIX;
