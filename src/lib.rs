//! Shard Fetcher Library
//!
//! Bulk retrieval of large dataset shard lists over rate-limited HTTP
//! endpoints, followed by digest verification of the downloaded files.
//! Downloads run in waves of bounded, shrinking concurrency; files already
//! complete on disk are never fetched again.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(INITIAL_CONCURRENCY, 32);
        assert_eq!(MAX_RETRY_WAVES, 10);
        assert!(USER_AGENT.starts_with("shard-fetcher/"));
        assert!(DEFAULT_URL_PREFIX.ends_with('/'));
    }

    #[test]
    fn test_error_types() {
        let app_error = AppError::from(errors::ManifestError::NotFound {
            path: "urls.txt".into(),
        });

        assert_eq!(app_error.category(), "manifest");
        assert!(!app_error.is_recoverable());
    }
}
