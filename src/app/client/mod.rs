//! HTTP client for fetching dataset shards
//!
//! - `config`: client configuration and building
//! - `http`: raw HEAD/GET requests with optional pacing

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::{declared_length, HttpHandler};

use crate::errors::{AppError, Result};

/// Shared client used by every transfer worker
#[derive(Debug)]
pub struct FetchClient {
    http_handler: HttpHandler,
}

impl FetchClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the reqwest client cannot be built or the pacing
    /// rate is invalid
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = config.build_http_client().map_err(AppError::from)?;
        let http_handler = HttpHandler::new(client, config.requests_per_second)?;
        tracing::debug!("Created fetch client: {:?}", config);
        Ok(Self { http_handler })
    }

    /// Access the request handler
    pub fn http(&self) -> &HttpHandler {
        &self.http_handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_client_creation() {
        assert!(FetchClient::new(&ClientConfig::default()).is_ok());

        let paced = ClientConfig {
            requests_per_second: Some(0),
            ..Default::default()
        };
        assert!(FetchClient::new(&paced).is_err());
    }
}
