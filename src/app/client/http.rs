//! Raw HTTP operations with optional client-side pacing
//!
//! Requests are issued without retries here; classification and backoff
//! belong to the transfer worker, which sees the status codes.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Jitter, Quota, RateLimiter};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};

use crate::errors::{ConfigError, ConfigResult, TransferResult};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: Option<DirectLimiter>,
}

impl HttpHandler {
    /// Creates a new HttpHandler, optionally pacing requests per second
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `requests_per_second` is zero
    pub fn new(client: Client, requests_per_second: Option<u32>) -> ConfigResult<Self> {
        let rate_limiter = requests_per_second
            .map(Self::build_rate_limiter)
            .transpose()?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(requests_per_second: u32) -> ConfigResult<DirectLimiter> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| ConfigError::InvalidValue {
            field: "client.requests_per_second".to_string(),
            value: requests_per_second.to_string(),
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rate)))
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
        }
    }

    /// Metadata-only request
    pub async fn head(&self, url: &str) -> TransferResult<Response> {
        self.pace().await;
        let response = self.client.head(url).send().await?;
        tracing::debug!("HEAD {} -> {}", url, response.status());
        Ok(response)
    }

    /// Streaming GET; the body is left unread for the caller
    pub async fn get(&self, url: &str) -> TransferResult<Response> {
        self.pace().await;
        let response = self.client.get(url).send().await?;
        tracing::debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }
}

/// Byte length declared by the `Content-Length` header
///
/// Reads the header directly: for HEAD responses the body is empty, so the
/// body size hint does not reflect the resource length.
pub fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
