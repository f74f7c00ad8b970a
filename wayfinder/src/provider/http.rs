//! HTTP client abstraction for testability

use std::time::Duration;

use super::traits::BoxFuture;
use super::types::ProviderError;

/// Default request timeout for provider calls.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Trait for async HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the body bytes.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new client with the default timeout.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new client with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ProviderError::Http(format!("Request failed: {}", e)))?;

            // Check HTTP status
            if !response.status().is_success() {
                return Err(ProviderError::Http(format!(
                    "HTTP {} from {}",
                    response.status(),
                    redact_key(url)
                )));
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| ProviderError::Http(format!("Failed to read response: {}", e)))
        })
    }
}

/// Strip the query string so API keys never reach logs or error messages.
fn redact_key(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
