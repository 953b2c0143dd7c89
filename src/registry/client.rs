//! HTTP client shared foundation
//!
//! Shared by the registry version sources and the backend API client:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry (max 3 attempts)
//! - Rate-limit detection

use crate::error::RegistryError;
use reqwest::Client;
use std::time::Duration;

/// Default timeout for HTTP requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("depbot/", env!("CARGO_PKG_VERSION"));

/// Maximum number of attempts per request
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Creates a client with custom timeout and User-Agent.
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network("", "http client", format!("failed to build client: {e}"))
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Sets the maximum number of attempts (builder pattern).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GETs a URL with retries, reporting failures against the given
    /// package and registry for error context.
    pub async fn get_with_context(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut delay = BASE_DELAY_MS;
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.as_u16() == 404 {
                        return Err(RegistryError::PackageNotFound {
                            package: package.to_string(),
                            registry: registry.to_string(),
                        });
                    }
                    if status.as_u16() == 429 {
                        return Err(RegistryError::RateLimitExceeded {
                            registry: registry.to_string(),
                        });
                    }
                    last_error = Some(RegistryError::network(
                        package,
                        registry,
                        format!("status {status}"),
                    ));
                }
                Err(e) => {
                    last_error = Some(RegistryError::network(package, registry, e.to_string()));
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }
        }

        Err(last_error
            .unwrap_or_else(|| RegistryError::network(package, registry, "no attempts made")))
    }

    /// GETs a URL and decodes the JSON body.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        registry: &str,
    ) -> Result<T, RegistryError> {
        let response = self.get_with_context(url, package, registry).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RegistryError::invalid_response(package, registry, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn test_with_max_retries() {
        let client = HttpClient::new().unwrap().with_max_retries(1);
        assert_eq!(client.max_retries, 1);
    }

    #[test]
    fn test_custom_config() {
        let client = HttpClient::with_config(Duration::from_secs(5), "test-agent/1.0");
        assert!(client.is_ok());
    }
}
