//! HTTP client wrapper for metadata requests.

use std::time::Duration;

use reqwest::Client;

use crate::error::MetadataError;

/// Default timeout for metadata requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default metadata service base URL (link-local address).
pub const DEFAULT_BASE_URL: &str = "http://169.254.169.254";

/// HTTP client wrapper for metadata service requests.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: Client,
    base_url: String,
}

impl MetadataClient {
    /// Create a new metadata client with the specified timeout and base URL.
    pub fn new(timeout: Duration, base_url: &str) -> Result<Self, reqwest::Error> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new metadata client with the default timeout and base URL.
    pub fn with_default_timeout() -> Result<Self, reqwest::Error> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_BASE_URL)
    }

    /// Create a new metadata client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str) -> Result<Self, reqwest::Error> {
        Self::new(DEFAULT_TIMEOUT, base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a path below the base URL and return the body as text with
    /// trailing newlines removed.
    ///
    /// Any non-success status is fatal: metadata retrieval never tolerates
    /// a partial tree.
    pub async fn get_text(&self, path: &str) -> Result<String, MetadataError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self.inner.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(body.trim_end_matches('\n').to_string())
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::with_default_timeout().expect("failed to create HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(DEFAULT_BASE_URL, "http://169.254.169.254");
    }

    #[test]
    fn test_client_creation() {
        let client = MetadataClient::with_default_timeout().unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_custom_base_url() {
        let client = MetadataClient::with_base_url("http://localhost:8080").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = MetadataClient::with_base_url("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
