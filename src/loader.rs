//! Schema loading from files, strings, and HTTP URLs.
//!
//! Remote documents are reached through the [`Fetch`] trait so the resolver
//! can be driven by any transport (or an in-memory map in tests).

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ResolveError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves the raw text of a schema document by URL.
///
/// Timeouts and retries belong to the implementation; the resolver imposes
/// none and treats every error as fatal for the request.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ResolveError>;
}

/// HTTP(S) fetcher backed by `reqwest`.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    /// Fetcher with the default 10 second timeout.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ResolveError::NetworkError {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ResolveError> {
        let network_error = |source| ResolveError::NetworkError {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network_error)?;

        // Check for HTTP errors before reading the body
        let response = response.error_for_status().map_err(network_error)?;

        response.text().await.map_err(network_error)
    }
}

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist,
/// or `ResolveError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_schema_str(&content, &path.display().to_string())
}

/// Parse schema text. `origin` names the source in error messages.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str, origin: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson {
        origin: origin.to_string(),
        source,
    })
}

/// Check if a string looks like a fetchable URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// True for `scheme://...` and protocol-relative `//...` references.
pub fn is_absolute_url(s: &str) -> bool {
    if s.starts_with("//") {
        return true;
    }
    match s.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_lowercase())
        }
        None => false,
    }
}
