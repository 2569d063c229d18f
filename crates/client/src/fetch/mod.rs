//! Network side of every strategy.
//!
//! [`Fetcher`] is the seam strategies call through; [`FetchClient`] is the
//! reqwest implementation used in production.
//!
//! ### Behaviour
//! - Any HTTP status is a successful round trip; only transport failures
//!   (connect, DNS, reset, timeout, oversize body) are errors.
//! - Redirects are not followed, so the page sees them as it would without
//!   the cache in between.
//! - Bodies are decoded (gzip, brotli, deflate) and buffered up to `max_bytes`.

pub mod headers;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

use stash_core::{CachedResponse, Error, RequestDescriptor};

pub use headers::{forward_request_header, is_hop_by_hop, keep_response_header};

/// Issues a request over the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the round trip. Non-2xx statuses are returned, not raised.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stash/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "stash/0.1".to_string(), max_bytes: 10 * 1024 * 1024, timeout: Duration::from_millis(20000) }
    }
}

impl From<&stash_core::AppConfig> for FetchConfig {
    fn from(config: &stash_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, timeout: config.timeout() }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in request.headers.iter().filter(|(name, _)| forward_request_header(name)) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await.map_err(network_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| keep_response_header(name.as_str()))
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network_error)? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!("body exceeds {} bytes", self.config.max_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(CachedResponse { url: final_url, status, headers, body: body.into(), stored_at: None })
    }
}
