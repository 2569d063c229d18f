//! Responses as strategies pass them around and as the cache stores them.

use bytes::Bytes;

/// A complete, buffered HTTP response.
///
/// Network responses and cache hits share this type; `stored_at` is only
/// set on responses that came out of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Final URL the response answers (after redirects).
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC 3339 timestamp of when the entry was written to the cache.
    pub stored_at: Option<String>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, headers: Vec::new(), body: body.into(), stored_at: None }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
