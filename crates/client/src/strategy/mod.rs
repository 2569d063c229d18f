//! Caching strategies.
//!
//! A [`Strategy`] answers one request using the network, a named cache, or
//! both. Strategies are swappable: routes and cache warming only ever call
//! [`StrategyContext::fetch_with_strategy`].

mod cache_first;
mod cache_only;
mod network_first;
mod network_only;
pub mod policy;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use stash_core::{CacheDb, CachedResponse, Error, RequestDescriptor};

use crate::fetch::Fetcher;

pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use policy::{CachePolicy, cache_policy};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
            Source::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response together with its [`Source`].
#[derive(Debug, Clone)]
pub struct StrategyResponse {
    pub response: CachedResponse,
    pub source: Source,
}

impl StrategyResponse {
    pub fn new(response: CachedResponse, source: Source) -> Self {
        Self { response, source }
    }
}

/// A named way of answering a request.
#[async_trait]
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Cache this strategy reads and writes, if any.
    fn cache_name(&self) -> Option<&str>;

    async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error>;
}

/// Shared resources every strategy works against: the network and the cache store.
#[derive(Clone)]
pub struct StrategyContext {
    fetcher: Arc<dyn Fetcher>,
    db: CacheDb,
}

impl StrategyContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, db: CacheDb) -> Self {
        Self { fetcher, db }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Answer `request` with `strategy`. This is the single entry point for
    /// routing and cache warming.
    pub async fn fetch_with_strategy(
        &self, request: &RequestDescriptor, strategy: &dyn Strategy,
    ) -> Result<StrategyResponse, Error> {
        let result = strategy.handle(request, self).await;
        match &result {
            Ok(r) => tracing::debug!(
                strategy = strategy.name(),
                url = %request.url,
                source = %r.source,
                status = r.response.status,
                "handled request"
            ),
            Err(e) => tracing::debug!(strategy = strategy.name(), url = %request.url, error = %e, "strategy failed"),
        }
        result
    }

    /// Go to the network.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error> {
        self.fetcher.fetch(request).await
    }

    /// Look the request up in a named cache.
    ///
    /// Only `GET` requests can match. A failing cache store is logged and
    /// treated as a miss.
    pub async fn cache_match(&self, cache_name: &str, request: &RequestDescriptor) -> Option<CachedResponse> {
        if !request.is_get() {
            return None;
        }
        match self.db.match_entry(cache_name, &request.method, request.url.as_str()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(cache = cache_name, url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a network response if it is cacheable. Returns whether it was stored.
    ///
    /// Write failures are logged and swallowed; the caller still has the
    /// response to return.
    pub async fn cache_put(&self, cache_name: &str, request: &RequestDescriptor, response: &CachedResponse) -> bool {
        match cache_policy(request, response) {
            CachePolicy::NonCacheable(_) => {
                tracing::debug!(url = %request.url, status = response.status, "response not cacheable");
                false
            }
            CachePolicy::Cacheable(response) => {
                match self.db.put_entry_for(cache_name, &request.method, request.url.as_str(), response).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(cache = cache_name, url = %request.url, error = %e, "cache write failed");
                        false
                    }
                }
            }
        }
    }
}
