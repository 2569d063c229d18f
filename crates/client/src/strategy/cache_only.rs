//! Cache-only: answer from a cache or not at all.

use async_trait::async_trait;
use stash_core::{Error, RequestDescriptor};

use super::{Source, Strategy, StrategyContext, StrategyResponse};

#[derive(Debug, Clone)]
pub struct CacheOnly {
    cache_name: String,
}

impl CacheOnly {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self { cache_name: cache_name.into() }
    }
}

#[async_trait]
impl Strategy for CacheOnly {
    fn name(&self) -> &'static str {
        "cache-only"
    }

    fn cache_name(&self) -> Option<&str> {
        Some(&self.cache_name)
    }

    async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error> {
        ctx.cache_match(&self.cache_name, request)
            .await
            .map(|hit| StrategyResponse::new(hit, Source::Cache))
            .ok_or_else(|| Error::CacheMiss(request.url.to_string()))
    }
}
