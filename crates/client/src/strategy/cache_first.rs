//! Cache-first: serve from the cache when present, go to the network on a miss.

use async_trait::async_trait;
use stash_core::{Error, RequestDescriptor};

use super::{Source, Strategy, StrategyContext, StrategyResponse};

#[derive(Debug, Clone)]
pub struct CacheFirst {
    cache_name: String,
}

impl CacheFirst {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self { cache_name: cache_name.into() }
    }
}

#[async_trait]
impl Strategy for CacheFirst {
    fn name(&self) -> &'static str {
        "cache-first"
    }

    fn cache_name(&self) -> Option<&str> {
        Some(&self.cache_name)
    }

    async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error> {
        if let Some(hit) = ctx.cache_match(&self.cache_name, request).await {
            return Ok(StrategyResponse::new(hit, Source::Cache));
        }

        let response = ctx.fetch(request).await?;
        ctx.cache_put(&self.cache_name, request, &response).await;

        Ok(StrategyResponse::new(response, Source::Network))
    }
}
