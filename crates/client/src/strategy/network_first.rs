//! Network-first: try the network, fall back to the cache when it fails.

use async_trait::async_trait;
use stash_core::{Error, RequestDescriptor};

use super::{Source, Strategy, StrategyContext, StrategyResponse};

#[derive(Debug, Clone)]
pub struct NetworkFirst {
    cache_name: String,
}

impl NetworkFirst {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self { cache_name: cache_name.into() }
    }
}

#[async_trait]
impl Strategy for NetworkFirst {
    fn name(&self) -> &'static str {
        "network-first"
    }

    fn cache_name(&self) -> Option<&str> {
        Some(&self.cache_name)
    }

    async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error> {
        match ctx.fetch(request).await {
            Ok(response) => {
                ctx.cache_put(&self.cache_name, request, &response).await;
                Ok(StrategyResponse::new(response, Source::Network))
            }
            Err(e) if e.is_network() => match ctx.cache_match(&self.cache_name, request).await {
                Some(hit) => {
                    tracing::debug!(url = %request.url, error = %e, "network failed, serving cached copy");
                    Ok(StrategyResponse::new(hit, Source::Cache))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}
