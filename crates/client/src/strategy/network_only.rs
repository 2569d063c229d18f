//! Network-only: never touches a cache.

use async_trait::async_trait;
use stash_core::{Error, RequestDescriptor};

use super::{Source, Strategy, StrategyContext, StrategyResponse};

#[derive(Debug, Clone, Default)]
pub struct NetworkOnly;

#[async_trait]
impl Strategy for NetworkOnly {
    fn name(&self) -> &'static str {
        "network-only"
    }

    fn cache_name(&self) -> Option<&str> {
        None
    }

    async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error> {
        Ok(StrategyResponse::new(ctx.fetch(request).await?, Source::Network))
    }
}
