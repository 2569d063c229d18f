//! Offline fallback: precache one document and serve it for failed navigations.

use async_trait::async_trait;
use stash_core::{Destination, Error, RequestDescriptor};

use crate::router::CatchHandler;
use crate::strategy::{Source, StrategyContext, StrategyResponse};

/// Serves a precached document in place of a navigation that could not be answered.
///
/// Only `GET` requests for a document are rescued. Images, scripts,
/// `fetch()` calls and form posts get their original error back.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    page: url::Url,
    cache_name: String,
}

impl OfflineFallback {
    pub fn new(page: url::Url, cache_name: impl Into<String>) -> Self {
        Self { page, cache_name: cache_name.into() }
    }

    pub fn page(&self) -> &url::Url {
        &self.page
    }

    fn request(&self) -> Result<RequestDescriptor, Error> {
        RequestDescriptor::get(self.page.as_str())
    }

    /// Fetch the fallback document and store it in the precache.
    ///
    /// Fails if the document cannot be fetched or is not cacheable.
    pub async fn precache(&self, ctx: &StrategyContext) -> Result<(), Error> {
        let request = self.request()?;
        let response = ctx.fetch(&request).await?;

        if !ctx.cache_put(&self.cache_name, &request, &response).await {
            return Err(Error::NoResponse(format!(
                "fallback page {} answered {} and was not cached",
                self.page, response.status
            )));
        }

        tracing::info!(page = %self.page, cache = %self.cache_name, "precached offline fallback");
        Ok(())
    }

    pub async fn is_cached(&self, ctx: &StrategyContext) -> bool {
        match self.request() {
            Ok(request) => ctx.cache_match(&self.cache_name, &request).await.is_some(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl CatchHandler for OfflineFallback {
    async fn catch(
        &self, request: &RequestDescriptor, error: Error, ctx: &StrategyContext,
    ) -> Result<StrategyResponse, Error> {
        if !request.is_get() || request.destination != Destination::Document {
            return Err(error);
        }

        let fallback = self.request()?;
        match ctx.cache_match(&self.cache_name, &fallback).await {
            Some(page) => {
                tracing::info!(url = %request.url, error = %error, "navigation failed, serving offline fallback");
                Ok(StrategyResponse::new(page, Source::Fallback))
            }
            None => {
                tracing::warn!(url = %request.url, page = %self.page, "offline fallback not cached");
                Err(error)
            }
        }
    }
}
