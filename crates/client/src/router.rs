//! Request routing: pick exactly one strategy per request.
//!
//! Routes are tested in registration order and the first match wins. The
//! default handler only applies to `GET` requests no route claimed; anything
//! else goes straight to the network, as if it had never been intercepted.
//! When the chosen strategy fails, the catch handler gets one chance to
//! produce a response.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use stash_core::{Destination, Error, RequestDescriptor};

use crate::strategy::{NetworkOnly, Strategy, StrategyContext, StrategyResponse};

/// Request predicate of a route.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `Sec-Fetch-Dest` equals the given destination.
    Destination(Destination),
    /// Top-level navigations.
    Navigation,
    /// Exact path match.
    Path(String),
    /// Path starts with the given prefix.
    PathPrefix(String),
    /// Regex over the full URL.
    Regex(Regex),
}

impl Matcher {
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        match self {
            Matcher::Destination(destination) => request.destination == *destination,
            Matcher::Navigation => request.is_navigation(),
            Matcher::Path(path) => request.path() == path,
            Matcher::PathPrefix(prefix) => request.path().starts_with(prefix.as_str()),
            Matcher::Regex(re) => re.is_match(request.url.as_str()),
        }
    }
}

/// A cache strategy binding.
#[derive(Debug, Clone)]
pub struct Route {
    pub matcher: Matcher,
    pub method: String,
    pub strategy: Arc<dyn Strategy>,
}

impl Route {
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        request.method == self.method && self.matcher.matches(request)
    }
}

/// Last-chance handler run when the routed strategy fails.
#[async_trait]
pub trait CatchHandler: Send + Sync {
    /// Return a substitute response, or give the error back.
    async fn catch(
        &self, request: &RequestDescriptor, error: Error, ctx: &StrategyContext,
    ) -> Result<StrategyResponse, Error>;
}

pub struct Router {
    routes: Vec<Route>,
    default_handler: Option<Arc<dyn Strategy>>,
    catch_handler: Option<Arc<dyn CatchHandler>>,
    passthrough: Arc<dyn Strategy>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new(), default_handler: None, catch_handler: None, passthrough: Arc::new(NetworkOnly) }
    }

    /// Bind `strategy` to `GET` requests matching `matcher`.
    pub fn register_route(&mut self, matcher: Matcher, strategy: Arc<dyn Strategy>) -> &mut Self {
        self.register_route_for("GET", matcher, strategy)
    }

    pub fn register_route_for(&mut self, method: &str, matcher: Matcher, strategy: Arc<dyn Strategy>) -> &mut Self {
        self.routes.push(Route { matcher, method: method.to_ascii_uppercase(), strategy });
        self
    }

    pub fn set_default_handler(&mut self, strategy: Arc<dyn Strategy>) -> &mut Self {
        self.default_handler = Some(strategy);
        self
    }

    pub fn set_catch_handler(&mut self, handler: Arc<dyn CatchHandler>) -> &mut Self {
        self.catch_handler = Some(handler);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The strategy that will answer `request`.
    pub fn find_strategy(&self, request: &RequestDescriptor) -> &Arc<dyn Strategy> {
        if let Some(route) = self.routes.iter().find(|route| route.matches(request)) {
            return &route.strategy;
        }
        match &self.default_handler {
            Some(default) if request.is_get() => default,
            _ => &self.passthrough,
        }
    }

    pub async fn handle(&self, request: &RequestDescriptor, ctx: &StrategyContext) -> Result<StrategyResponse, Error> {
        let strategy = self.find_strategy(request);

        match ctx.fetch_with_strategy(request, strategy.as_ref()).await {
            Ok(response) => Ok(response),
            Err(error) => match &self.catch_handler {
                Some(catch) => catch.catch(request, error, ctx).await,
                None => Err(error),
            },
        }
    }
}
