//! Offline cache controller for stash.
//!
//! This crate provides the network fetch client, the caching strategies,
//! the router that binds strategies to requests, the offline-fallback and
//! cache-warming recipes, and the controller that ties them together.

pub mod controller;
pub mod fetch;
pub mod recipes;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ActivateReport, Controller, InstallReport, Lifecycle};
pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use recipes::{OfflineFallback, WarmReport, warm_strategy_cache};
pub use router::{CatchHandler, Matcher, Route, Router};
pub use strategy::{
    CacheFirst, CacheOnly, NetworkFirst, NetworkOnly, Source, Strategy, StrategyContext, StrategyResponse,
};
