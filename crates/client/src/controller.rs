//! The offline cache controller: routing table plus install/activate lifecycle.
//!
//! Wiring built by [`Controller::from_config`]:
//!
//! - image requests → cache-first over the runtime cache
//! - everything else (`GET`) → network-first over the runtime cache
//! - failed navigations → the precached fallback document
//! - install → precache the fallback, warm the warm set through cache-first
//! - activate → delete caches of older versions, apply the optional entry cap
//!   (the warm set is never evicted by the cap)

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use stash_core::{AppConfig, CacheDb, Destination, Error, RequestDescriptor, url::resolve_path};
use tokio::sync::{Mutex, watch};

use crate::fetch::Fetcher;
use crate::recipes::{OfflineFallback, WarmReport, warm_strategy_cache};
use crate::router::{Matcher, Router};
use crate::strategy::{CacheFirst, NetworkFirst, Strategy, StrategyContext, StrategyResponse};

/// Lifecycle of a controller. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Parsed,
    Installed,
    Activated,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Parsed => "parsed",
            Lifecycle::Installed => "installed",
            Lifecycle::Activated => "activated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    /// Set when install had already run and nothing was done.
    pub skipped: bool,
    pub warm: WarmReport,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    pub skipped: bool,
    pub deleted_caches: Vec<String>,
    pub purged_entries: u64,
}

pub struct Controller {
    router: Router,
    ctx: StrategyContext,
    fallback: Arc<OfflineFallback>,
    warm_urls: Vec<url::Url>,
    warm_strategy: Arc<dyn Strategy>,
    cache_prefix: String,
    runtime_cache: String,
    current_caches: Vec<String>,
    max_entries: Option<usize>,
    /// Serialises install and activate.
    transition: Mutex<()>,
    state: watch::Sender<Lifecycle>,
}

impl Controller {
    /// Build the standard routing table for the configured origin.
    pub fn from_config(config: &AppConfig, fetcher: Arc<dyn Fetcher>, db: CacheDb) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let runtime_cache = config.runtime_cache();

        let cache_first: Arc<dyn Strategy> = Arc::new(CacheFirst::new(&runtime_cache));
        let network_first: Arc<dyn Strategy> = Arc::new(NetworkFirst::new(&runtime_cache));
        let fallback = Arc::new(OfflineFallback::new(
            resolve_path(&origin, &config.fallback_path)?,
            config.precache_cache(),
        ));

        let mut router = Router::new();
        router
            .register_route(Matcher::Destination(Destination::Image), cache_first.clone())
            .set_default_handler(network_first)
            .set_catch_handler(fallback.clone());

        let warm_urls = config
            .warm_urls
            .iter()
            .map(|path| resolve_path(&origin, path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            router,
            ctx: StrategyContext::new(fetcher, db),
            fallback,
            warm_urls,
            warm_strategy: cache_first,
            cache_prefix: config.cache_prefix.clone(),
            runtime_cache,
            current_caches: config.current_caches(),
            max_entries: config.max_entries,
            transition: Mutex::new(()),
            state: watch::Sender::new(Lifecycle::Parsed),
        })
    }

    /// Decide how to answer one intercepted request and answer it.
    ///
    /// Requests are routed in every lifecycle state.
    pub async fn handle(&self, request: &RequestDescriptor) -> Result<StrategyResponse, Error> {
        self.router.handle(request, &self.ctx).await
    }

    /// Precache the fallback document and warm the warm set.
    ///
    /// Fails only if the fallback cannot be precached; warm failures are
    /// reported in the [`WarmReport`]. Runs once; later calls are skipped.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _transition = self.transition.lock().await;
        self.install_locked().await
    }

    async fn install_locked(&self) -> Result<InstallReport, Error> {
        let state = self.lifecycle();
        if state >= Lifecycle::Installed {
            tracing::debug!(state = %state, "install already done");
            return Ok(InstallReport { skipped: true, ..Default::default() });
        }

        self.fallback.precache(&self.ctx).await?;
        let warm = warm_strategy_cache(&self.warm_urls, self.warm_strategy.as_ref(), &self.ctx).await;

        self.state.send_replace(Lifecycle::Installed);
        tracing::info!(warmed = warm.warmed(), failed = warm.failed.len(), "controller installed");
        Ok(InstallReport { skipped: false, warm })
    }

    /// Retire caches left behind by older versions. Installs first if needed.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _transition = self.transition.lock().await;
        if self.lifecycle() == Lifecycle::Activated {
            return Ok(ActivateReport { skipped: true, ..Default::default() });
        }
        self.install_locked().await?;

        let deleted_caches = self
            .ctx
            .db()
            .delete_outdated_caches(&self.cache_prefix, &self.current_caches)
            .await?;

        let purged_entries = match self.max_entries {
            Some(max) => {
                let keep: Vec<String> = self.warm_urls.iter().map(|url| url.to_string()).collect();
                self.ctx.db().purge_oldest(&self.runtime_cache, max, &keep).await?
            }
            None => 0,
        };

        self.state.send_replace(Lifecycle::Activated);
        tracing::info!(deleted = deleted_caches.len(), purged_entries, "controller activated");
        Ok(ActivateReport { skipped: false, deleted_caches, purged_entries })
    }

    /// Current lifecycle state. Never waits on a running install or activate.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.state.borrow()
    }

    pub fn db(&self) -> &CacheDb {
        self.ctx.db()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn warm_urls(&self) -> &[url::Url] {
        &self.warm_urls
    }

    pub fn fallback_page(&self) -> &url::Url {
        self.fallback.page()
    }

    pub fn current_caches(&self) -> &[String] {
        &self.current_caches
    }
}
