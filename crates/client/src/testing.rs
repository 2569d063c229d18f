//! Scripted network used by the strategy, router and controller tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stash_core::{CacheDb, CachedResponse, Error, RequestDescriptor};

use crate::fetch::Fetcher;
use crate::strategy::StrategyContext;

/// Serves canned pages by URL; unknown URLs answer 404. Can be switched offline.
pub(crate) struct FakeNetwork {
    pages: Mutex<HashMap<String, CachedResponse>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self { pages: Mutex::new(HashMap::new()), online: AtomicBool::new(true), calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn with_page(self, url: &str, status: u16, body: &'static str) -> Self {
        self.set_page(url, status, body);
        self
    }

    pub(crate) fn set_page(&self, url: &str, status: u16, body: &'static str) {
        let response = CachedResponse::new(url, status, body).with_header("content-type", "text/html");
        self.pages.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Total number of fetches attempted, online or not.
    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {url}")));
        }

        let page = self.pages.lock().unwrap().get(&url).cloned();
        Ok(page.unwrap_or_else(|| CachedResponse::new(url, 404, "not found")))
    }
}

/// A strategy context over an in-memory cache and the given network.
pub(crate) async fn context(network: FakeNetwork) -> (StrategyContext, Arc<FakeNetwork>) {
    let network = Arc::new(network);
    let db = CacheDb::open_in_memory().await.unwrap();
    (StrategyContext::new(network.clone(), db), network)
}
