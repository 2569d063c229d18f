//! Warm strategy cache: fetch a fixed list of URLs through a strategy at install time.

use futures_util::future::join_all;
use serde::Serialize;
use stash_core::RequestDescriptor;

use crate::strategy::{Source, Strategy, StrategyContext};

/// Outcome of a warming pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmReport {
    /// URLs fetched from the network and stored.
    pub stored: Vec<String>,
    /// URLs that were already cached.
    pub already_cached: Vec<String>,
    /// URLs that could not be warmed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl WarmReport {
    pub fn warmed(&self) -> usize {
        self.stored.len() + self.already_cached.len()
    }
}

/// Run every URL through `strategy` concurrently.
///
/// Best effort: failures are logged and reported, never raised and never
/// retried. A response that comes back but is not cacheable (a 404, a
/// redirect to a login page) counts as a failure.
pub async fn warm_strategy_cache(urls: &[url::Url], strategy: &dyn Strategy, ctx: &StrategyContext) -> WarmReport {
    let attempts = urls.iter().map(|url| async move {
        let outcome = match RequestDescriptor::get(url.as_str()) {
            Ok(request) => ctx.fetch_with_strategy(&request, strategy).await,
            Err(e) => Err(e),
        };
        (url.to_string(), outcome)
    });

    let mut report = WarmReport::default();
    for (url, outcome) in join_all(attempts).await {
        match outcome {
            Ok(r) if r.source == Source::Cache => report.already_cached.push(url),
            Ok(r) if r.response.status == 200 => report.stored.push(url),
            Ok(r) => {
                tracing::warn!(url = %url, status = r.response.status, "warm URL not cacheable");
                report.failed.push((url, format!("status {}", r.response.status)));
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to warm URL");
                report.failed.push((url, e.to_string()));
            }
        }
    }

    tracing::info!(
        strategy = strategy.name(),
        stored = report.stored.len(),
        already_cached = report.already_cached.len(),
        failed = report.failed.len(),
        "warmed strategy cache"
    );

    report
}
