//! Application state and the axum router.
//!
//! Admin endpoints live under the configured prefix; every other request is
//! handed to the controller by [`crate::proxy::proxy`].

use std::sync::Arc;

use axum::Router;
use stash_client::Controller;
use stash_core::AppConfig;
use tower_http::trace::TraceLayer;

use crate::{admin, proxy};

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    /// Origin requests are resolved against.
    pub origin: url::Url,
    /// Largest request body forwarded upstream.
    pub max_body: usize,
}

impl AppState {
    pub fn new(controller: Arc<Controller>, config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self { controller, origin: config.origin_url()?, max_body: config.max_bytes })
    }
}

/// Build the full application.
pub fn app(state: AppState, admin_prefix: &str) -> Router {
    Router::new()
        .nest(admin_prefix, admin::routes())
        .fallback(proxy::proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::extract::{Request, State};
    use axum::http::{Method, StatusCode};
    use serde_json::Value;
    use stash_client::{Fetcher, Lifecycle};
    use tower::ServiceExt;
    use stash_core::{CacheDb, CachedResponse, Error, RequestDescriptor};

    const ORIGIN: &str = "http://127.0.0.1:8000";

    /// Origin that knows a handful of pages and can be unplugged.
    struct Origin {
        online: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for Origin {
        async fn fetch(&self, request: &RequestDescriptor) -> Result<CachedResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.online.load(Ordering::SeqCst) {
                return Err(Error::Network("connection refused".into()));
            }
            if request.path() == "/status/mine" {
                let Some(cookie) = request.header("cookie") else {
                    return Ok(CachedResponse::new(request.url.as_str(), 200, "<h1>Sign in</h1>"));
                };
                let user = cookie.trim_start_matches("sessionid=").to_string();
                return Ok(CachedResponse::new(request.url.as_str(), 200, format!("{user}'s books"))
                    .with_header("set-cookie", format!("sessionid={user}")));
            }
            let body: &'static str = match request.path() {
                "/offline" => "<h1>Offline</h1>",
                "/status/reading" => "<h1>Reading</h1>",
                "/static/css/main.css" => "body{}",
                "/static/img/cover.jpg" => "jpeg",
                _ => return Ok(CachedResponse::new(request.url.as_str(), 404, "missing")),
            };
            Ok(CachedResponse::new(request.url.as_str(), 200, body).with_header("content-type", "text/html"))
        }
    }

    async fn unactivated(warm: &[&str], online: bool) -> (AppState, Arc<Origin>) {
        let config = AppConfig {
            origin: ORIGIN.into(),
            warm_urls: warm.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let origin = Arc::new(Origin { online: AtomicBool::new(online), calls: AtomicUsize::new(0) });
        let db = CacheDb::open_in_memory().await.unwrap();
        let controller = Arc::new(Controller::from_config(&config, origin.clone(), db).unwrap());
        (AppState::new(controller, &config).unwrap(), origin)
    }

    async fn state(warm: &[&str]) -> (AppState, Arc<Origin>) {
        let (state, origin) = unactivated(warm, true).await;
        state.controller.activate().await.unwrap();
        (state, origin)
    }

    fn navigation(path: &str) -> Request {
        Request::builder()
            .uri(path)
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_of(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_cached_image_no_network() {
        let (state, origin) = state(&[]).await;
        let image = || {
            Request::builder()
                .uri("/static/img/cover.jpg")
                .header("sec-fetch-dest", "image")
                .header("sec-fetch-mode", "no-cors")
                .body(Body::empty())
                .unwrap()
        };

        let first = proxy::proxy(State(state.clone()), image()).await;
        assert_eq!(first.headers()["x-stash-source"], "network");
        let calls = origin.calls.load(Ordering::SeqCst);

        let second = proxy::proxy(State(state), image()).await;
        assert_eq!(second.headers()["x-stash-source"], "cache");
        assert_eq!(body_of(second).await, "jpeg");
        assert_eq!(origin.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_live_status_page() {
        let (state, _origin) = state(&[]).await;
        let response = proxy::proxy(State(state.clone()), navigation("/status/reading")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-stash-source"], "network");
        assert_eq!(body_of(response).await, "<h1>Reading</h1>");

        let runtime = state.controller.current_caches()[0].clone();
        assert!(
            state
                .controller
                .db()
                .has_entry(&runtime, "GET", &format!("{ORIGIN}/status/reading"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_fallback() {
        let (state, origin) = state(&[]).await;
        origin.online.store(false, Ordering::SeqCst);

        let response = proxy::proxy(State(state), navigation("/status/reading")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-stash-source"], "fallback");
        assert_eq!(body_of(response).await, "<h1>Offline</h1>");
    }

    #[tokio::test]
    async fn test_offline_warmed_page_served_from_cache() {
        let (state, origin) = state(&["/status/reading"]).await;
        origin.online.store(false, Ordering::SeqCst);

        let response = proxy::proxy(State(state), navigation("/status/reading")).await;
        assert_eq!(response.headers()["x-stash-source"], "cache");
        assert_eq!(body_of(response).await, "<h1>Reading</h1>");
    }

    #[tokio::test]
    async fn test_offline_fetch_is_bad_gateway() {
        let (state, origin) = state(&[]).await;
        origin.online.store(false, Ordering::SeqCst);

        let request = Request::builder()
            .uri("/changelog/latest")
            .header("accept", "application/json")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let response = proxy::proxy(State(state), request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()["x-stash-source"], "error");
    }

    #[tokio::test]
    async fn test_personal_page_not_replayed_to_other_user() {
        let (state, origin) = state(&[]).await;

        let alice = Request::builder()
            .uri("/status/mine")
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-dest", "document")
            .header("cookie", "sessionid=alice")
            .body(Body::empty())
            .unwrap();
        let response = proxy::proxy(State(state.clone()), alice).await;
        assert_eq!(response.headers()["x-stash-source"], "network");
        assert_eq!(body_of(response).await, "alice's books");

        origin.online.store(false, Ordering::SeqCst);
        let bob = Request::builder()
            .uri("/status/mine")
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-dest", "document")
            .header("cookie", "sessionid=bob")
            .body(Body::empty())
            .unwrap();
        let response = proxy::proxy(State(state), bob).await;
        assert_eq!(response.headers()["x-stash-source"], "fallback");
        assert!(response.headers().get("set-cookie").is_none());
        assert_eq!(body_of(response).await, "<h1>Offline</h1>");
    }

    const ADMIN: &str = "/__stash";

    async fn admin(state: &AppState, method: Method, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(format!("{ADMIN}{path}"))
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone(), ADMIN).oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_of(response).await)
    }

    async fn admin_json(state: &AppState, method: Method, path: &str) -> Value {
        let (status, body) = admin(state, method, path).await;
        assert_eq!(status, StatusCode::OK, "{path}: {body}");
        serde_json::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn test_admin_health() {
        let (state, _origin) = state(&[]).await;
        let health = admin_json(&state, Method::GET, "/health").await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["lifecycle"], "activated");
    }

    #[tokio::test]
    async fn test_admin_lists_caches_and_keys() {
        let (state, _origin) = state(&["/status/reading"]).await;

        let caches = admin_json(&state, Method::GET, "/caches").await;
        assert_eq!(caches["current"], serde_json::json!(["stash-runtime-v1", "stash-precache-v1"]));
        let listed = caches["caches"].as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["name"], "stash-precache-v1");
        assert_eq!(listed[0]["entries"], 1);
        assert_eq!(listed[1]["name"], "stash-runtime-v1");
        assert_eq!(listed[1]["entries"], 1);

        let keys = admin_json(&state, Method::GET, "/caches/stash-runtime-v1").await;
        assert_eq!(keys["cache"], "stash-runtime-v1");
        assert_eq!(keys["entries"][0]["method"], "GET");
        assert_eq!(keys["entries"][0]["url"], format!("{ORIGIN}/status/reading"));
        assert_eq!(keys["entries"][0]["status"], 200);
    }

    #[tokio::test]
    async fn test_admin_deletes_cache() {
        let (state, _origin) = state(&["/status/reading"]).await;

        let deleted = admin_json(&state, Method::DELETE, "/caches/stash-runtime-v1").await;
        assert_eq!(deleted["cache"], "stash-runtime-v1");
        assert_eq!(deleted["deleted"], 1);

        let keys = admin_json(&state, Method::GET, "/caches/stash-runtime-v1").await;
        assert!(keys["entries"].as_array().unwrap().is_empty());
        assert!(
            !state
                .controller
                .db()
                .has_entry("stash-runtime-v1", "GET", &format!("{ORIGIN}/status/reading"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_admin_activate_after_failed_startup() {
        let (state, origin) = unactivated(&["/status/reading"], false).await;
        assert!(state.controller.activate().await.is_err());

        let (status, _body) = admin(&state, Method::POST, "/activate").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(state.controller.lifecycle(), Lifecycle::Parsed);

        origin.online.store(true, Ordering::SeqCst);
        let report = admin_json(&state, Method::POST, "/activate").await;
        assert_eq!(report["skipped"], false);
        assert_eq!(state.controller.lifecycle(), Lifecycle::Activated);

        let again = admin_json(&state, Method::POST, "/activate").await;
        assert_eq!(again["skipped"], true);
    }

    #[tokio::test]
    async fn test_admin_prefix_does_not_shadow_proxy() {
        let (state, _origin) = state(&[]).await;
        let response = app(state, ADMIN).oneshot(navigation("/status/reading")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-stash-source"], "network");
    }
}
