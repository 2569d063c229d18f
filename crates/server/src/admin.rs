//! JSON admin endpoints: health, cache listing, cache deletion, re-activation.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use stash_client::{ActivateReport, Lifecycle};
use stash_core::{CacheSummary, EntryKey};

use crate::error::ProxyError;
use crate::handler::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    lifecycle: Lifecycle,
}

#[derive(Serialize)]
struct CachesResponse {
    current: Vec<String>,
    caches: Vec<CacheSummary>,
}

#[derive(Serialize)]
struct KeysResponse {
    cache: String,
    entries: Vec<EntryKey>,
}

#[derive(Serialize)]
struct DeleteResponse {
    cache: String,
    deleted: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/caches", get(list_caches))
        .route("/caches/{name}", get(list_keys).delete(delete_cache))
        .route("/activate", post(activate))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok", lifecycle: state.controller.lifecycle() })
}

async fn list_caches(State(state): State<AppState>) -> Result<Json<CachesResponse>, ProxyError> {
    let caches = state.controller.db().cache_summaries().await?;
    Ok(Json(CachesResponse { current: state.controller.current_caches().to_vec(), caches }))
}

async fn list_keys(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<KeysResponse>, ProxyError> {
    let entries = state.controller.db().keys(&name).await?;
    Ok(Json(KeysResponse { cache: name, entries }))
}

async fn delete_cache(State(state): State<AppState>, Path(name): Path<String>) -> Result<Response, ProxyError> {
    let deleted = state.controller.db().delete_cache(&name).await?;
    tracing::info!(cache = %name, deleted, "cache deleted via admin endpoint");
    Ok(Json(DeleteResponse { cache: name, deleted }).into_response())
}

/// Run install/activate again, e.g. after the origin was down at startup.
async fn activate(State(state): State<AppState>) -> Result<Json<ActivateReport>, ProxyError> {
    Ok(Json(state.controller.activate().await?))
}
