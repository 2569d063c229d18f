//! Structured errors for the stash proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that end a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The controller could not produce a response.
    #[error(transparent)]
    Controller(#[from] stash_core::Error),

    /// The inbound request body could not be read.
    #[error("INVALID_INPUT: request body: {0}")]
    Body(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Controller(err) => StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY),
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "proxy request failed");
        }
        (status, [("x-stash-source", "error")], self.to_string()).into_response()
    }
}
