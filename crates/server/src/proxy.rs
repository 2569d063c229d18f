//! The fetch interceptor: inbound HTTP request → controller → HTTP response.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use stash_client::{StrategyResponse, fetch::is_hop_by_hop};
use stash_core::{Destination, Error, RequestDescriptor, RequestMode, url::resolve_path};

use crate::error::ProxyError;
use crate::handler::AppState;

const SOURCE_HEADER: &str = "x-stash-source";

/// Fallback handler for every non-admin route.
pub async fn proxy(State(state): State<AppState>, request: Request) -> Response {
    match forward(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn forward(state: &AppState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let body = if parts.method == Method::GET || parts.method == Method::HEAD {
        None
    } else {
        let bytes = to_bytes(body, state.max_body)
            .await
            .map_err(|e| ProxyError::Body(e.to_string()))?;
        Some(bytes)
    };

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let descriptor = describe(&state.origin, &parts.method, path_and_query, &parts.headers, body)?;
    let result = state.controller.handle(&descriptor).await?;

    Ok(into_response(&state.origin, result))
}

/// Build the runtime-independent request descriptor from an inbound request.
///
/// Mode and destination come from `Sec-Fetch-Mode` / `Sec-Fetch-Dest`. Clients
/// that send neither are treated as navigating when they `GET` with an
/// `Accept` that asks for HTML.
pub fn describe(
    origin: &url::Url, method: &Method, path_and_query: &str, headers: &HeaderMap, body: Option<Bytes>,
) -> Result<RequestDescriptor, Error> {
    let url = resolve_path(origin, path_and_query)?;
    let mut descriptor = RequestDescriptor::new(method.as_str(), url.as_str())?;

    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    descriptor.mode = match header_str("sec-fetch-mode") {
        Some(mode) => RequestMode::from_header(mode),
        None if *method == Method::GET && header_str("accept").is_some_and(|a| a.contains("text/html")) => {
            RequestMode::Navigate
        }
        None => RequestMode::Cors,
    };

    descriptor.destination = match header_str("sec-fetch-dest") {
        Some(dest) => Destination::from_header(dest),
        None if descriptor.is_navigation() => Destination::Document,
        None => Destination::Empty,
    };

    descriptor.headers = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();
    descriptor.body = body;

    Ok(descriptor)
}

/// Make absolute redirects to the origin relative, so they stay on the proxy.
pub fn rewrite_location(origin: &url::Url, location: &str) -> String {
    let base = origin.origin().ascii_serialization();
    match location.strip_prefix(base.as_str()) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') || rest.starts_with('?') => rest.to_string(),
        _ => location.to_string(),
    }
}

/// Turn a controller result into the HTTP response sent to the page.
pub fn into_response(origin: &url::Url, result: StrategyResponse) -> Response {
    let StrategyResponse { response, source } = result;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in response.headers.iter().filter(|(name, _)| !is_hop_by_hop(name)) {
        let value = if name.eq_ignore_ascii_case("location") { rewrite_location(origin, value) } else { value.clone() };
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable header"),
        }
    }
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));

    (status, headers, Body::from(response.body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_client::Source;
    use stash_core::CachedResponse;

    fn origin() -> url::Url {
        url::Url::parse("http://127.0.0.1:8000").unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_describe_uses_fetch_metadata() {
        let h = headers(&[("sec-fetch-mode", "no-cors"), ("sec-fetch-dest", "image")]);
        let req = describe(&origin(), &Method::GET, "/static/img/cover.jpg", &h, None).unwrap();

        assert_eq!(req.url.as_str(), "http://127.0.0.1:8000/static/img/cover.jpg");
        assert_eq!(req.mode, RequestMode::NoCors);
        assert_eq!(req.destination, Destination::Image);
    }

    #[test]
    fn test_describe_navigation_from_metadata() {
        let h = headers(&[("sec-fetch-mode", "navigate"), ("sec-fetch-dest", "document")]);
        let req = describe(&origin(), &Method::GET, "/status/reading?sort=title", &h, None).unwrap();

        assert!(req.is_navigation());
        assert_eq!(req.url.query(), Some("sort=title"));
    }

    #[test]
    fn test_describe_infers_navigation_from_accept() {
        let h = headers(&[("accept", "text/html,application/xhtml+xml")]);
        let req = describe(&origin(), &Method::GET, "/status/reading", &h, None).unwrap();
        assert!(req.is_navigation());
        assert_eq!(req.destination, Destination::Document);

        let h = headers(&[("accept", "application/json")]);
        let req = describe(&origin(), &Method::GET, "/changelog/latest", &h, None).unwrap();
        assert!(!req.is_navigation());
        assert_eq!(req.destination, Destination::Empty);
    }

    #[test]
    fn test_describe_post_keeps_body_and_headers() {
        let h = headers(&[("accept", "text/html"), ("cookie", "sessionid=abc")]);
        let req = describe(&origin(), &Method::POST, "/book/1/edit", &h, Some(Bytes::from_static(b"title=Dune")))
            .unwrap();

        assert_eq!(req.method, "POST");
        assert!(!req.is_navigation());
        assert_eq!(req.body, Some(Bytes::from_static(b"title=Dune")));
        assert!(req.headers.iter().any(|(k, v)| k == "cookie" && v == "sessionid=abc"));
    }

    #[test]
    fn test_describe_rejects_scheme_relative_path() {
        let result = describe(&origin(), &Method::GET, "//evil.example.com/x", &HeaderMap::new(), None);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_rewrite_location() {
        let origin = origin();
        assert_eq!(rewrite_location(&origin, "http://127.0.0.1:8000/accounts/login/?next=/"), "/accounts/login/?next=/");
        assert_eq!(rewrite_location(&origin, "http://127.0.0.1:8000"), "/");
        assert_eq!(rewrite_location(&origin, "/relative"), "/relative");
        assert_eq!(rewrite_location(&origin, "https://openlibrary.org/x"), "https://openlibrary.org/x");
        assert_eq!(rewrite_location(&origin, "http://127.0.0.1:80001/x"), "http://127.0.0.1:80001/x");
    }

    #[test]
    fn test_into_response() {
        let cached = CachedResponse::new("http://127.0.0.1:8000/status/reading", 302, "")
            .with_header("Location", "http://127.0.0.1:8000/accounts/login/")
            .with_header("Connection", "close")
            .with_header("Content-Length", "999")
            .with_header("Set-Cookie", "a=1")
            .with_header("Set-Cookie", "b=2");

        let response = into_response(&origin(), StrategyResponse::new(cached, Source::Network));

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/accounts/login/");
        assert_eq!(response.headers()[SOURCE_HEADER], "network");
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert_ne!(response.headers().get(header::CONTENT_LENGTH).map(|v| v.as_bytes()), Some(&b"999"[..]));
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
