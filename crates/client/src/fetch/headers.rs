//! Header filtering shared by the fetch client and the proxy front.

/// Connection-scoped headers that must not cross a proxy (RFC 9110 §7.6.1).
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request headers the fetch client sets itself.
const CLIENT_OWNED: &[&str] = &["host", "content-length", "accept-encoding", "user-agent"];

/// Response headers that describe the wire encoding rather than the stored body.
const ENCODING: &[&str] = &["content-length", "content-encoding"];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Whether a request header from the page should be forwarded upstream.
pub fn forward_request_header(name: &str) -> bool {
    !is_hop_by_hop(name) && !CLIENT_OWNED.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Whether an upstream response header should be kept with the buffered body.
pub fn keep_response_header(name: &str) -> bool {
    !is_hop_by_hop(name) && !ENCODING.iter().any(|h| name.eq_ignore_ascii_case(h))
}
