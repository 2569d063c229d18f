//! Whether a network response may be written to a cache.

use stash_core::{CachedResponse, RequestDescriptor};

/// Result of a cache decision. Both variants keep the response.
#[derive(Debug)]
pub enum CachePolicy<C, N> {
    /// Response should be cached.
    Cacheable(C),
    /// Response should not be cached; pass it through as is.
    NonCacheable(N),
}

/// Only complete `200` answers to anonymous `GET` requests are stored.
///
/// Errors, redirects, partial content and `Vary: *` responses pass through
/// uncached. So does anything tied to one user: requests carrying `Cookie`
/// or `Authorization`, and responses that set a cookie or are marked
/// `private` / `no-store`. The cache is shared by every client of the proxy.
pub fn cache_policy<'a>(
    request: &RequestDescriptor, response: &'a CachedResponse,
) -> CachePolicy<&'a CachedResponse, &'a CachedResponse> {
    let varies_on_everything = response.header("vary").is_some_and(|v| v.trim() == "*");

    if request.is_get() && response.status == 200 && !varies_on_everything && !is_personal(request, response) {
        CachePolicy::Cacheable(response)
    } else {
        CachePolicy::NonCacheable(response)
    }
}

fn is_personal(request: &RequestDescriptor, response: &CachedResponse) -> bool {
    let credentialed = request.header("cookie").is_some() || request.header("authorization").is_some();
    let sets_cookie = response.header("set-cookie").is_some();
    let private = response.header("cache-control").is_some_and(|v| {
        v.split(',')
            .map(|d| d.trim())
            .any(|d| d.eq_ignore_ascii_case("private") || d.eq_ignore_ascii_case("no-store"))
    });
    credentialed || sets_cookie || private
}
