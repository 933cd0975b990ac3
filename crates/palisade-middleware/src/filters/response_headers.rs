//! Security headers on every response.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use http::header::{HeaderName, HeaderValue, SERVER};
use http::HeaderMap;

/// Headers added when the backend did not set them.
const SECURITY_HEADERS: [(&str, &str); 7] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains; preload",
    ),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=(), payment=()",
    ),
];

/// Headers that reveal backend implementation details.
const REMOVED_HEADERS: [&str; 1] = ["x-powered-by"];

/// Adds the security headers that are absent and strips `Server` and
/// `X-Powered-By`.
pub fn harden_response_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        let name = HeaderName::from_static(name);
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }

    headers.remove(SERVER);
    for name in REMOVED_HEADERS {
        headers.remove(name);
    }
}

/// Innermost global filter; hardens every response produced inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseHeaderFilter;

impl ResponseHeaderFilter {
    /// Creates the filter.
    pub fn new() -> Self {
        Self
    }
}

impl Filter for ResponseHeaderFilter {
    fn name(&self) -> &'static str {
        "response_headers"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(exchange, request).await;
            harden_response_headers(response.headers_mut());
            response
        })
    }
}

impl GlobalFilter for ResponseHeaderFilter {
    fn order(&self) -> i32 {
        i32::MAX - 1
    }
}
