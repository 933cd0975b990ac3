//! Gateway filters.
//!
//! Global filters and their orders:
//!
//! | Filter | Order |
//! |--------|-------|
//! | [`CorrelationIdFilter`] | `i32::MIN` |
//! | [`LoggingFilter`] | `i32::MIN + 1` |
//! | [`MetricsFilter`] | `i32::MIN + 2` |
//! | [`RateLimitFilter`] | `-100` |
//! | [`RequestHeaderFilter`] | `0` |
//! | [`ResponseHeaderFilter`] | `i32::MAX - 1` |
//!
//! Route filters run in the order a route declares them:
//! [`JwtAuthFilter`], [`OAuth2Filter`], [`ResponseCacheFilter`],
//! [`ApiVersionFilter`], [`StripPrefixFilter`].

pub mod api_version;
pub mod correlation_id;
pub mod jwt_auth;
pub mod logging;
pub mod metrics;
pub mod oauth2;
pub mod rate_limit;
pub mod request_headers;
pub mod response_cache;
pub mod response_headers;
pub mod strip_prefix;

pub use api_version::ApiVersionFilter;
pub use correlation_id::CorrelationIdFilter;
pub use jwt_auth::JwtAuthFilter;
pub use logging::LoggingFilter;
pub use metrics::MetricsFilter;
pub use oauth2::OAuth2Filter;
pub use rate_limit::{RateLimitDecision, RateLimitFilter, RateLimiter, TokenBucketLimiter};
pub use request_headers::RequestHeaderFilter;
pub use response_cache::ResponseCacheFilter;
pub use response_headers::{harden_response_headers, ResponseHeaderFilter};
pub use strip_prefix::StripPrefixFilter;

use crate::types::Request;
use http::uri::{PathAndQuery, Uri};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Inserts a header value built from a string, skipping values that are not
/// valid header text.
pub(crate) fn insert_str(headers: &mut HeaderMap, name: &HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name.clone(), value);
        }
        Err(_) => {
            tracing::warn!(header = %name, "Dropping header with invalid value");
        }
    }
}

/// Extracts the bearer token from an `Authorization` header.
///
/// Returns `None` when the header is absent, blank or not `Bearer `-prefixed.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.trim().is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Replaces the request path, keeping the raw query string.
pub(crate) fn rewrite_path(request: &mut Request, path: &str) {
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let Ok(path_and_query) = PathAndQuery::try_from(path_and_query) else {
        tracing::warn!(path, "Ignoring invalid rewritten path");
        return;
    };

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    match Uri::from_parts(parts) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(e) => tracing::warn!(path, error = %e, "Ignoring invalid rewritten uri"),
    }
}
