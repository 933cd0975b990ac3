//! Well-known header names.
//!
//! All names are lowercase so they can be used with
//! [`HeaderName::from_static`](http::header::HeaderName::from_static).

use http::header::HeaderName;

/// Correlation id propagated to backends and echoed to the caller.
pub static CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Subject of a verified JWT.
pub static AUTH_USER: HeaderName = HeaderName::from_static("x-auth-user");

/// `userId` claim of a verified JWT.
pub static AUTH_USER_ID: HeaderName = HeaderName::from_static("x-auth-userid");

/// Comma-joined `roles` claim of a verified JWT.
pub static AUTH_ROLES: HeaderName = HeaderName::from_static("x-auth-roles");

/// Authentication strategy marker set by the introspection filter.
pub static AUTH_TYPE: HeaderName = HeaderName::from_static("x-auth-type");

/// Subject returned by token introspection.
pub static OAUTH2_SUBJECT: HeaderName = HeaderName::from_static("x-oauth2-subject");

/// Client id returned by token introspection.
pub static OAUTH2_CLIENT_ID: HeaderName = HeaderName::from_static("x-oauth2-clientid");

/// Scope returned by token introspection.
pub static OAUTH2_SCOPE: HeaderName = HeaderName::from_static("x-oauth2-scope");

/// Cache hit marker.
pub static CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Remaining TTL of a cache hit, in seconds.
pub static CACHE_TTL: HeaderName = HeaderName::from_static("x-cache-ttl");

/// API version extracted from a versioned path.
pub static API_VERSION: HeaderName = HeaderName::from_static("x-api-version");

/// Marks requests forwarded by the gateway.
pub static GATEWAY_SOURCE: HeaderName = HeaderName::from_static("x-gateway-source");

/// Epoch milliseconds at which the gateway forwarded the request.
pub static GATEWAY_TIMESTAMP: HeaderName = HeaderName::from_static("x-gateway-timestamp");

/// Rate limit: tokens left for the caller.
pub static RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rate limit: bucket size.
pub static RATE_LIMIT_BURST_CAPACITY: HeaderName =
    HeaderName::from_static("x-ratelimit-burst-capacity");

/// Rate limit: tokens added per second.
pub static RATE_LIMIT_REPLENISH_RATE: HeaderName =
    HeaderName::from_static("x-ratelimit-replenish-rate");

/// Internal headers a client must never be able to send to a backend.
pub const RESERVED_INTERNAL: [&str; 6] = [
    "x-internal-token",
    "x-internal-request-id",
    "x-internal-trace",
    "x-debug-mode",
    "x-gateway-secret",
    "x-forwarded-access-token",
];

/// Headers never written to logs.
pub const SENSITIVE: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// Hop-by-hop headers that are not forwarded in either direction.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is hop-by-hop (should not be forwarded).
#[must_use]
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Check if a header must be redacted from logs.
#[must_use]
pub fn is_sensitive(name: &str) -> bool {
    SENSITIVE.iter().any(|s| s.eq_ignore_ascii_case(name))
}
