//! Cache keys.

use std::fmt;

use http::Method;

/// Key of a cached response: `METHOD|PATH` or `METHOD|PATH?QUERY`.
///
/// Derived only from the method, the path and the raw query string, so two
/// requests that differ only in headers share a key. Only `GET` requests are
/// ever keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a request line.
    ///
    /// Returns `None` for any method other than `GET`.
    pub fn new(method: &Method, path: &str, raw_query: Option<&str>) -> Option<Self> {
        if method != Method::GET {
            return None;
        }
        let key = match raw_query {
            Some(query) if !query.is_empty() => format!("{method}|{path}?{query}"),
            _ => format!("{method}|{path}"),
        };
        Some(Self(key))
    }

    /// Builds the key for an HTTP request.
    pub fn for_request<B>(request: &http::Request<B>) -> Option<Self> {
        let uri = request.uri();
        Self::new(request.method(), uri.path(), uri.query())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the segment before the first `|`, used for stats grouping.
    pub fn prefix(&self) -> &str {
        self.0.split('|').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
