//! Request header hygiene.
//!
//! Strips internally reserved headers a client must never be able to send to
//! a backend, and marks the request as forwarded by the gateway.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use chrono::Utc;
use http::header::{HeaderName, HeaderValue};
use palisade_core::headers;
use tracing::debug;

/// Value of `X-Gateway-Source`.
pub const GATEWAY_SOURCE: &str = "api-gateway";

/// Removes reserved headers and adds gateway markers.
#[derive(Debug, Clone)]
pub struct RequestHeaderFilter {
    remove: Vec<HeaderName>,
}

impl RequestHeaderFilter {
    /// Creates the filter removing the reserved headers.
    pub fn new() -> Self {
        Self {
            remove: headers::RESERVED_INTERNAL
                .iter()
                .map(|name| HeaderName::from_static(name))
                .collect(),
        }
    }

    /// Also removes the given headers. Invalid names are skipped.
    #[must_use]
    pub fn with_additional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            match HeaderName::from_bytes(name.as_ref().trim().as_bytes()) {
                Ok(name) if !self.remove.contains(&name) => self.remove.push(name),
                Ok(_) => {}
                Err(_) => {
                    tracing::warn!(header = name.as_ref(), "Ignoring invalid header name");
                }
            }
        }
        self
    }

    /// Returns the headers this filter removes.
    pub fn removed_headers(&self) -> &[HeaderName] {
        &self.remove
    }
}

impl Default for RequestHeaderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for RequestHeaderFilter {
    fn name(&self) -> &'static str {
        "request_headers"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_headers = request.headers_mut();
            for name in &self.remove {
                if request_headers.remove(name).is_some() {
                    debug!(
                        correlation_id = %exchange.correlation_id(),
                        header = %name,
                        "Removed reserved request header"
                    );
                }
            }

            request_headers.insert(
                headers::GATEWAY_SOURCE.clone(),
                HeaderValue::from_static(GATEWAY_SOURCE),
            );
            request_headers.insert(
                headers::GATEWAY_TIMESTAMP.clone(),
                HeaderValue::from(Utc::now().timestamp_millis()),
            );

            next.run(exchange, request).await
        })
    }
}

impl GlobalFilter for RequestHeaderFilter {
    fn order(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_request, ResponseExt};
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use parking_lot::Mutex;
    use std::sync::Arc;

    async fn forwarded_headers(filter: &RequestHeaderFilter, request: Request) -> HeaderMap {
        let seen = Arc::new(Mutex::new(HeaderMap::new()));
        let sink = seen.clone();
        let next = Next::dispatch(move |_exchange, request: Request| {
            *sink.lock() = request.headers().clone();
            Box::pin(async { Response::with_body(StatusCode::OK, "text/plain", Bytes::new()) })
        });

        let mut exchange = Exchange::default();
        filter.process(&mut exchange, request, next).await;
        let headers = seen.lock().clone();
        headers
    }

    #[tokio::test]
    async fn test_reserved_headers_never_reach_backend() {
        let mut request = empty_request(Method::GET, "/api/users");
        for name in headers::RESERVED_INTERNAL {
            request
                .headers_mut()
                .insert(HeaderName::from_static(name), HeaderValue::from_static("spoofed"));
        }
        request
            .headers_mut()
            .insert("accept", HeaderValue::from_static("application/json"));

        let forwarded = forwarded_headers(&RequestHeaderFilter::new(), request).await;

        for name in headers::RESERVED_INTERNAL {
            assert!(forwarded.get(name).is_none(), "{name} was forwarded");
        }
        assert_eq!(forwarded.get("accept").unwrap(), "application/json");
        assert_eq!(forwarded.get(&headers::GATEWAY_SOURCE).unwrap(), "api-gateway");
        assert!(forwarded.get(&headers::GATEWAY_TIMESTAMP).is_some());
    }

    #[tokio::test]
    async fn test_additional_headers_removed() {
        let filter = RequestHeaderFilter::new().with_additional(["X-Legacy-Session", "bad header"]);
        assert_eq!(filter.removed_headers().len(), headers::RESERVED_INTERNAL.len() + 1);

        let mut request = empty_request(Method::GET, "/");
        request
            .headers_mut()
            .insert("x-legacy-session", HeaderValue::from_static("1"));

        let forwarded = forwarded_headers(&filter, request).await;
        assert!(forwarded.get("x-legacy-session").is_none());
    }
}
