//! Correlation id stamping.
//!
//! Reuses an inbound `X-Correlation-Id` or generates a UUID v7, then sets it
//! on the outbound request, on the exchange and on the response.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use http::HeaderValue;
use palisade_core::{headers, CorrelationId};

/// Outermost global filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationIdFilter;

impl CorrelationIdFilter {
    /// Creates the filter.
    pub fn new() -> Self {
        Self
    }

    fn extract(request: &Request) -> Option<CorrelationId> {
        request
            .headers()
            .get(&headers::CORRELATION_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(CorrelationId::from_header)
    }
}

impl Filter for CorrelationIdFilter {
    fn name(&self) -> &'static str {
        "correlation_id"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let correlation_id = Self::extract(&request).unwrap_or_default();
            let value = HeaderValue::from_str(correlation_id.as_str()).ok();

            if let Some(value) = &value {
                request
                    .headers_mut()
                    .insert(headers::CORRELATION_ID.clone(), value.clone());
            }
            tracing::Span::current().record("correlation_id", correlation_id.as_str());
            exchange.set_correlation_id(correlation_id);

            let mut response = next.run(exchange, request).await;

            if let Some(value) = value {
                response
                    .headers_mut()
                    .insert(headers::CORRELATION_ID.clone(), value);
            }
            response
        })
    }
}

impl GlobalFilter for CorrelationIdFilter {
    fn order(&self) -> i32 {
        i32::MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_request, ResponseExt};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use parking_lot::Mutex;
    use std::sync::Arc;

    async fn run(request: Request) -> (Exchange, Response, Option<String>) {
        let seen = Arc::new(Mutex::new(None));
        let seen_by_dispatch = seen.clone();
        let filter = CorrelationIdFilter::new();
        let mut exchange = Exchange::default();

        let next = Next::dispatch(move |_exchange, request: Request| {
            *seen_by_dispatch.lock() = request
                .headers()
                .get(&headers::CORRELATION_ID)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            Box::pin(async { Response::with_body(StatusCode::OK, "text/plain", Bytes::new()) })
        });

        let response = filter.process(&mut exchange, request, next).await;
        let seen = seen.lock().clone();
        (exchange, response, seen)
    }

    #[tokio::test]
    async fn test_reuses_inbound_id() {
        let mut request = empty_request(Method::GET, "/api/users");
        request
            .headers_mut()
            .insert(headers::CORRELATION_ID.clone(), HeaderValue::from_static("abc-123"));

        let (exchange, response, seen) = run(request).await;

        assert_eq!(exchange.correlation_id().as_str(), "abc-123");
        assert_eq!(seen.as_deref(), Some("abc-123"));
        assert_eq!(
            response.headers().get(&headers::CORRELATION_ID).unwrap(),
            "abc-123"
        );
    }

    #[tokio::test]
    async fn test_generates_missing_id() {
        let (exchange, response, seen) = run(empty_request(Method::GET, "/")).await;

        let generated = exchange.correlation_id().as_str().to_string();
        assert!(!generated.is_empty());
        assert_eq!(seen.as_deref(), Some(generated.as_str()));
        assert_eq!(
            response.headers().get(&headers::CORRELATION_ID).unwrap(),
            generated.as_str()
        );
    }

    #[test]
    fn test_order() {
        assert_eq!(CorrelationIdFilter::new().order(), i32::MIN);
    }
}
