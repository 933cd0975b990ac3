//! Request metrics.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use palisade_telemetry::metrics::record_request;
use palisade_telemetry::InFlightGuard;

/// Label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Records the active-request gauge, the request counter and the duration
/// histogram, labelled with the matched route id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFilter;

impl MetricsFilter {
    /// Creates the filter.
    pub fn new() -> Self {
        Self
    }
}

impl Filter for MetricsFilter {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let _in_flight = InFlightGuard::new();
            let method = request.method().to_string();

            let response = next.run(exchange, request).await;

            record_request(
                exchange.route_id().unwrap_or(UNMATCHED_ROUTE),
                &method,
                response.status().as_u16(),
                exchange.elapsed(),
            );
            response
        })
    }
}

impl GlobalFilter for MetricsFilter {
    fn order(&self) -> i32 {
        i32::MIN + 2
    }
}
