//! Request and response logging.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use http::HeaderMap;
use palisade_core::headers;
use std::time::Duration;
use tracing::{info, warn};

/// Requests slower than this are logged at `warn`.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(3000);

/// Logs one line when a request enters the chain and one when it leaves.
///
/// Credentials and cookies are never written.
#[derive(Debug, Clone)]
pub struct LoggingFilter {
    slow_threshold: Duration,
}

impl LoggingFilter {
    /// Creates the filter with the default slow-request threshold.
    pub fn new() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    /// Sets the slow-request threshold.
    #[must_use]
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Renders headers for logging, with sensitive ones removed.
    pub fn loggable_headers(headers: &HeaderMap) -> String {
        let mut rendered: Vec<String> = headers
            .iter()
            .filter(|(name, _)| !headers::is_sensitive(name.as_str()))
            .map(|(name, value)| format!("{}={}", name, value.to_str().unwrap_or("<binary>")))
            .collect();
        rendered.sort();
        rendered.join(", ")
    }
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for LoggingFilter {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let remote = exchange
                .remote_addr()
                .map_or_else(|| "unknown".to_string(), |a| a.to_string());

            info!(
                correlation_id = %exchange.correlation_id(),
                method = %request.method(),
                path = %request.uri().path(),
                query = request.uri().query().unwrap_or_default(),
                remote = %remote,
                headers = %Self::loggable_headers(request.headers()),
                "Incoming request"
            );

            let response = next.run(exchange, request).await;

            let elapsed = exchange.elapsed();
            let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            let status = response.status().as_u16();

            if elapsed > self.slow_threshold {
                warn!(
                    correlation_id = %exchange.correlation_id(),
                    method = %exchange.method(),
                    path = exchange.path(),
                    status,
                    duration_ms,
                    slow_request = true,
                    "Slow request"
                );
            } else {
                info!(
                    correlation_id = %exchange.correlation_id(),
                    method = %exchange.method(),
                    path = exchange.path(),
                    status,
                    duration_ms,
                    "Request completed"
                );
            }

            response
        })
    }
}

impl GlobalFilter for LoggingFilter {
    fn order(&self) -> i32 {
        i32::MIN + 1
    }
}
