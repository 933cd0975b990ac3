//! Prometheus metrics for the gateway.
//!
//! The recorder is installed without its own listener; the gateway renders
//! the registry on `GET /actuator/prometheus`. Recording functions are cheap
//! no-ops until [`init_metrics`] has run, so filters can call them freely in
//! tests.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder.
///
/// Calling this more than once is harmless; later calls return `Ok(())`
/// without touching the installed recorder.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if another recorder is already installed.
pub fn init_metrics() -> TelemetryResult<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "gateway_requests_total",
        "Total number of requests that went through the filter chain"
    );
    describe_histogram!(
        "gateway_request_duration_seconds",
        "Time spent in the filter chain, in seconds"
    );
    describe_gauge!(
        "gateway_active_requests",
        "Requests currently inside the filter chain"
    );
    describe_counter!("gateway_cache_hits_total", "Responses served from cache");
    describe_counter!(
        "gateway_cache_misses_total",
        "Cacheable lookups that missed the cache"
    );
}

/// Records a completed request.
pub fn record_request(route: &str, method: &str, status_code: u16, duration: Duration) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records the outcome of a cache lookup.
pub fn record_cache_lookup(route: &str, hit: bool) {
    if hit {
        counter!("gateway_cache_hits_total", "route" => route.to_string()).increment(1);
    } else {
        counter!("gateway_cache_misses_total", "route" => route.to_string()).increment(1);
    }
}

/// Guard that tracks one active request for as long as it lives.
///
/// Dropping the guard also covers requests whose future is cancelled by a
/// client disconnect.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the active requests gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("gateway_active_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("gateway_active_requests").decrement(1.0);
    }
}
