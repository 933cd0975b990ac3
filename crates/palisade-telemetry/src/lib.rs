//! Observability for the Palisade gateway.
//!
//! - **Logging**: structured JSON (or pretty, for development) output through
//!   `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` facade, rendered
//!   on demand by the gateway's `/actuator/prometheus` endpoint
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `gateway_requests_total` | Counter | `route`, `method`, `status` | Total request count |
//! | `gateway_request_duration_seconds` | Histogram | `route` | Request latency |
//! | `gateway_active_requests` | Gauge | - | Requests currently in the filter chain |
//! | `gateway_cache_hits_total` | Counter | `route` | Responses served from cache |
//! | `gateway_cache_misses_total` | Counter | `route` | Cacheable lookups that missed |
//!
//! # Example
//!
//! ```rust,ignore
//! use palisade_telemetry::{init_logging, init_metrics, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! init_metrics()?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
