//! Gateway health reporting.
//!
//! The gateway's own status reflects whether it is serving. Backend checks
//! add a per-service section without changing that status.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use palisade_config::HealthConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitState;
use crate::proxy::Dispatcher;
use crate::routes::{Route, RouteTable};

/// Overall gateway status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// Accepting traffic.
    Up,
    /// Draining or stopped.
    Down,
}

/// Body of `GET /actuator/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service name.
    pub service: String,
    /// Gateway version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Breaker state per route, for routes that have one.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub circuit_breakers: BTreeMap<String, CircuitState>,
    /// Check result per route backend.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthResponse {
    /// Attaches backend check results.
    #[must_use]
    pub fn with_services(mut self, services: BTreeMap<String, ServiceHealth>) -> Self {
        self.services = services;
        self
    }
}

/// Health of one backend as seen by a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    /// `UP` only when the backend itself reported `UP`.
    pub status: HealthStatus,
    /// Checked backend base URL.
    pub url: String,
    /// Status string the backend reported, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported: Option<String>,
    /// Why the backend counts as down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    fn down(url: &str, reported: Option<String>, error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            url: url.to_string(),
            reported,
            error: Some(error.into()),
        }
    }
}

/// Checks one backend's health endpoint.
pub async fn check_backend(
    dispatcher: &Dispatcher,
    route: &Route,
    config: &HealthConfig,
) -> ServiceHealth {
    debug!(route = %route.id, "Checking backend health");
    let reply = match dispatcher
        .fetch_json(route, &config.check_path, config.check_timeout)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(route = %route.id, error = %e, "Backend health check failed");
            return ServiceHealth::down(&route.uri, None, e.to_string());
        }
    };

    let reported = reply
        .body
        .as_ref()
        .and_then(|body| body.get("status"))
        .and_then(|status| status.as_str())
        .map(str::to_string);

    match reported {
        Some(status) if status.eq_ignore_ascii_case("UP") => ServiceHealth {
            status: HealthStatus::Up,
            url: route.uri.clone(),
            reported: Some(status),
            error: None,
        },
        reported => {
            warn!(
                route = %route.id,
                http_status = reply.status.as_u16(),
                reported = reported.as_deref().unwrap_or("UNKNOWN"),
                "Backend reported unhealthy"
            );
            ServiceHealth::down(
                &route.uri,
                reported,
                "Service is not responding or reported DOWN status",
            )
        }
    }
}

/// Checks every route backend concurrently.
pub async fn check_backends(
    dispatcher: &Dispatcher,
    routes: &RouteTable,
    config: &HealthConfig,
) -> BTreeMap<String, ServiceHealth> {
    let checks = routes.iter().map(|route| async move {
        (route.id.clone(), check_backend(dispatcher, route, config).await)
    });
    join_all(checks).await.into_iter().collect()
}

/// Tracks uptime and whether the gateway is serving.
#[derive(Debug)]
pub struct HealthChecker {
    start_time: Instant,
    service: String,
    up: AtomicBool,
}

impl HealthChecker {
    /// Creates a checker that reports `UP`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            service: service.into(),
            up: AtomicBool::new(true),
        }
    }

    /// Marks the gateway as draining.
    pub fn set_down(&self) {
        self.up.store(false, Ordering::SeqCst);
    }

    /// Returns true while the gateway is serving.
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    /// Time since the checker was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Builds the health report.
    pub fn report<I>(&self, breakers: I) -> HealthResponse
    where
        I: IntoIterator<Item = (String, CircuitState)>,
    {
        HealthResponse {
            status: if self.is_up() {
                HealthStatus::Up
            } else {
                HealthStatus::Down
            },
            service: self.service.clone(),
            version: crate::VERSION.to_string(),
            uptime_seconds: self.uptime().as_secs(),
            circuit_breakers: breakers.into_iter().collect(),
            services: BTreeMap::new(),
        }
    }
}
