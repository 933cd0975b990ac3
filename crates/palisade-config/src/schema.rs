//! Configuration section types.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::serde_duration;
use crate::{ConfigError, ConfigResult};

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub listen_addr: String,
    /// Port to bind.
    pub listen_port: u16,
    /// How long in-flight connections may take to finish on shutdown.
    #[serde(with = "serde_duration")]
    pub shutdown_grace: Duration,
    /// Largest accepted request body.
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            shutdown_grace: Duration::from_secs(30),
            max_request_body_size: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Resolves the socket address to bind.
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self.listen_addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.listen_addr",
                format!("invalid IP address: {}", self.listen_addr),
            )
        })?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}

/// Token bucket parameters for the rate limit filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the filter is installed.
    pub enabled: bool,
    /// Tokens added per second.
    pub replenish_rate: u64,
    /// Bucket size.
    pub burst_capacity: u64,
    /// Most client keys tracked at once.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replenish_rate: 10,
            burst_capacity: 20,
            max_tracked_keys: 10_000,
        }
    }
}

/// Request header hygiene settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestHeadersConfig {
    /// Headers removed in addition to the reserved internal ones.
    pub additional_headers_to_remove: Vec<String>,
}

/// Circuit breaker parameters for one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Breaker name, used in logs.
    pub name: String,
    /// Failure percentage at or above which the breaker opens.
    pub failure_rate_threshold: u8,
    /// Number of recent calls considered.
    pub sliding_window_size: usize,
    /// Calls needed before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,
    /// How long the breaker stays open.
    #[serde(with = "serde_duration")]
    pub wait_duration_in_open_state: Duration,
    /// Trial calls admitted while half-open.
    pub permitted_calls_in_half_open_state: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            failure_rate_threshold: 50,
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_calls_in_half_open_state: 3,
        }
    }
}

impl CircuitBreakerSettings {
    /// Creates settings with default thresholds.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Backend health checks behind `GET /actuator/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Whether every route's backend is checked.
    pub check_backends: bool,
    /// Path requested on each backend.
    pub check_path: String,
    /// Upper bound for a single check.
    #[serde(with = "serde_duration")]
    pub check_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_backends: true,
            check_path: "/actuator/health".to_string(),
            check_timeout: Duration::from_secs(5),
        }
    }
}

/// A backend whose OpenAPI document is published through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDocsService {
    /// Id of the route serving this backend.
    pub service_id: String,
    /// Human readable name, e.g. `User Service`.
    pub display_name: String,
    /// Gateway path prefix of the service.
    pub base_path: String,
    /// OpenAPI version of the document.
    #[serde(default = "default_swagger_version")]
    pub swagger_version: String,
}

impl ApiDocsService {
    /// Creates an entry for an OpenAPI 3.0 document.
    pub fn new(
        service_id: impl Into<String>,
        display_name: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            display_name: display_name.into(),
            base_path: base_path.into(),
            swagger_version: default_swagger_version(),
        }
    }
}

fn default_swagger_version() -> String {
    "3.0".to_string()
}

/// OpenAPI document aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDocsConfig {
    /// Whether the documentation endpoints are served.
    pub enabled: bool,
    /// Path of the document on each backend.
    pub api_docs_path: String,
    /// Upper bound for fetching one backend document.
    #[serde(with = "serde_duration")]
    pub fetch_timeout: Duration,
    /// Published services, in listing order.
    pub services: Vec<ApiDocsService>,
}

impl Default for ApiDocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_docs_path: "/v3/api-docs".to_string(),
            fetch_timeout: Duration::from_secs(5),
            services: vec![
                ApiDocsService::new("user-service", "User Service", "/api/users"),
                ApiDocsService::new("product-service", "Product Service", "/api/products"),
                ApiDocsService::new("order-service", "Order Service", "/api/orders"),
                ApiDocsService::new("auth-service", "Auth Service", "/api/auth"),
            ],
        }
    }
}

/// A filter attached to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Registered filter name.
    pub name: String,
    /// Filter arguments; `null` when the filter takes none.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub args: serde_json::Value,
}

impl FilterSpec {
    /// Creates a spec without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: serde_json::Value::Null,
        }
    }

    /// Sets the arguments.
    #[must_use]
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }
}

fn default_route_timeout() -> Duration {
    Duration::from_secs(4)
}

/// A route from a path pattern to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Unique route id.
    pub id: String,
    /// Path pattern, `/prefix/**`.
    pub path: String,
    /// Backend base URL.
    pub uri: String,
    /// Route filters, in execution order.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// Optional circuit breaker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerSettings>,
    /// Bound on the whole backend exchange.
    #[serde(default = "default_route_timeout", with = "serde_duration")]
    pub timeout: Duration,
}

impl RouteDefinition {
    /// Creates a route with no filters and the default timeout.
    pub fn new(id: impl Into<String>, path: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            uri: uri.into(),
            filters: Vec::new(),
            circuit_breaker: None,
            timeout: default_route_timeout(),
        }
    }

    /// Appends a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the circuit breaker.
    #[must_use]
    pub fn with_circuit_breaker(mut self, settings: CircuitBreakerSettings) -> Self {
        self.circuit_breaker = Some(settings);
        self
    }

    /// Sets the backend timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path prefix matched by this route: the pattern without `/**`.
    ///
    /// ```
    /// use palisade_config::RouteDefinition;
    ///
    /// let route = RouteDefinition::new("users", "/api/users/**", "http://localhost:8081");
    /// assert_eq!(route.path_prefix(), "/api/users");
    /// ```
    pub fn path_prefix(&self) -> &str {
        let prefix = self.path.strip_suffix("/**").unwrap_or(&self.path);
        prefix.strip_suffix('/').unwrap_or(prefix)
    }

    /// Returns true if the route declares the named filter.
    pub fn uses_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name == name)
    }
}

/// Routes used when no configuration file provides any.
pub fn default_routes() -> Vec<RouteDefinition> {
    vec![
        RouteDefinition::new("auth-service", "/api/auth/**", "http://localhost:8084")
            .with_circuit_breaker(CircuitBreakerSettings::named("auth-service-cb")),
        RouteDefinition::new("user-service", "/api/users/**", "http://localhost:8081")
            .with_filter(FilterSpec::new("jwt_auth"))
            .with_circuit_breaker(CircuitBreakerSettings::named("user-service-cb")),
        RouteDefinition::new("product-service", "/api/products/**", "http://localhost:8082")
            .with_filter(FilterSpec::new("jwt_auth"))
            .with_filter(FilterSpec::new("response_cache"))
            .with_circuit_breaker(CircuitBreakerSettings::named("product-service-cb")),
        RouteDefinition::new("order-service", "/api/orders/**", "http://localhost:8083")
            .with_filter(FilterSpec::new("jwt_auth"))
            .with_circuit_breaker(CircuitBreakerSettings {
                failure_rate_threshold: 30,
                sliding_window_size: 20,
                wait_duration_in_open_state: Duration::from_secs(30),
                ..CircuitBreakerSettings::named("order-service-cb")
            })
            .with_timeout(Duration::from_secs(10)),
    ]
}
