//! The top-level [`GatewayConfig`] and its builder.

use std::collections::HashSet;

use palisade_auth::{JwtConfig, OAuth2Config};
use palisade_cache::CacheConfig;
use palisade_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::schema::{
    default_routes, ApiDocsConfig, HealthConfig, RateLimitConfig, RequestHeadersConfig,
    RouteDefinition, ServerConfig,
};
use crate::{ConfigError, ConfigResult};

/// Complete gateway configuration.
///
/// Every section falls back to its defaults when absent. A file without a
/// `routes` list gets the built-in route table.
///
/// # Example
///
/// ```
/// use palisade_config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.server.listen_port, 8080);
/// assert_eq!(config.routes.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LogConfig,
    /// Response cache settings.
    pub cache: CacheConfig,
    /// Local token verification settings.
    pub jwt: JwtConfig,
    /// Token introspection settings.
    pub oauth2: OAuth2Config,
    /// Rate limiting settings.
    pub rate_limit: RateLimitConfig,
    /// Request header hygiene settings.
    pub request_headers: RequestHeadersConfig,
    /// Backend health check settings.
    pub health: HealthConfig,
    /// OpenAPI aggregation settings.
    pub api_docs: ApiDocsConfig,
    /// Route table, in declaration order.
    pub routes: Vec<RouteDefinition>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LogConfig::default(),
            cache: CacheConfig::default(),
            jwt: JwtConfig::default(),
            oauth2: OAuth2Config::default(),
            rate_limit: RateLimitConfig::default(),
            request_headers: RequestHeadersConfig::default(),
            health: HealthConfig::default(),
            api_docs: ApiDocsConfig::default(),
            routes: default_routes(),
        }
    }
}

impl GatewayConfig {
    /// Creates a new configuration builder.
    ///
    /// ```
    /// use palisade_config::{GatewayConfig, RouteDefinition};
    ///
    /// let config = GatewayConfig::builder()
    ///     .listen_port(9000)
    ///     .route(RouteDefinition::new("echo", "/echo/**", "http://127.0.0.1:7000"))
    ///     .build();
    ///
    /// assert_eq!(config.server.listen_port, 9000);
    /// assert_eq!(config.routes.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Checks the configuration for consistency.
    ///
    /// Filter names are checked separately by
    /// [`validate_filter_names`](Self::validate_filter_names), since the set
    /// of known filters belongs to the gateway.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.socket_addr()?;

        if self.cache.enabled && self.cache.max_size == 0 {
            return Err(ConfigError::invalid_value(
                "cache.max_size",
                "must be positive when the cache is enabled",
            ));
        }

        if self.health.check_backends && self.health.check_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "health.check_timeout",
                "must be positive when backend checks are enabled",
            ));
        }
        if self.api_docs.enabled && self.api_docs.fetch_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "api_docs.fetch_timeout",
                "must be positive when API docs are enabled",
            ));
        }

        let mut seen = HashSet::new();
        for (index, route) in self.routes.iter().enumerate() {
            if route.id.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}].id"),
                    "must not be empty",
                ));
            }
            if !seen.insert(route.id.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "duplicate route id: {}",
                    route.id
                )));
            }
            if !route.uri.starts_with("http://") && !route.uri.starts_with("https://") {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}].uri"),
                    format!("must start with http:// or https://, got {}", route.uri),
                ));
            }
            if !route.path.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}].path"),
                    "must start with /",
                ));
            }
            if route.timeout.is_zero() {
                return Err(ConfigError::invalid_value(
                    format!("routes[{index}].timeout"),
                    "must be positive",
                ));
            }
            if route.uses_filter("jwt_auth") && !self.jwt.has_secret() {
                return Err(ConfigError::validation_error(format!(
                    "route {} uses jwt_auth but jwt.secret is empty",
                    route.id
                )));
            }
        }

        Ok(())
    }

    /// Checks every route filter against the known filter names.
    pub fn validate_filter_names<'a, I>(&self, known: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: HashSet<&str> = known.into_iter().collect();
        for route in &self.routes {
            if let Some(unknown) = route.filters.iter().find(|f| !known.contains(f.name.as_str())) {
                return Err(ConfigError::validation_error(format!(
                    "route {} uses unknown filter {}",
                    route.id, unknown.name
                )));
            }
        }
        Ok(())
    }

    /// Looks up a route by id.
    pub fn route(&self, id: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| r.id == id)
    }
}

/// Builder for [`GatewayConfig`].
///
/// Starts from the defaults with an empty route table.
#[derive(Debug, Clone)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl Default for GatewayConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfigBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: GatewayConfig {
                routes: Vec::new(),
                ..GatewayConfig::default()
            },
        }
    }

    /// Sets the listener section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Sets the listen port.
    #[must_use]
    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.server.listen_port = port;
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Sets the cache section.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Sets the token signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt.secret = secret.into();
        self
    }

    /// Sets the introspection section.
    #[must_use]
    pub fn oauth2(mut self, oauth2: OAuth2Config) -> Self {
        self.config.oauth2 = oauth2;
        self
    }

    /// Sets the rate limit section.
    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Sets the request header section.
    #[must_use]
    pub fn request_headers(mut self, request_headers: RequestHeadersConfig) -> Self {
        self.config.request_headers = request_headers;
        self
    }

    /// Sets the backend health check section.
    #[must_use]
    pub fn health(mut self, health: HealthConfig) -> Self {
        self.config.health = health;
        self
    }

    /// Sets the OpenAPI aggregation section.
    #[must_use]
    pub fn api_docs(mut self, api_docs: ApiDocsConfig) -> Self {
        self.config.api_docs = api_docs;
        self
    }

    /// Appends a route.
    #[must_use]
    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.config.routes.push(route);
        self
    }

    /// Replaces the route table.
    #[must_use]
    pub fn routes(mut self, routes: Vec<RouteDefinition>) -> Self {
        self.config.routes = routes;
        self
    }

    /// Builds the configuration without validating it.
    #[must_use]
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FilterSpec;
    use std::time::Duration;

    fn route(id: &str) -> RouteDefinition {
        RouteDefinition::new(id, format!("/{id}/**"), "http://localhost:9999")
    }

    #[test]
    fn test_default_needs_secret() {
        let config = GatewayConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let config = GatewayConfig {
            jwt: JwtConfig::new("secret"),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_route_ids() {
        let config = GatewayConfig::builder().route(route("a")).route(route("a")).build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate route id: a"));
    }

    #[test]
    fn test_empty_route_id() {
        let config = GatewayConfig::builder().route(route(" ")).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_backend_uri() {
        let config = GatewayConfig::builder()
            .route(RouteDefinition::new("a", "/a/**", "lb://a"))
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("routes[0].uri"));
    }

    #[test]
    fn test_zero_cache_size() {
        let config = GatewayConfig::builder()
            .cache(CacheConfig::default().with_max_size(0))
            .build();
        assert!(config.validate().is_err());

        let config = GatewayConfig::builder()
            .cache(CacheConfig {
                max_size: 0,
                ..CacheConfig::disabled()
            })
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_route_timeout() {
        let config = GatewayConfig::builder()
            .route(route("a").with_timeout(Duration::ZERO))
            .build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("routes[0].timeout"));

        let config = GatewayConfig::builder()
            .route(route("a").with_timeout(Duration::from_millis(1)))
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_check_timeout() {
        let health = HealthConfig {
            check_timeout: Duration::ZERO,
            ..HealthConfig::default()
        };
        let config = GatewayConfig::builder().health(health.clone()).build();
        assert!(config.validate().unwrap_err().to_string().contains("health.check_timeout"));

        let config = GatewayConfig::builder()
            .health(HealthConfig {
                check_backends: false,
                ..health
            })
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_filter_name() {
        let config = GatewayConfig::builder()
            .route(route("a").with_filter(FilterSpec::new("gzip")))
            .build();
        let err = config
            .validate_filter_names(["jwt_auth", "response_cache"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown filter gzip"));

        assert!(config.validate_filter_names(["gzip"]).is_ok());
    }

    #[test]
    fn test_builder_starts_without_routes() {
        let config = GatewayConfig::builder().jwt_secret("s").build();
        assert!(config.routes.is_empty());
        assert!(config.jwt.has_secret());
        assert!(config.route("user-service").is_none());
    }
}
