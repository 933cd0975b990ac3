//! Typed configuration for the Palisade gateway.
//!
//! # Overview
//!
//! [`GatewayConfig`] aggregates every section:
//!
//! - [`ServerConfig`] - listener address, port and shutdown grace
//! - [`LogConfig`](palisade_telemetry::LogConfig) - log level and format
//! - [`CacheConfig`](palisade_cache::CacheConfig) - response cache limits and TTLs
//! - [`JwtConfig`](palisade_auth::JwtConfig) and
//!   [`OAuth2Config`](palisade_auth::OAuth2Config) - credential validation
//! - [`RateLimitConfig`] and [`RequestHeadersConfig`]
//! - [`HealthConfig`] - backend checks behind the health endpoint
//! - [`ApiDocsConfig`] - OpenAPI document aggregation
//! - [`RouteDefinition`] list
//!
//! # Example
//!
//! ```no_run
//! use palisade_config::GatewayConfig;
//!
//! # fn main() -> Result<(), palisade_config::ConfigError> {
//! let config = GatewayConfig::load(Some("gateway.toml"))?;
//! config.validate()?;
//!
//! println!("Listening on {}", config.server.socket_addr()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0"
//! listen_port = 8080
//! shutdown_grace = "30s"
//!
//! [cache]
//! default_ttl_seconds = 60
//! max_size = 1000
//! route_ttl = { product-service = 120 }
//!
//! [jwt]
//! secret = "change-me"
//!
//! [[routes]]
//! id = "product-service"
//! path = "/api/products/**"
//! uri = "http://localhost:8082"
//! filters = [{ name = "jwt_auth" }, { name = "response_cache", args = { ttl_seconds = 120 } }]
//! ```
//!
//! # Environment Variable Overrides
//!
//! `PALISADE_LISTEN_ADDR`, `PALISADE_LISTEN_PORT`, `PALISADE_LOG_LEVEL`,
//! `PALISADE_LOG_JSON`, `PALISADE_JWT_SECRET`, `PALISADE_CACHE_ENABLED`,
//! `PALISADE_CACHE_DEFAULT_TTL`, `PALISADE_CACHE_MAX_SIZE`,
//! `PALISADE_OAUTH2_INTROSPECTION_URI`, `PALISADE_OAUTH2_CLIENT_ID`,
//! `PALISADE_OAUTH2_CLIENT_SECRET`, `PALISADE_HEALTH_CHECK_BACKENDS` and
//! `PALISADE_API_DOCS_ENABLED`.

#![doc(html_root_url = "https://docs.rs/palisade-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
pub mod duration;
mod error;
mod loader;
mod schema;

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use error::{ConfigError, ConfigResult};
pub use loader::ENV_PREFIX;
pub use schema::{
    default_routes, ApiDocsConfig, ApiDocsService, CircuitBreakerSettings, FilterSpec,
    HealthConfig, RateLimitConfig, RequestHeadersConfig, RouteDefinition, ServerConfig,
};
