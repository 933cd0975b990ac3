//! Error types for building and running the gateway.
//!
//! Request-time failures never surface here; they become
//! [`GatewayError`](palisade_core::GatewayError) responses inside the chain.

use std::net::SocketAddr;

use palisade_auth::AuthError;
use palisade_config::ConfigError;
use palisade_telemetry::TelemetryError;
use thiserror::Error;

/// Gateway startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A route references a filter that is not registered.
    #[error("Route {route} uses unknown filter {filter}")]
    UnknownFilter {
        /// Route id.
        route: String,
        /// Filter name.
        filter: String,
    },

    /// Filter arguments did not match the filter's schema.
    #[error("Invalid arguments for filter {filter} on route {route}: {reason}")]
    FilterArgs {
        /// Route id.
        route: String,
        /// Filter name.
        filter: String,
        /// Deserialization error.
        reason: String,
    },

    /// Credential services could not be created.
    #[error("Authentication setup error: {0}")]
    Auth(#[from] AuthError),

    /// Logging or metrics could not be installed.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// The HTTP client for backends could not be created.
    #[error("Dispatcher error: {0}")]
    Dispatcher(String),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that failed.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Create an unknown filter error.
    pub fn unknown_filter(route: impl Into<String>, filter: impl Into<String>) -> Self {
        Self::UnknownFilter {
            route: route.into(),
            filter: filter.into(),
        }
    }

    /// Create a filter argument error.
    pub fn filter_args(
        route: impl Into<String>,
        filter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FilterArgs {
            route: route.into(),
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for gateway setup.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_filter_display() {
        let err = ServerError::unknown_filter("user-service", "gzip");
        assert_eq!(err.to_string(), "Route user-service uses unknown filter gzip");
    }

    #[test]
    fn test_filter_args_display() {
        let err = ServerError::filter_args("p", "strip_prefix", "missing field `parts`");
        assert!(err.to_string().contains("strip_prefix"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_from_config_error() {
        let err: ServerError = ConfigError::validation_error("bad").into();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
