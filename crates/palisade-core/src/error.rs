//! Error types for Palisade.
//!
//! [`GatewayError`] is the error type that crosses crate boundaries inside the
//! gateway. Every variant maps to exactly one HTTP status and to a fixed,
//! client-safe message; the detail carried by the variant is for logs only.
//!
//! | Variant | Status | Client message |
//! |---|---|---|
//! | `Authentication` | 401 | reason chosen by the filter |
//! | `RateLimited` | 429 | "Too many requests. Please try again later." |
//! | `UpstreamTimeout` | 504 | "Service request timed out. Please try again later." |
//! | `UpstreamUnavailable` | 503 | "Service is currently unavailable. Please try again later." |
//! | `ServiceUnavailable` | 503 | "<Service> service is currently unavailable. Please try again later." |
//! | `NotFound` | 404 | "No route matches the request path." |
//! | `BadRequest` | 400 | message as given |
//! | `Internal` | 500 | "An unexpected error occurred. Please try again later." |

use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Categories of errors for classification, metrics labels and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing, malformed, expired or rejected credentials.
    Authentication,
    /// Caller exceeded its request quota.
    RateLimited,
    /// Backend did not answer in time.
    Timeout,
    /// Backend unreachable or protected by an open circuit.
    Unavailable,
    /// No route matched.
    NotFound,
    /// Malformed client input on an operational endpoint.
    Validation,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the category name used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

/// Standard error type for the gateway.
///
/// # Example
///
/// ```
/// use palisade_core::GatewayError;
/// use http::StatusCode;
///
/// let err = GatewayError::upstream_timeout("product-service did not answer within 4s");
/// assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
/// assert_eq!(
///     err.client_message(),
///     "Service request timed out. Please try again later."
/// );
/// ```
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Credential missing, malformed or rejected.
    #[error("Authentication failed: {reason}")]
    Authentication {
        /// Short reason safe to show to the caller.
        reason: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds until a token becomes available.
        retry_after_seconds: u64,
    },

    /// Backend call timed out.
    #[error("Upstream timeout: {message}")]
    UpstreamTimeout {
        /// Detail for logs.
        message: String,
    },

    /// Backend connection failed.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Detail for logs.
        message: String,
    },

    /// Backend protected by an open circuit.
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        /// Route id of the protected backend.
        service: String,
    },

    /// No route matched the request path.
    #[error("No route for path: {path}")]
    NotFound {
        /// The unmatched path.
        path: String,
    },

    /// Invalid client input.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Message returned to the caller.
        message: String,
    },

    /// Unhandled internal fault.
    #[error("Internal error: {message}")]
    Internal {
        /// Detail for logs, never sent to the caller.
        message: String,
    },
}

impl GatewayError {
    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub const fn rate_limited(retry_after_seconds: u64) -> Self {
        Self::RateLimited {
            retry_after_seconds,
        }
    }

    /// Creates an upstream timeout error.
    #[must_use]
    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        Self::UpstreamTimeout {
            message: message.into(),
        }
    }

    /// Creates an upstream connection error.
    #[must_use]
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Creates an open-circuit error for a backend service.
    #[must_use]
    pub fn service_unavailable(service: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::UpstreamTimeout { .. } => ErrorCategory::Timeout,
            Self::UpstreamUnavailable { .. } | Self::ServiceUnavailable { .. } => {
                ErrorCategory::Unavailable
            }
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::BadRequest { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns true if the failure happened while talking to a backend.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout { .. } | Self::UpstreamUnavailable { .. }
        )
    }

    /// Returns the message that may be shown to the caller.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Authentication { reason } => reason.clone(),
            Self::RateLimited { .. } => "Too many requests. Please try again later.".to_string(),
            Self::UpstreamTimeout { .. } => {
                "Service request timed out. Please try again later.".to_string()
            }
            Self::UpstreamUnavailable { .. } => {
                "Service is currently unavailable. Please try again later.".to_string()
            }
            Self::ServiceUnavailable { service } => format!(
                "{} service is currently unavailable. Please try again later.",
                service_display_name(service)
            ),
            Self::NotFound { .. } => "No route matches the request path.".to_string(),
            Self::BadRequest { message } => message.clone(),
            Self::Internal { .. } => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    /// Converts this error to the structured body written to the caller.
    #[must_use]
    pub fn to_body(&self, path: &str) -> ErrorBody {
        ErrorBody::new(self.status_code(), self.client_message(), path)
    }
}

/// Turns a route id such as `user-service` into `User`.
///
/// The first dash-separated segment is capitalized; an empty id yields `Unknown`.
#[must_use]
pub fn service_display_name(service_id: &str) -> String {
    let first = service_id.split('-').next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => "Unknown".to_string(),
    }
}

/// JSON body written on every terminal error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// RFC 3339 timestamp of the failure.
    pub timestamp: String,
    /// Numeric HTTP status.
    pub status: u16,
    /// Canonical reason phrase of the status.
    pub error: String,
    /// Client-safe message.
    pub message: String,
    /// Request path that failed.
    pub path: String,
}

impl ErrorBody {
    /// Creates an error body stamped with the current time.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
            path: path.into(),
        }
    }

    /// Serializes the body to a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
