//! Fallback payload for unavailable services.

use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use palisade_core::service_display_name;
use palisade_middleware::{Response, ResponseExt};
use serde::{Deserialize, Serialize};

/// Body served when a route's backend is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackBody {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Always 503.
    pub status: u16,
    /// Always "Service Unavailable".
    pub error: String,
    /// Display name of the service, e.g. "User Service".
    pub service: String,
    /// Client-facing message.
    pub message: String,
}

impl FallbackBody {
    /// Builds the payload for a route id.
    pub fn for_service(service_id: &str) -> Self {
        let display = service_display_name(service_id);
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            error: "Service Unavailable".to_string(),
            service: format!("{display} Service"),
            message: format!("{display} service is currently unavailable. Please try again later."),
        }
    }
}

/// Builds the 503 fallback response for a route id.
pub fn fallback_response(service_id: &str) -> Response {
    tracing::warn!(service = service_id, "Service unavailable, returning fallback response");
    Response::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &FallbackBody::for_service(service_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_payload() {
        let body = FallbackBody::for_service("order-service");
        assert_eq!(body.status, 503);
        assert_eq!(body.error, "Service Unavailable");
        assert_eq!(body.service, "Order Service");
        assert_eq!(
            body.message,
            "Order service is currently unavailable. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_response() {
        let response = fallback_response("user-service");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: FallbackBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.service, "User Service");
    }
}
