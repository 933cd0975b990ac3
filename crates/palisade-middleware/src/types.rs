//! Common types used throughout the filter chain.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use palisade_core::{ErrorBody, GatewayError};
use serde::Serialize;

/// The HTTP request type used in the filter chain.
///
/// Bodies are fully buffered before the chain runs.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the filter chain.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building gateway responses.
///
/// None of these constructors can fail.
pub trait ResponseExt {
    /// Creates a response with the given status, content type and body.
    fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response;

    /// Creates a JSON response from a serializable value.
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Response;

    /// Creates the structured JSON error response for a gateway error.
    fn gateway_error(error: &GatewayError, path: &str) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self::with_body(status, "application/json", Bytes::from(body))
    }

    fn gateway_error(error: &GatewayError, path: &str) -> Response {
        let body: ErrorBody = error.to_body(path);
        let mut response = Self::json(error.status_code(), &body);
        if let GatewayError::RateLimited {
            retry_after_seconds,
        } = error
        {
            response
                .headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(*retry_after_seconds));
        }
        response
    }
}

/// Creates an empty request for the given path, mainly for tests.
pub fn empty_request(method: http::Method, uri: &str) -> Request {
    let mut request = http::Request::new(Full::new(Bytes::new()));
    *request.method_mut() = method;
    if let Ok(uri) = uri.parse() {
        *request.uri_mut() = uri;
    }
    request
}
