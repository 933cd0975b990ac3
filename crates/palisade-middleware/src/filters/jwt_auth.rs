//! Local JWT authentication.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, Next};
use crate::filters::{bearer_token, insert_str};
use crate::types::{Request, Response, ResponseExt};
use palisade_auth::TokenVerifier;
use palisade_core::{headers, GatewayError, Identity};
use std::sync::Arc;
use tracing::{debug, warn};

/// Message returned when the header is absent or not a bearer credential.
pub const MISSING_HEADER: &str = "Missing or invalid Authorization header";

/// Message returned when the token fails verification.
pub const INVALID_TOKEN: &str = "Invalid or expired JWT token";

/// Route filter verifying `Authorization: Bearer <jwt>` locally.
///
/// On success the outbound request carries `X-Auth-User`, `X-Auth-UserId`
/// and `X-Auth-Roles`. Any failure short-circuits with 401.
#[derive(Debug, Clone)]
pub struct JwtAuthFilter {
    verifier: Arc<TokenVerifier>,
}

impl JwtAuthFilter {
    /// Creates the filter.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl Filter for JwtAuthFilter {
    fn name(&self) -> &'static str {
        "jwt_auth"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(token) = bearer_token(request.headers()) else {
                warn!(
                    correlation_id = %exchange.correlation_id(),
                    path = exchange.path(),
                    "Missing or invalid Authorization header"
                );
                return Response::gateway_error(
                    &GatewayError::authentication(MISSING_HEADER),
                    exchange.path(),
                );
            };

            let claims = match self.verifier.verify(token) {
                Ok(claims) => claims,
                Err(e) => {
                    warn!(
                        correlation_id = %exchange.correlation_id(),
                        path = exchange.path(),
                        reason = %e,
                        "JWT validation failed"
                    );
                    return Response::gateway_error(
                        &GatewayError::authentication(INVALID_TOKEN),
                        exchange.path(),
                    );
                }
            };

            let outbound = request.headers_mut();
            insert_str(outbound, &headers::AUTH_USER, claims.subject());
            insert_str(outbound, &headers::AUTH_USER_ID, claims.user_id());
            insert_str(outbound, &headers::AUTH_ROLES, &claims.roles_header());

            let identity = Identity::Jwt {
                subject: claims.subject().to_string(),
                user_id: claims.user_id().to_string(),
                roles: claims.roles,
            };
            debug!(
                correlation_id = %exchange.correlation_id(),
                user = %identity.log_id(),
                "JWT validated"
            );
            exchange.set_identity(identity);

            next.run(exchange, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::empty_request;
    use bytes::Bytes;
    use http::header::AUTHORIZATION;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use http_body_util::BodyExt;
    use palisade_auth::TokenClaims;
    use parking_lot::Mutex;
    use std::time::Duration;

    const SECRET: &str = "palisade-test-secret-key-that-is-long-enough-for-hs256";

    fn filter() -> JwtAuthFilter {
        JwtAuthFilter::new(Arc::new(TokenVerifier::new(SECRET)))
    }

    async fn run(filter: &JwtAuthFilter, request: Request) -> (Response, Option<HeaderMap>, Exchange) {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let next = Next::dispatch(move |_exchange, request: Request| {
            *sink.lock() = Some(request.headers().clone());
            Box::pin(async { Response::with_body(StatusCode::OK, "text/plain", Bytes::new()) })
        });

        let mut exchange = Exchange::new(Method::GET, "/api/users/1");
        let response = filter.process(&mut exchange, request, next).await;
        let forwarded = seen.lock().take();
        (response, forwarded, exchange)
    }

    fn with_auth(value: &str) -> Request {
        let mut request = empty_request(Method::GET, "/api/users/1");
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        request
    }

    #[tokio::test]
    async fn test_valid_token_injects_identity_headers() {
        let token = TokenVerifier::new(SECRET)
            .sign(
                &TokenClaims::new("alice", Duration::from_secs(600))
                    .with_user_id("user-456")
                    .with_roles(["ROLE_USER", "ROLE_ADMIN"]),
            )
            .unwrap();

        let (response, forwarded, exchange) =
            run(&filter(), with_auth(&format!("Bearer {token}"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let forwarded = forwarded.unwrap();
        assert_eq!(forwarded.get(&headers::AUTH_USER).unwrap(), "alice");
        assert_eq!(forwarded.get(&headers::AUTH_USER_ID).unwrap(), "user-456");
        assert_eq!(
            forwarded.get(&headers::AUTH_ROLES).unwrap(),
            "ROLE_USER,ROLE_ADMIN"
        );
        assert_eq!(exchange.identity().log_id(), "user:user-456");
    }

    #[tokio::test]
    async fn test_missing_header_short_circuits() {
        let (response, forwarded, exchange) =
            run(&filter(), empty_request(Method::GET, "/api/users/1")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(forwarded.is_none());
        assert!(!exchange.identity().is_authenticated());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], MISSING_HEADER);
        assert_eq!(body["path"], "/api/users/1");
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_short_circuits() {
        let (response, forwarded, _) = run(&filter(), with_auth("Basic dXNlcjpwYXNz")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(forwarded.is_none());
    }

    #[tokio::test]
    async fn test_bad_token_hides_verifier_detail() {
        let (response, forwarded, _) = run(&filter(), with_auth("Bearer abc.def.ghi")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(forwarded.is_none());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], INVALID_TOKEN);
    }
}
