//! OAuth2 opaque token authentication via introspection.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, Next};
use crate::filters::{bearer_token, insert_str};
use crate::types::{Request, Response, ResponseExt};
use http::HeaderValue;
use palisade_auth::IntrospectionClient;
use palisade_core::{headers, GatewayError, Identity};
use std::sync::Arc;
use tracing::{debug, warn};

/// Message returned when the header is absent or not a bearer credential.
pub const MISSING_HEADER: &str = "Missing or invalid Authorization header";

/// Message returned when the authority reports the token inactive or expired.
pub const INVALID_TOKEN: &str = "Invalid or expired OAuth2 token";

/// Message returned when the authority could not be reached or answered badly.
pub const VALIDATION_FAILED: &str = "Token validation failed";

/// Route filter validating bearer tokens against the introspection endpoint.
///
/// Exactly one introspection call per request, no caching.
#[derive(Debug, Clone)]
pub struct OAuth2Filter {
    client: Arc<IntrospectionClient>,
}

impl OAuth2Filter {
    /// Creates the filter.
    pub fn new(client: Arc<IntrospectionClient>) -> Self {
        Self { client }
    }
}

impl Filter for OAuth2Filter {
    fn name(&self) -> &'static str {
        "oauth2"
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
                    "Missing or invalid Authorization header for OAuth2"
                );
                return Response::gateway_error(
                    &GatewayError::authentication(MISSING_HEADER),
                    exchange.path(),
                );
            };

            let result = match self.client.validate(token).await {
                Ok(result) => result,
                Err(e) => {
                    let message = if e.is_transport() {
                        VALIDATION_FAILED
                    } else {
                        INVALID_TOKEN
                    };
                    warn!(
                        correlation_id = %exchange.correlation_id(),
                        path = exchange.path(),
                        reason = %e,
                        "OAuth2 token rejected"
                    );
                    return Response::gateway_error(
                        &GatewayError::authentication(message),
                        exchange.path(),
                    );
                }
            };

            let subject = result.subject.unwrap_or_default();
            let client_id = result.client_id.unwrap_or_default();
            let scope = result.scope.unwrap_or_default();

            let outbound = request.headers_mut();
            insert_str(outbound, &headers::OAUTH2_SUBJECT, &subject);
            insert_str(outbound, &headers::OAUTH2_CLIENT_ID, &client_id);
            insert_str(outbound, &headers::OAUTH2_SCOPE, &scope);
            outbound.insert(headers::AUTH_TYPE.clone(), HeaderValue::from_static("oauth2"));

            let identity = Identity::OAuth2 {
                subject,
                client_id,
                scope,
            };
            debug!(
                correlation_id = %exchange.correlation_id(),
                caller = %identity.log_id(),
                "OAuth2 token accepted"
            );
            exchange.set_identity(identity);

            next.run(exchange, request).await
        })
    }
}
