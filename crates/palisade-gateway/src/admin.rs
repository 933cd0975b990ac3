//! Operational endpoints served ahead of routing.
//!
//! | endpoint | response |
//! |----------|----------|
//! | `GET /actuator/health` | status, service, version, uptime, backend health |
//! | `GET /actuator/cache/stats` | cache statistics |
//! | `DELETE /actuator/cache` | clears the cache |
//! | `DELETE /actuator/cache/entries?pattern=<regex>` | evicts matching keys |
//! | `GET /actuator/prometheus` | Prometheus text format |
//! | `GET, POST /fallback/<service-id>` | fallback payload |
//! | `GET /swagger-resources` | documented services |
//! | `GET /v3/api-docs/aggregated` | merged OpenAPI document |
//! | `GET /v3/api-docs/<service-id>` | one backend's OpenAPI document |
//!
//! The documentation endpoints are served only while `api_docs.enabled` is set.

use bytes::Bytes;
use http::{Method, StatusCode};
use palisade_core::{ErrorBody, GatewayError};
use palisade_middleware::filters::harden_response_headers;
use palisade_middleware::{Request, Response, ResponseExt};
use serde_json::json;
use tracing::info;

use crate::api_docs;
use crate::fallback::fallback_response;
use crate::health::{check_backends, HealthStatus};
use crate::server::Gateway;

const FALLBACK_PREFIX: &str = "/fallback/";
const API_DOCS_PREFIX: &str = "/v3/api-docs/";

/// Answers an operational request, or returns `None` so routing proceeds.
pub async fn handle(gateway: &Gateway, request: &Request) -> Option<Response> {
    let method = request.method();
    let path = request.uri().path();

    let mut response = match (method, path) {
        (&Method::GET, "/actuator/health") => health(gateway).await,
        (&Method::GET, "/actuator/cache/stats") => {
            Response::json(StatusCode::OK, &gateway.services().cache.stats())
        }
        (&Method::DELETE, "/actuator/cache") => {
            let cleared = gateway.services().cache.clear();
            info!(cleared, "Cache cleared");
            Response::json(StatusCode::OK, &json!({ "cleared": cleared }))
        }
        (&Method::DELETE, "/actuator/cache/entries") => evict_entries(gateway, request),
        (&Method::GET, "/actuator/prometheus") => prometheus(path),
        (&Method::GET | &Method::POST, _) if path.starts_with(FALLBACK_PREFIX) => {
            let service = &path[FALLBACK_PREFIX.len()..];
            if service.is_empty() || service.contains('/') {
                return None;
            }
            fallback_response(service)
        }
        (&Method::GET, _) if gateway.api_docs().enabled => api_docs(gateway, path).await?,
        _ => return None,
    };

    harden_response_headers(response.headers_mut());
    Some(response)
}

async fn health(gateway: &Gateway) -> Response {
    let breakers = gateway.routes().iter().filter_map(|route| {
        route
            .breaker
            .as_ref()
            .map(|breaker| (route.id.clone(), breaker.state()))
    });
    let mut report = gateway.health().report(breakers);
    if gateway.health_config().check_backends {
        let services =
            check_backends(gateway.dispatcher(), gateway.routes(), gateway.health_config()).await;
        report = report.with_services(services);
    }
    let status = match report.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    Response::json(status, &report)
}

async fn api_docs(gateway: &Gateway, path: &str) -> Option<Response> {
    let config = gateway.api_docs();
    if path == "/swagger-resources" {
        return Some(Response::json(StatusCode::OK, &api_docs::resources(config)));
    }

    let service_id = path.strip_prefix(API_DOCS_PREFIX)?;
    if service_id.is_empty() || service_id.contains('/') {
        return None;
    }
    if service_id == "aggregated" {
        let merged = api_docs::aggregate(gateway.dispatcher(), gateway.routes(), config).await;
        return Some(Response::json(StatusCode::OK, &merged));
    }

    let response =
        match api_docs::fetch_document(gateway.dispatcher(), gateway.routes(), config, service_id)
            .await
        {
            Some(document) => Response::json(StatusCode::OK, &document),
            None => Response::json(
                StatusCode::NOT_FOUND,
                &ErrorBody::new(
                    StatusCode::NOT_FOUND,
                    format!("API docs not available for service: {service_id}"),
                    path,
                ),
            ),
        };
    Some(response)
}

fn evict_entries(gateway: &Gateway, request: &Request) -> Response {
    let path = request.uri().path();
    let Some(pattern) = query_param(request, "pattern") else {
        return Response::gateway_error(
            &GatewayError::bad_request("Query parameter 'pattern' is required"),
            path,
        );
    };

    match gateway.services().cache.evict_by_pattern(&pattern) {
        Ok(evicted) => {
            info!(pattern = %pattern, evicted, "Cache entries evicted");
            Response::json(StatusCode::OK, &json!({ "evicted": evicted }))
        }
        Err(e) => Response::gateway_error(
            &GatewayError::bad_request(format!("Invalid pattern: {e}")),
            path,
        ),
    }
}

fn prometheus(path: &str) -> Response {
    match palisade_telemetry::render_metrics() {
        Some(text) => Response::with_body(
            StatusCode::OK,
            "text/plain; version=0.0.4",
            Bytes::from(text),
        ),
        None => Response::json(
            StatusCode::SERVICE_UNAVAILABLE,
            &ErrorBody::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Metrics recorder is not installed",
                path,
            ),
        ),
    }
}

/// Decodes a query parameter.
fn query_param(request: &Request, name: &str) -> Option<String> {
    let query = request.uri().query()?;
    let url = reqwest::Url::parse(&format!("http://localhost/?{query}")).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_middleware::empty_request;

    #[test]
    fn test_query_param_decodes() {
        let request = empty_request(Method::DELETE, "/actuator/cache/entries?pattern=GET%7C%2Fapi%2F.*&x=1");
        assert_eq!(
            query_param(&request, "pattern").as_deref(),
            Some("GET|/api/.*")
        );
        assert_eq!(query_param(&request, "x").as_deref(), Some("1"));
        assert!(query_param(&request, "missing").is_none());

        let request = empty_request(Method::DELETE, "/actuator/cache/entries");
        assert!(query_param(&request, "pattern").is_none());
    }
}
