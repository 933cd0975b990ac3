//! Backend dispatch over a pooled HTTP client.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HOST};
use http_body_util::{BodyExt, Full};
use palisade_core::headers::is_hop_by_hop;
use palisade_core::GatewayError;
use palisade_middleware::{Request, Response};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ServerError, ServerResult};
use crate::routes::Route;

/// Forwards requests to route backends.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
}

impl Dispatcher {
    /// Creates a dispatcher with a pooled client.
    ///
    /// Timeouts are applied per request from the route.
    pub fn new() -> ServerResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ServerError::Dispatcher(format!("failed to create client: {e}")))?;

        Ok(Self { client })
    }

    /// Sends the request to the route's backend and buffers the answer.
    ///
    /// Method, path, raw query and body are forwarded as they are after the
    /// chain's rewrites. Hop-by-hop headers and `Host` are dropped both ways.
    pub async fn dispatch(&self, route: &Route, request: Request) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let url = backend_url(&route.uri, &parts.uri);
        debug!(route = %route.id, method = %parts.method, url = %url, "Dispatching to backend");

        let response = self
            .client
            .request(parts.method, &url)
            .headers(forwardable(&parts.headers))
            .timeout(route.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| upstream_error(&route.id, &e))?;

        let status = response.status();
        let headers = forwardable(response.headers());
        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| upstream_error(&route.id, &e))?;

        let mut out = http::Response::new(Full::new(body));
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// A JSON answer from a backend side endpoint.
#[derive(Debug, Clone)]
pub struct JsonReply {
    /// Backend status code.
    pub status: http::StatusCode,
    /// Parsed body, `None` when it is not JSON.
    pub body: Option<serde_json::Value>,
}

impl Dispatcher {
    /// Fetches `path` from the route's backend and parses the body as JSON.
    ///
    /// Used for backend health checks and API documents, never for client traffic.
    /// Fails only when the backend cannot be reached within `timeout`.
    pub async fn fetch_json(
        &self,
        route: &Route,
        path: &str,
        timeout: Duration,
    ) -> Result<JsonReply, reqwest::Error> {
        let url = format!("{}{path}", route.uri);
        debug!(route = %route.id, url = %url, "Fetching backend document");

        let response = self.client.get(&url).timeout(timeout).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        Ok(JsonReply {
            status,
            body: serde_json::from_slice(&bytes).ok(),
        })
    }
}

fn backend_url(base: &str, uri: &http::Uri) -> String {
    match uri.query() {
        Some(query) => format!("{base}{}?{query}", uri.path()),
        None => format!("{base}{}", uri.path()),
    }
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == HOST || is_hop_by_hop(name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn upstream_error(route_id: &str, error: &reqwest::Error) -> GatewayError {
    warn!(route = route_id, error = %error, "Backend call failed");
    if error.is_timeout() {
        GatewayError::upstream_timeout(format!("{route_id}: {error}"))
    } else {
        GatewayError::upstream_unavailable(format!("{route_id}: {error}"))
    }
}
