//! OpenAPI document aggregation.
//!
//! Each documented service is a route whose backend serves its own OpenAPI
//! document. The gateway lists them, proxies them one by one and merges
//! their `paths` and `components.schemas` into a single document.

use futures_util::future::join_all;
use palisade_config::ApiDocsConfig;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::proxy::Dispatcher;
use crate::routes::RouteTable;

/// Title of the merged document.
pub const AGGREGATED_TITLE: &str = "API Gateway - Aggregated Documentation";

/// One entry of the documentation resource list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerResource {
    /// Display name.
    pub name: String,
    /// Document URL relative to the gateway.
    pub url: String,
    /// OpenAPI/Swagger version of the backend document.
    pub swagger_version: String,
    /// Base path the service is routed under.
    pub location: String,
}

/// Lists the configured documented services.
pub fn resources(config: &ApiDocsConfig) -> Vec<SwaggerResource> {
    config
        .services
        .iter()
        .map(|service| SwaggerResource {
            name: service.display_name.clone(),
            url: format!("{}{}", service.base_path, config.api_docs_path),
            swagger_version: service.swagger_version.clone(),
            location: service.base_path.clone(),
        })
        .collect()
}

/// Fetches one service's document from the backend of the route with that id.
///
/// `None` when no route has the id, the backend is unreachable, answers with
/// an error status, or returns something other than a non-empty JSON object.
pub async fn fetch_document(
    dispatcher: &Dispatcher,
    routes: &RouteTable,
    config: &ApiDocsConfig,
    service_id: &str,
) -> Option<Map<String, Value>> {
    let Some(route) = routes.get(service_id) else {
        debug!(service = service_id, "No route for documented service");
        return None;
    };

    let reply = match dispatcher
        .fetch_json(route, &config.api_docs_path, config.fetch_timeout)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(service = service_id, error = %e, "Failed to fetch API docs");
            return None;
        }
    };

    if !reply.status.is_success() {
        warn!(
            service = service_id,
            status = reply.status.as_u16(),
            "Backend refused API docs"
        );
        return None;
    }

    match reply.body {
        Some(Value::Object(document)) if !document.is_empty() => Some(document),
        _ => {
            warn!(service = service_id, "Backend returned no usable API docs");
            None
        }
    }
}

/// Fetches every configured service's document and merges them.
///
/// Services whose document cannot be fetched are left out.
pub async fn aggregate(dispatcher: &Dispatcher, routes: &RouteTable, config: &ApiDocsConfig) -> Value {
    let fetches = config
        .services
        .iter()
        .map(|service| fetch_document(dispatcher, routes, config, &service.service_id));
    let documents: Vec<_> = join_all(fetches).await.into_iter().flatten().collect();
    debug!(
        services = config.services.len(),
        merged = documents.len(),
        "Aggregated API docs"
    );
    merge(&documents)
}

/// Merges `paths` and `components.schemas` of several documents.
///
/// On a duplicate key the later document wins.
pub fn merge(documents: &[Map<String, Value>]) -> Value {
    let mut paths = Map::new();
    let mut schemas = Map::new();

    for document in documents {
        if let Some(Value::Object(doc_paths)) = document.get("paths") {
            paths.extend(doc_paths.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(Value::Object(doc_schemas)) = document
            .get("components")
            .and_then(|components| components.get("schemas"))
        {
            schemas.extend(doc_schemas.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    json!({
        "openapi": "3.0.1",
        "info": {
            "title": AGGREGATED_TITLE,
            "description": "Aggregated API documentation from all microservices",
            "version": crate::VERSION,
        },
        "paths": paths,
        "components": { "schemas": schemas },
    })
}
