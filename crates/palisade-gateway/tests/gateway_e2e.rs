//! End-to-end behavior of the gateway against mock backends.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use palisade_auth::{TokenClaims, TokenVerifier};
use palisade_cache::CacheKey;
use palisade_config::{
    ApiDocsConfig, CircuitBreakerSettings, FilterSpec, GatewayConfig, HealthConfig, RouteDefinition,
};
use palisade_gateway::{FallbackBody, Gateway, GatewayServer, ShutdownSignal};
use palisade_middleware::{Request, Response};
use serde_json::{json, Value};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "e2e-secret-key-long-enough-for-hs256-signing";

fn config(backend: &MockServer) -> GatewayConfig {
    GatewayConfig::builder()
        .jwt_secret(SECRET)
        .route(RouteDefinition::new(
            "auth-service",
            "/api/auth/**",
            backend.uri(),
        ))
        .route(
            RouteDefinition::new("user-service", "/api/users/**", backend.uri())
                .with_filter(FilterSpec::new("jwt_auth")),
        )
        .route(
            RouteDefinition::new("product-service", "/api/products/**", backend.uri())
                .with_filter(FilterSpec::new("jwt_auth"))
                .with_filter(FilterSpec::new("response_cache")),
        )
        .route(
            RouteDefinition::new("order-service", "/api/orders/**", "http://127.0.0.1:1")
                .with_circuit_breaker(CircuitBreakerSettings::named("order-service-cb")),
        )
        .route(
            RouteDefinition::new("report-service", "/api/reports/**", backend.uri())
                .with_timeout(Duration::from_millis(200)),
        )
        .health(HealthConfig {
            check_backends: false,
            ..HealthConfig::default()
        })
        .build()
}

fn token() -> String {
    let claims = TokenClaims::new("alice", Duration::from_secs(300))
        .with_user_id("user-1")
        .with_roles(["USER", "ADMIN"]);
    TokenVerifier::new(SECRET).sign(&claims).unwrap()
}

fn request(method: Method, uri: &str) -> http::request::Builder {
    http::Request::builder().method(method).uri(uri)
}

fn authorized(method: Method, uri: &str) -> Request {
    request(method, uri)
        .header("authorization", format!("Bearer {}", token()))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn anonymous(method: Method, uri: &str) -> Request {
    request(method, uri).body(Full::new(Bytes::new())).unwrap()
}

async fn body(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body(response).await).unwrap()
}

#[tokio::test]
async fn cache_miss_forwards_verbatim_and_stores_entry() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-backend", "products-v1")
                .set_body_json(json!({"id": 7, "name": "Lamp"})),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let response = gateway
        .handle(authorized(Method::GET, "/api/products/7"), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-backend"], "products-v1");
    assert!(response.headers().get("x-cache").is_none());
    assert!(response.headers().contains_key("x-correlation-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(json_body(response).await, json!({"id": 7, "name": "Lamp"}));

    let key = CacheKey::new(&Method::GET, "/api/products/7", None).unwrap();
    assert_eq!(key.as_str(), "GET|/api/products/7");
    assert!(gateway.services().cache.get(&key).is_some());
}

#[tokio::test]
async fn repeat_within_ttl_is_served_from_cache() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("lamp"))
        .expect(1)
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let first = gateway
        .handle(authorized(Method::GET, "/api/products/7"), None)
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = gateway
        .handle(authorized(Method::GET, "/api/products/7"), None)
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert!(second.headers().contains_key("x-cache-ttl"));
    assert_eq!(body(second).await, Bytes::from_static(b"lamp"));
}

#[tokio::test]
async fn missing_credentials_are_rejected_before_backend_and_cache() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let response = gateway
        .handle(anonymous(Method::GET, "/api/products/7"), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    let error = json_body(response).await;
    assert_eq!(error["status"], 401);
    assert_eq!(error["message"], "Missing or invalid Authorization header");
    assert_eq!(error["path"], "/api/products/7");
    assert!(gateway.services().cache.is_empty());
}

#[tokio::test]
async fn identity_headers_reach_backend_and_reserved_headers_do_not() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/1"))
        .and(header("x-auth-user", "alice"))
        .and(header("x-auth-userid", "user-1"))
        .and(header("x-auth-roles", "USER,ADMIN"))
        .and(header("x-gateway-source", "api-gateway"))
        .respond_with(ResponseTemplate::new(200).insert_header("server", "backend/1.0"))
        .expect(1)
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let mut request = authorized(Method::GET, "/api/users/1");
    request
        .headers_mut()
        .insert("x-internal-token", "forged".parse().unwrap());
    request
        .headers_mut()
        .insert("x-debug-mode", "true".parse().unwrap());
    request
        .headers_mut()
        .insert("x-auth-user", "mallory".parse().unwrap());

    let response = gateway.handle(request, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("server").is_none());

    let received = backend.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let headers = &received[0].headers;
    assert!(headers.get("x-internal-token").is_none());
    assert!(headers.get("x-debug-mode").is_none());
    assert!(headers.get("x-gateway-timestamp").is_some());
}

#[tokio::test]
async fn method_path_query_and_body_are_preserved() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(query_param("next", "/home"))
        .and(body_string(r#"{"username":"alice"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let request = request(Method::POST, "/api/auth/login?next=%2Fhome")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(br#"{"username":"alice"}"#)))
        .unwrap();

    let response = gateway.handle(request, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body(response).await, Bytes::from_static(b"created"));
}

#[tokio::test]
async fn unreachable_backend_with_breaker_serves_fallback_then_opens() {
    let backend = MockServer::start().await;
    let gateway = Gateway::new(&config(&backend)).unwrap();

    for _ in 0..5 {
        let response = gateway
            .handle(anonymous(Method::GET, "/api/orders/9"), None)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let fallback: FallbackBody = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(fallback.service, "Order Service");
        assert_eq!(fallback.error, "Service Unavailable");
    }

    let health = gateway
        .handle(anonymous(Method::GET, "/actuator/health"), None)
        .await;
    assert_eq!(health.status(), StatusCode::OK);
    let health = json_body(health).await;
    assert_eq!(health["status"], "UP");
    assert_eq!(health["circuit_breakers"]["order-service"], "OPEN");
}

#[tokio::test]
async fn slow_backend_without_breaker_times_out() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/daily"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    let response = gateway
        .handle(anonymous(Method::GET, "/api/reports/daily"), None)
        .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let error = json_body(response).await;
    assert_eq!(
        error["message"],
        "Service request timed out. Please try again later."
    );
}

#[tokio::test]
async fn unmatched_path_is_404() {
    let backend = MockServer::start().await;
    let gateway = Gateway::new(&config(&backend)).unwrap();

    let response = gateway
        .handle(anonymous(Method::GET, "/api/unknown/1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(json_body(response).await["path"], "/api/unknown/1");
}

#[tokio::test]
async fn cache_admin_endpoints() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("item"))
        .mount(&backend)
        .await;

    let gateway = Gateway::new(&config(&backend)).unwrap();
    for id in 1..=2 {
        gateway
            .handle(authorized(Method::GET, &format!("/api/products/{id}")), None)
            .await;
    }

    let stats = json_body(
        gateway
            .handle(anonymous(Method::GET, "/actuator/cache/stats"), None)
            .await,
    )
    .await;
    assert_eq!(stats["totalEntries"], 2);
    assert_eq!(stats["routeBreakdown"]["GET"], 2);

    let evicted = gateway
        .handle(
            anonymous(Method::DELETE, "/actuator/cache/entries?pattern=products%2F1%24"),
            None,
        )
        .await;
    assert_eq!(evicted.status(), StatusCode::OK);
    assert_eq!(json_body(evicted).await["evicted"], 1);

    let invalid = gateway
        .handle(
            anonymous(Method::DELETE, "/actuator/cache/entries?pattern=%28"),
            None,
        )
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let cleared = gateway
        .handle(anonymous(Method::DELETE, "/actuator/cache"), None)
        .await;
    assert_eq!(json_body(cleared).await["cleared"], 1);
    assert!(gateway.services().cache.is_empty());
}

#[tokio::test]
async fn fallback_endpoint_serves_payload() {
    let backend = MockServer::start().await;
    let gateway = Gateway::new(&config(&backend)).unwrap();

    for method in [Method::GET, Method::POST] {
        let response = gateway
            .handle(anonymous(method, "/fallback/user-service"), None)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let fallback: FallbackBody = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(
            fallback.message,
            "User service is currently unavailable. Please try again later."
        );
    }
}

#[tokio::test]
async fn server_serves_over_tcp_and_shuts_down() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&backend)
        .await;

    let mut config = config(&backend);
    config.server.max_request_body_size = 64;
    let server = GatewayServer::new(&config).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = reqwest::Client::new();
    let health = client
        .get(format!("http://{addr}/actuator/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-content-type-options"));

    let small = client
        .post(format!("http://{addr}/api/auth/login"))
        .body("short")
        .send()
        .await
        .unwrap();
    assert_eq!(small.status(), StatusCode::OK);
    assert_eq!(small.text().await.unwrap(), "ok");

    let large = client
        .post(format!("http://{addr}/api/auth/login"))
        .body(vec![b'x'; 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(large.status(), StatusCode::PAYLOAD_TOO_LARGE);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops")
        .expect("task finished")
        .expect("clean shutdown");
}

async fn mount_health(backend: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/actuator/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(backend)
        .await;
}

#[tokio::test]
async fn health_reports_backend_status() {
    let backend = MockServer::start().await;
    mount_health(&backend, "UP").await;

    let mut config = config(&backend);
    config.health.check_backends = true;
    config.health.check_timeout = Duration::from_secs(1);
    let gateway = Gateway::new(&config).unwrap();

    let response = gateway
        .handle(anonymous(Method::GET, "/actuator/health"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "UP");
    assert_eq!(health["services"]["user-service"]["status"], "UP");
    assert_eq!(health["services"]["user-service"]["url"], backend.uri());
    assert!(health["services"]["user-service"].get("error").is_none());
    assert_eq!(health["services"]["order-service"]["status"], "DOWN");
    assert!(health["services"]["order-service"]["error"].is_string());

    backend.reset().await;
    mount_health(&backend, "DOWN").await;

    let response = gateway
        .handle(anonymous(Method::GET, "/actuator/health"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "UP");
    for service in ["auth-service", "user-service", "product-service", "report-service"] {
        assert_eq!(health["services"][service]["status"], "DOWN", "{service}");
        assert_eq!(health["services"][service]["reported"], "DOWN", "{service}");
    }
}

#[tokio::test]
async fn backend_health_check_is_bounded_by_timeout() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/actuator/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "UP" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&backend)
        .await;

    let mut config = config(&backend);
    config.health.check_backends = true;
    config.health.check_timeout = Duration::from_millis(100);
    let gateway = Gateway::new(&config).unwrap();

    let started = std::time::Instant::now();
    let response = gateway
        .handle(anonymous(Method::GET, "/actuator/health"), None)
        .await;
    assert!(started.elapsed() < Duration::from_secs(4));

    let health = json_body(response).await;
    assert_eq!(health["services"]["user-service"]["status"], "DOWN");
    assert!(health["services"]["user-service"]["error"].is_string());
}

async fn docs_backend(path_name: &str, schema: &str) -> MockServer {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "openapi": "3.0.1",
            "paths": { path_name: { "get": { "summary": schema } } },
            "components": { "schemas": { schema: { "type": "object" } } }
        })))
        .mount(&backend)
        .await;
    backend
}

fn docs_config(users: &MockServer, products: &MockServer) -> GatewayConfig {
    GatewayConfig::builder()
        .jwt_secret(SECRET)
        .route(RouteDefinition::new("user-service", "/api/users/**", users.uri()))
        .route(RouteDefinition::new("product-service", "/api/products/**", products.uri()))
        .route(RouteDefinition::new(
            "order-service",
            "/api/orders/**",
            "http://127.0.0.1:1",
        ))
        .build()
}

#[tokio::test]
async fn api_docs_are_listed_proxied_and_merged() {
    let users = docs_backend("/api/users", "User").await;
    let products = docs_backend("/api/products", "Product").await;
    let gateway = Gateway::new(&docs_config(&users, &products)).unwrap();

    let response = gateway
        .handle(anonymous(Method::GET, "/swagger-resources"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let resources = json_body(response).await;
    assert_eq!(resources.as_array().unwrap().len(), 4);
    assert_eq!(resources[0]["name"], "User Service");
    assert_eq!(resources[0]["url"], "/api/users/v3/api-docs");
    assert_eq!(resources[0]["swaggerVersion"], "3.0");
    assert_eq!(resources[0]["location"], "/api/users");

    let response = gateway
        .handle(anonymous(Method::GET, "/v3/api-docs/aggregated"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let merged = json_body(response).await;
    assert_eq!(merged["openapi"], "3.0.1");
    assert_eq!(merged["info"]["title"], "API Gateway - Aggregated Documentation");
    assert_eq!(merged["paths"].as_object().unwrap().len(), 2);
    assert!(merged["paths"].get("/api/users").is_some());
    assert!(merged["paths"].get("/api/products").is_some());
    assert!(merged["components"]["schemas"].get("User").is_some());
    assert!(merged["components"]["schemas"].get("Product").is_some());

    let response = gateway
        .handle(anonymous(Method::GET, "/v3/api-docs/user-service"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let document = json_body(response).await;
    assert!(document["paths"].get("/api/users").is_some());
    assert!(document["paths"].get("/api/products").is_none());
}

#[tokio::test]
async fn api_docs_missing_service_is_404() {
    let users = docs_backend("/api/users", "User").await;
    let products = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&products)
        .await;
    let gateway = Gateway::new(&docs_config(&users, &products)).unwrap();

    for uri in [
        "/v3/api-docs/order-service",
        "/v3/api-docs/product-service",
        "/v3/api-docs/billing-service",
    ] {
        let response = gateway.handle(anonymous(Method::GET, uri), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let error = json_body(response).await;
        assert_eq!(error["path"], uri);
    }
}

#[tokio::test]
async fn api_docs_disabled_falls_through_to_routing() {
    let users = docs_backend("/api/users", "User").await;
    let mut config = docs_config(&users, &users);
    config.api_docs = ApiDocsConfig {
        enabled: false,
        ..ApiDocsConfig::default()
    };
    let gateway = Gateway::new(&config).unwrap();

    let response = gateway
        .handle(anonymous(Method::GET, "/swagger-resources"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = gateway
        .handle(anonymous(Method::GET, "/v3/api-docs/aggregated"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
