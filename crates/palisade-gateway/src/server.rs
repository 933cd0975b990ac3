//! Gateway request handling and the HTTP server.
//!
//! [`Gateway`] holds everything needed to answer one request: the global
//! filter chain, the resolved route table, the dispatcher and the shared
//! services. [`GatewayServer`] feeds it from a hyper HTTP/1 listener.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use palisade_cache::CacheSweeper;
use palisade_config::{ApiDocsConfig, GatewayConfig, HealthConfig};
use palisade_core::{ErrorBody, GatewayError};
use palisade_middleware::filters::{
    harden_response_headers, CorrelationIdFilter, LoggingFilter, MetricsFilter, RateLimitFilter,
    RequestHeaderFilter, ResponseHeaderFilter, TokenBucketLimiter,
};
use palisade_middleware::{Exchange, FilterChain, Request, Response, ResponseExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, field, info, info_span, warn, Instrument};

use crate::admin;
use crate::error::{ServerError, ServerResult};
use crate::fallback::fallback_response;
use crate::health::HealthChecker;
use crate::proxy::Dispatcher;
use crate::registry::{FilterRegistry, SharedServices};
use crate::routes::{Route, RouteTable};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Request handler shared by every connection.
pub struct Gateway {
    chain: FilterChain,
    routes: RouteTable,
    dispatcher: Dispatcher,
    services: SharedServices,
    health: HealthChecker,
    health_config: HealthConfig,
    api_docs: ApiDocsConfig,
}

impl Gateway {
    /// Builds a gateway with the built-in route filters.
    pub fn new(config: &GatewayConfig) -> ServerResult<Self> {
        Self::with_registry(config, &FilterRegistry::with_defaults())
    }

    /// Builds a gateway resolving route filters through `registry`.
    pub fn with_registry(config: &GatewayConfig, registry: &FilterRegistry) -> ServerResult<Self> {
        config.validate()?;
        config.validate_filter_names(registry.names())?;

        let services = SharedServices::from_config(config)?;
        let routes = RouteTable::build(&config.routes, registry, &services)?;
        let chain = global_chain(config);

        info!(
            routes = routes.len(),
            filters = ?chain.filter_names(),
            "Gateway configured"
        );

        Ok(Self {
            chain,
            routes,
            dispatcher: Dispatcher::new()?,
            services,
            health: HealthChecker::new(config.logging.service_name.clone()),
            health_config: config.health.clone(),
            api_docs: config.api_docs.clone(),
        })
    }

    /// Global filter chain.
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Resolved routes.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Services shared by the route filters.
    pub fn services(&self) -> &SharedServices {
        &self.services
    }

    /// Health state.
    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    /// Backend health check settings.
    pub fn health_config(&self) -> &HealthConfig {
        &self.health_config
    }

    /// OpenAPI aggregation settings.
    pub fn api_docs(&self) -> &ApiDocsConfig {
        &self.api_docs
    }

    /// Client used for backend calls.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Answers one buffered request.
    ///
    /// Operational endpoints are served first; otherwise the longest matching
    /// route's filters run inside the global chain around the dispatch.
    pub async fn handle(&self, request: Request, remote_addr: Option<SocketAddr>) -> Response {
        if let Some(response) = admin::handle(self, &request).await {
            return response;
        }

        let path = request.uri().path().to_string();
        let Some(route) = self.routes.match_path(&path) else {
            debug!(path = %path, "No route matched");
            let mut response = Response::gateway_error(&GatewayError::not_found(&path), &path);
            harden_response_headers(response.headers_mut());
            return response;
        };

        let mut exchange = Exchange::for_request(&request, remote_addr);
        exchange.set_route_id(route.id.as_str());

        let dispatcher = self.dispatcher.clone();
        let target = Arc::clone(route);
        self.chain
            .run(&route.filters, &mut exchange, request, move |exchange, request| {
                let path = exchange.path().to_string();
                Box::pin(async move { forward(&dispatcher, &target, &path, request).await })
            })
            .await
    }
}

async fn forward(dispatcher: &Dispatcher, route: &Route, path: &str, request: Request) -> Response {
    let permit = match &route.breaker {
        Some(breaker) => match breaker.try_acquire() {
            Some(permit) => Some(permit),
            None => {
                debug!(route = %route.id, breaker = breaker.name(), "Circuit open, call rejected");
                return fallback_response(&route.id);
            }
        },
        None => None,
    };

    match dispatcher.dispatch(route, request).await {
        Ok(response) => {
            if let Some(permit) = permit {
                if response.status().is_server_error() {
                    permit.failure();
                } else {
                    permit.success();
                }
            }
            response
        }
        Err(err) => match permit {
            Some(permit) => {
                permit.failure();
                fallback_response(&route.id)
            }
            None => Response::gateway_error(&err, path),
        },
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("chain", &self.chain)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

fn global_chain(config: &GatewayConfig) -> FilterChain {
    let mut builder = FilterChain::builder()
        .global(CorrelationIdFilter::new())
        .global(LoggingFilter::new())
        .global(MetricsFilter::new())
        .global(
            RequestHeaderFilter::new()
                .with_additional(&config.request_headers.additional_headers_to_remove),
        )
        .global(ResponseHeaderFilter::new());

    if config.rate_limit.enabled {
        let limiter = TokenBucketLimiter::new(
            config.rate_limit.replenish_rate,
            config.rate_limit.burst_capacity,
        )
        .with_max_keys(config.rate_limit.max_tracked_keys);
        builder = builder.global(RateLimitFilter::new(Arc::new(limiter)));
    }

    builder.build()
}

/// HTTP/1 server in front of a [`Gateway`].
#[derive(Debug)]
pub struct GatewayServer {
    gateway: Arc<Gateway>,
    socket_addr: SocketAddr,
    shutdown_grace: Duration,
    max_body_size: usize,
    eviction_interval: Duration,
}

impl GatewayServer {
    /// Builds the gateway and server from configuration.
    pub fn new(config: &GatewayConfig) -> ServerResult<Self> {
        let gateway = Gateway::new(config)?;
        Ok(Self {
            gateway: Arc::new(gateway),
            socket_addr: config.server.socket_addr()?,
            shutdown_grace: config.server.shutdown_grace,
            max_body_size: config.server.max_request_body_size,
            eviction_interval: config.cache.eviction_interval(),
        })
    }

    /// The request handler.
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let listener = TcpListener::bind(self.socket_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.socket_addr,
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` fires.
    ///
    /// After the trigger the listener is closed and open connections get up
    /// to the shutdown grace period to finish their in-flight requests.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local = listener.local_addr()?;
        info!(addr = %local, "Palisade gateway listening");

        let cache = self.gateway.services().cache.clone();
        let sweeper = cache
            .is_enabled()
            .then(|| CacheSweeper::start(cache, self.eviction_interval));

        let tracker = ConnectionTracker::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let token = tracker.acquire();
                        let gateway = Arc::clone(&self.gateway);
                        let shutdown = shutdown.clone();
                        let max_body_size = self.max_body_size;
                        tokio::spawn(async move {
                            serve_connection(gateway, stream, peer, max_body_size, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);
        self.gateway.health().set_down();

        info!(
            active = tracker.active_connections(),
            grace_secs = self.shutdown_grace.as_secs(),
            "Draining connections"
        );
        tokio::select! {
            () = tracker.wait_for_drain() => info!("All connections closed"),
            () = tokio::time::sleep(self.shutdown_grace) => warn!(
                active = tracker.active_connections(),
                "Shutdown grace period elapsed with open connections"
            ),
        }

        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
        info!("Palisade gateway stopped");
        Ok(())
    }
}

async fn serve_connection(
    gateway: Arc<Gateway>,
    stream: TcpStream,
    peer: SocketAddr,
    max_body_size: usize,
    shutdown: ShutdownSignal,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request| {
        let gateway = Arc::clone(&gateway);
        async move { Ok::<_, Infallible>(serve_request(&gateway, request, peer, max_body_size).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };
    if let Err(e) = result {
        debug!(peer = %peer, error = %e, "Connection closed with error");
    }
}

async fn serve_request(
    gateway: &Gateway,
    request: http::Request<Incoming>,
    peer: SocketAddr,
    max_body_size: usize,
) -> Response {
    let span = info_span!(
        "request",
        correlation_id = field::Empty,
        method = %request.method(),
        path = %request.uri().path(),
        peer = %peer,
    );

    async move {
        let path = request.uri().path().to_string();
        let (parts, body) = request.into_parts();

        let body = match Limited::new(body, max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(limit = max_body_size, "Request body too large");
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large", &path);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                return Response::gateway_error(
                    &GatewayError::bad_request("Failed to read request body"),
                    &path,
                );
            }
        };

        let request = http::Request::from_parts(parts, Full::new(body));
        match AssertUnwindSafe(gateway.handle(request, Some(peer)))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(_) => {
                error!("Request handler panicked");
                Response::gateway_error(&GatewayError::internal("handler panicked"), &path)
            }
        }
    }
    .instrument(span)
    .await
}

fn error_response(status: StatusCode, message: &str, path: &str) -> Response {
    let mut response = Response::json(status, &ErrorBody::new(status, message, path));
    harden_response_headers(response.headers_mut());
    response
}
