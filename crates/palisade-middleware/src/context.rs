//! The per-request exchange.
//!
//! One [`Exchange`] exists per request. It is owned by the chain invocation
//! processing that request and passed by `&mut` through every filter; it is
//! never shared across requests.

use http::Method;
use palisade_core::{CorrelationId, Identity};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Mutable state that flows through the filter chain alongside the request.
///
/// The request itself travels separately so filters can rewrite it; the
/// exchange keeps what the inbound request looked like plus the attributes
/// filters hand to each other.
///
/// # Example
///
/// ```
/// use palisade_middleware::Exchange;
/// use palisade_core::Identity;
///
/// let mut exchange = Exchange::new(http::Method::GET, "/api/users/1");
/// exchange.set_route_id("user-service");
/// exchange.set_identity(Identity::Jwt {
///     subject: "alice".to_string(),
///     user_id: "user-456".to_string(),
///     roles: vec![],
/// });
///
/// assert_eq!(exchange.route_id(), Some("user-service"));
/// assert!(exchange.identity().is_authenticated());
/// ```
#[derive(Debug)]
pub struct Exchange {
    correlation_id: CorrelationId,
    method: Method,
    path: String,
    remote_addr: Option<SocketAddr>,
    route_id: Option<String>,
    identity: Identity,
    started_at: Instant,
    attributes: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Exchange {
    /// Creates an exchange for an inbound request line.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            method,
            path: path.into(),
            remote_addr: None,
            route_id: None,
            identity: Identity::Anonymous,
            started_at: Instant::now(),
            attributes: HashMap::new(),
        }
    }

    /// Creates an exchange for an inbound request.
    pub fn for_request<B>(request: &http::Request<B>, remote_addr: Option<SocketAddr>) -> Self {
        let mut exchange = Self::new(request.method().clone(), request.uri().path());
        exchange.remote_addr = remote_addr;
        exchange
    }

    /// Sets the remote address.
    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    /// Returns the correlation id.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Sets the correlation id.
    pub fn set_correlation_id(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = correlation_id;
    }

    /// Inbound method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Inbound path, before any rewrite.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Address of the connected client, if known.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Id of the matched route.
    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    /// Sets the matched route id.
    pub fn set_route_id(&mut self, route_id: impl Into<String>) {
        self.route_id = Some(route_id.into());
    }

    /// Returns the caller identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Sets the caller identity.
    ///
    /// Only the authentication filters call this.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// Returns when the exchange was created.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time spent since the exchange was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed attribute, replacing any previous value of that type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.attributes.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a typed attribute.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.attributes
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed attribute.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.attributes
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns true if an attribute of the given type is stored.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.attributes.contains_key(&TypeId::of::<T>())
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new(Method::GET, "/")
    }
}
