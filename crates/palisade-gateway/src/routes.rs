//! Resolved route table.
//!
//! Routes are built once at startup from [`RouteDefinition`]s; their filters
//! are concrete instances produced by the [`FilterRegistry`].

use std::sync::Arc;
use std::time::Duration;

use palisade_config::RouteDefinition;
use palisade_middleware::BoxedFilter;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::ServerResult;
use crate::registry::{FilterContext, FilterRegistry, SharedServices};

/// A route with its filters resolved.
pub struct Route {
    /// Route id.
    pub id: String,
    /// Path prefix, without the trailing `/**`.
    pub prefix: String,
    /// Backend base URL, without a trailing slash.
    pub uri: String,
    /// Route filters in declared order.
    pub filters: Vec<BoxedFilter>,
    /// Circuit breaker guarding the dispatch, if configured.
    pub breaker: Option<Arc<CircuitBreaker>>,
    /// Bound on the backend exchange.
    pub timeout: Duration,
}

impl Route {
    /// Resolves a route definition.
    pub fn resolve(
        definition: &RouteDefinition,
        registry: &FilterRegistry,
        services: &SharedServices,
    ) -> ServerResult<Self> {
        let context = FilterContext {
            route_id: &definition.id,
            services,
        };
        let filters = definition
            .filters
            .iter()
            .map(|spec| registry.build(&context, spec))
            .collect::<ServerResult<Vec<_>>>()?;

        Ok(Self {
            id: definition.id.clone(),
            prefix: definition.path_prefix().to_string(),
            uri: definition.uri.trim_end_matches('/').to_string(),
            filters,
            breaker: definition
                .circuit_breaker
                .clone()
                .map(|settings| Arc::new(CircuitBreaker::new(settings))),
            timeout: definition.timeout,
        })
    }

    /// Returns true if `path` falls under this route.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("prefix", &self.prefix)
            .field("uri", &self.uri)
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Ordered set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Creates a table from already resolved routes.
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Resolves every definition against the registry.
    pub fn build(
        definitions: &[RouteDefinition],
        registry: &FilterRegistry,
        services: &SharedServices,
    ) -> ServerResult<Self> {
        let routes = definitions
            .iter()
            .map(|definition| Route::resolve(definition, registry, services))
            .collect::<ServerResult<Vec<_>>>()?;
        Ok(Self::new(routes))
    }

    /// Finds the route for a path.
    ///
    /// The longest matching prefix wins; equal lengths keep declaration order.
    pub fn match_path(&self, path: &str) -> Option<&Arc<Route>> {
        let mut best: Option<&Arc<Route>> = None;
        for route in self.routes.iter().filter(|r| r.matches(path)) {
            if best.map_or(true, |b| route.prefix.len() > b.prefix.len()) {
                best = Some(route);
            }
        }
        best
    }

    /// Looks up a route by id.
    pub fn get(&self, id: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Iterates routes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(AsRef::as_ref)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, prefix: &str) -> Route {
        Route {
            id: id.to_string(),
            prefix: prefix.to_string(),
            uri: "http://localhost:1".to_string(),
            filters: Vec::new(),
            breaker: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_prefix_boundaries() {
        let users = route("users", "/api/users");
        assert!(users.matches("/api/users"));
        assert!(users.matches("/api/users/"));
        assert!(users.matches("/api/users/42"));
        assert!(!users.matches("/api/usersx"));
        assert!(!users.matches("/api"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::new(vec![
            route("api", "/api"),
            route("admin", "/api/users/admin"),
            route("users", "/api/users"),
        ]);

        assert_eq!(table.match_path("/api/users/admin/1").unwrap().id, "admin");
        assert_eq!(table.match_path("/api/users/7").unwrap().id, "users");
        assert_eq!(table.match_path("/api/orders").unwrap().id, "api");
        assert!(table.match_path("/health").is_none());
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let table = RouteTable::new(vec![route("first", "/api/x"), route("second", "/api/x")]);
        assert_eq!(table.match_path("/api/x/1").unwrap().id, "first");
    }

    #[test]
    fn test_resolve_definition() {
        let definition =
            RouteDefinition::new("svc", "/api/svc/**", "http://localhost:9000/")
                .with_circuit_breaker(palisade_config::CircuitBreakerSettings::named("svc-cb"))
                .with_timeout(Duration::from_secs(2));
        let services = SharedServices::for_tests();
        let resolved =
            Route::resolve(&definition, &FilterRegistry::with_defaults(), &services).unwrap();

        assert_eq!(resolved.prefix, "/api/svc");
        assert_eq!(resolved.uri, "http://localhost:9000");
        assert!(resolved.breaker.is_some());
        assert_eq!(resolved.timeout, Duration::from_secs(2));
        assert!(resolved.filters.is_empty());
    }
}
