//! Filter registry.
//!
//! Maps the filter names used in route definitions to factories. Each factory
//! receives the route it is building for, the services shared by all routes
//! and the filter's arguments, decoded into a typed value with
//! `serde_json::from_value`.
//!
//! | name | args |
//! |------|------|
//! | `jwt_auth` | none |
//! | `oauth2` | none |
//! | `response_cache` | `{ "ttl_seconds": u64? }` |
//! | `api_version` | none |
//! | `strip_prefix` | `{ "parts": usize }` |

use std::sync::Arc;

use indexmap::IndexMap;
use palisade_auth::{IntrospectionClient, TokenVerifier};
use palisade_cache::ResponseCache;
use palisade_config::{FilterSpec, GatewayConfig};
use palisade_middleware::filters::{
    ApiVersionFilter, JwtAuthFilter, OAuth2Filter, ResponseCacheFilter, StripPrefixFilter,
};
use palisade_middleware::BoxedFilter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ServerError, ServerResult};

/// Services shared by every route's filters.
#[derive(Clone)]
pub struct SharedServices {
    /// Response cache.
    pub cache: Arc<ResponseCache>,
    /// Local token verifier.
    pub verifier: Arc<TokenVerifier>,
    /// Remote introspection client.
    pub introspection: Arc<IntrospectionClient>,
}

impl SharedServices {
    /// Bundles already constructed services.
    pub fn new(
        cache: Arc<ResponseCache>,
        verifier: Arc<TokenVerifier>,
        introspection: Arc<IntrospectionClient>,
    ) -> Self {
        Self {
            cache,
            verifier,
            introspection,
        }
    }

    /// Creates the services from configuration.
    pub fn from_config(config: &GatewayConfig) -> ServerResult<Self> {
        Ok(Self::new(
            Arc::new(ResponseCache::new(config.cache.clone())),
            Arc::new(TokenVerifier::new(&config.jwt.secret)),
            Arc::new(IntrospectionClient::new(config.oauth2.clone())?),
        ))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::from_config(&GatewayConfig::builder().jwt_secret("test-secret").build())
            .expect("default services")
    }
}

impl std::fmt::Debug for SharedServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedServices")
            .field("cache_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// What a factory knows about the route it builds for.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Id of the route.
    pub route_id: &'a str,
    /// Shared services.
    pub services: &'a SharedServices,
}

type Factory = Box<dyn Fn(&FilterContext<'_>, Value) -> ServerResult<BoxedFilter> + Send + Sync>;

/// Name to factory mapping for route filters.
pub struct FilterRegistry {
    factories: IndexMap<String, Factory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResponseCacheArgs {
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StripPrefixArgs {
    parts: usize,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Creates a registry with the built-in route filters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("jwt_auth", |ctx, _: NoArgs| {
            Ok(Arc::new(JwtAuthFilter::new(ctx.services.verifier.clone())))
        });
        registry.register("oauth2", |ctx, _: NoArgs| {
            Ok(Arc::new(OAuth2Filter::new(ctx.services.introspection.clone())))
        });
        registry.register("response_cache", |ctx, args: ResponseCacheArgs| {
            Ok(Arc::new(ResponseCacheFilter::new(
                ctx.services.cache.clone(),
                ctx.route_id,
                args.ttl_seconds,
            )))
        });
        registry.register("api_version", |_, _: NoArgs| Ok(Arc::new(ApiVersionFilter::new())));
        registry.register("strip_prefix", |_, args: StripPrefixArgs| {
            Ok(Arc::new(StripPrefixFilter::new(args.parts)))
        });

        registry
    }

    /// Registers a factory whose arguments decode into `A`.
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<A, F>(&mut self, name: impl Into<String>, factory: F)
    where
        A: DeserializeOwned,
        F: Fn(&FilterContext<'_>, A) -> ServerResult<BoxedFilter> + Send + Sync + 'static,
    {
        let name = name.into();
        let filter_name = name.clone();
        let erased: Factory = Box::new(move |ctx: &FilterContext<'_>, raw: Value| {
            let args = serde_json::from_value::<A>(raw).map_err(|e| {
                ServerError::filter_args(ctx.route_id, filter_name.as_str(), e.to_string())
            })?;
            factory(ctx, args)
        });
        self.factories.insert(name, erased);
    }

    /// Builds the filter a spec names.
    pub fn build(&self, ctx: &FilterContext<'_>, spec: &FilterSpec) -> ServerResult<BoxedFilter> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| ServerError::unknown_filter(ctx.route_id, spec.name.as_str()))?;

        let args = match &spec.args {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other.clone(),
        };
        factory(ctx, args)
    }

    /// Returns true if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(services: &SharedServices) -> FilterContext<'_> {
        FilterContext {
            route_id: "product-service",
            services,
        }
    }

    #[test]
    fn test_default_names() {
        let registry = FilterRegistry::with_defaults();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["jwt_auth", "oauth2", "response_cache", "api_version", "strip_prefix"]
        );
        assert!(registry.contains("oauth2"));
        assert!(!registry.contains("gzip"));
    }

    #[test]
    fn test_build_without_args() {
        let services = SharedServices::for_tests();
        let registry = FilterRegistry::with_defaults();

        let filter = registry.build(&ctx(&services), &FilterSpec::new("jwt_auth")).unwrap();
        assert_eq!(filter.name(), "jwt_auth");

        let filter = registry
            .build(&ctx(&services), &FilterSpec::new("response_cache"))
            .unwrap();
        assert_eq!(filter.name(), "response_cache");
    }

    #[test]
    fn test_build_with_args() {
        let services = SharedServices::for_tests();
        let registry = FilterRegistry::with_defaults();

        let spec = FilterSpec::new("strip_prefix").with_args(json!({"parts": 2}));
        let filter = registry.build(&ctx(&services), &spec).unwrap();
        assert_eq!(filter.name(), "strip_prefix");

        let spec = FilterSpec::new("response_cache").with_args(json!({"ttl_seconds": 5}));
        assert!(registry.build(&ctx(&services), &spec).is_ok());
    }

    #[test]
    fn test_unknown_filter() {
        let services = SharedServices::for_tests();
        let err = FilterRegistry::with_defaults()
            .build(&ctx(&services), &FilterSpec::new("gzip"))
            .err().unwrap();
        assert!(matches!(err, ServerError::UnknownFilter { .. }));
    }

    #[test]
    fn test_invalid_args() {
        let services = SharedServices::for_tests();
        let registry = FilterRegistry::with_defaults();

        let missing = registry
            .build(&ctx(&services), &FilterSpec::new("strip_prefix"))
            .err().unwrap();
        assert!(matches!(missing, ServerError::FilterArgs { .. }));

        let wrong = FilterSpec::new("response_cache").with_args(json!({"ttl": "soon"}));
        assert!(matches!(
            registry.build(&ctx(&services), &wrong),
            Err(ServerError::FilterArgs { .. })
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FilterRegistry::new();
        registry.register("version_v2", |_, _: NoArgs| Ok(Arc::new(ApiVersionFilter::new())));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["version_v2"]);
    }
}
