//! Ordered composition of global and route filters.
//!
//! ```text
//! request ─► global(min order) ─► … ─► global(max order) ─► route filters ─► dispatch
//! response ◄─ global(min order) ◄─ … ◄─ global(max order) ◄─ route filters ◄─┘
//! ```
//!
//! Global filters are sorted ascending by [`GlobalFilter::order`] when the
//! chain is built; ties keep registration order. A route's filters form one
//! block nested inside all global filters, in declared order, directly around
//! the dispatch.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, GlobalFilter, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased filter that can be stored in a route.
pub type BoxedFilter = Arc<dyn Filter>;

/// The gateway's filter chain.
///
/// Built once at startup and shared by every request.
///
/// # Example
///
/// ```ignore
/// let chain = FilterChain::builder()
///     .global(CorrelationIdFilter::new())
///     .global(LoggingFilter::new())
///     .build();
///
/// let dispatcher = dispatcher.clone();
/// let route = Arc::clone(&route);
/// let response = chain
///     .run(&route.filters, &mut exchange, request, move |_exchange, request| {
///         Box::pin(async move { dispatcher.dispatch(&route, request).await })
///     })
///     .await;
/// ```
pub struct FilterChain {
    globals: Vec<(i32, BoxedFilter)>,
}

impl FilterChain {
    /// Creates a new chain builder.
    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::new()
    }

    /// Runs the chain for one request.
    ///
    /// `route_filters` are the matched route's filters, in declared order.
    /// `dispatch` is only invoked if no filter short-circuits. Its future owns
    /// whatever it needs from the caller.
    pub async fn run<'a, D>(
        &'a self,
        route_filters: &'a [BoxedFilter],
        exchange: &'a mut Exchange,
        request: Request,
        dispatch: D,
    ) -> Response
    where
        D: FnOnce(&Exchange, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let next = self.build(route_filters, dispatch);
        next.run(exchange, request).await
    }

    fn build<'a, D>(&'a self, route_filters: &'a [BoxedFilter], dispatch: D) -> Next<'a>
    where
        D: FnOnce(&Exchange, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::dispatch(dispatch);

        for filter in route_filters.iter().rev() {
            next = Next::new(filter.as_ref(), next);
        }

        for (_, filter) in self.globals.iter().rev() {
            next = Next::new(filter.as_ref(), next);
        }

        next
    }

    /// Returns the global filter names in execution order.
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.globals.iter().map(|(_, f)| f.name()).collect()
    }

    /// Returns the number of global filters.
    pub fn len(&self) -> usize {
        self.globals.len()
    }

    /// Returns true if no global filter is registered.
    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("globals", &self.filter_names())
            .finish()
    }
}

/// Builder for a [`FilterChain`].
#[derive(Default)]
pub struct FilterChainBuilder {
    globals: Vec<(i32, BoxedFilter)>,
}

impl FilterChainBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global filter at its own order.
    #[must_use]
    pub fn global<F: GlobalFilter>(mut self, filter: F) -> Self {
        let order = filter.order();
        self.globals.push((order, Arc::new(filter)));
        self
    }

    /// Adds a global filter at an explicit order.
    #[must_use]
    pub fn global_at(mut self, order: i32, filter: BoxedFilter) -> Self {
        self.globals.push((order, filter));
        self
    }

    /// Builds the chain, sorting global filters by order.
    pub fn build(mut self) -> FilterChain {
        self.globals.sort_by_key(|(order, _)| *order);
        FilterChain {
            globals: self.globals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_request, ResponseExt};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Filter for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            exchange: &'a mut Exchange,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.log.lock().push(format!("pre:{}", self.name));
                let response = next.run(exchange, request).await;
                self.log.lock().push(format!("post:{}", self.name));
                response
            })
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> BoxedFilter {
        Arc::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    fn ok(_exchange: &Exchange, _request: Request) -> BoxFuture<'static, Response> {
        Box::pin(async { Response::with_body(StatusCode::OK, "text/plain", Bytes::new()) })
    }

    #[tokio::test]
    async fn test_globals_sorted_by_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = FilterChain::builder()
            .global_at(10, recorder("c", &log))
            .global_at(-5, recorder("a", &log))
            .global_at(0, recorder("b", &log))
            .build();

        assert_eq!(chain.filter_names(), vec!["a", "b", "c"]);

        let mut exchange = Exchange::default();
        let response = chain
            .run(&[], &mut exchange, empty_request(Method::GET, "/"), ok)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            *log.lock(),
            vec!["pre:a", "pre:b", "pre:c", "post:c", "post:b", "post:a"]
        );
    }

    #[tokio::test]
    async fn test_route_filters_nested_inside_globals() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = FilterChain::builder()
            .global_at(0, recorder("global", &log))
            .build();
        let route = vec![recorder("r1", &log), recorder("r2", &log)];

        let mut exchange = Exchange::default();
        chain
            .run(&route, &mut exchange, empty_request(Method::GET, "/"), ok)
            .await;

        assert_eq!(
            *log.lock(),
            vec!["pre:global", "pre:r1", "pre:r2", "post:r2", "post:r1", "post:global"]
        );
    }

    #[tokio::test]
    async fn test_equal_orders_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = FilterChain::builder()
            .global_at(1, recorder("first", &log))
            .global_at(1, recorder("second", &log))
            .build();
        assert_eq!(chain.filter_names(), vec!["first", "second"]);
        assert_eq!(chain.len(), 2);
    }
}
