//! Core filter trait and continuation.
//!
//! A [`Filter`] receives the [`Exchange`], the request and a [`Next`]
//! continuation. It may:
//!
//! - mutate the request and call `next.run(..)`,
//! - call `next.run(..)` and mutate the response it returns,
//! - return its own response without calling `next`, which short-circuits
//!   every filter after it and the backend dispatch.
//!
//! # Example
//!
//! ```
//! use palisade_middleware::{BoxFuture, Exchange, Filter, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Filter for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         exchange: &'a mut Exchange,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(exchange, request).await;
//!             tracing::debug!(elapsed_ms = exchange.elapsed().as_millis() as u64, "done");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::Exchange;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stage of the filter chain.
pub trait Filter: Send + Sync + 'static {
    /// Returns the filter name, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request.
    ///
    /// `next` can only be run once; not running it short-circuits the chain.
    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// A filter that applies to every route.
///
/// Lower orders run first on the way in and last on the way out.
pub trait GlobalFilter: Filter {
    /// Position of this filter among the global filters.
    fn order(&self) -> i32;
}

/// Terminal step of a chain: the backend dispatch.
///
/// It reads what it needs from the exchange up front; the future it returns
/// owns its state, so the exchange stays free for the post phase of every
/// filter.
pub type Dispatch<'a> =
    Box<dyn FnOnce(&Exchange, Request) -> BoxFuture<'static, Response> + Send + 'a>;

/// Continuation that invokes the rest of the chain.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        filter: &'a dyn Filter,
        next: Box<Next<'a>>,
    },
    Dispatch(Dispatch<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `filter` and then `next`.
    pub(crate) fn new(filter: &'a dyn Filter, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                filter,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that dispatches the request.
    pub fn dispatch<F>(f: F) -> Self
    where
        F: FnOnce(&Exchange, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Dispatch(Box::new(f)),
        }
    }

    /// Invokes the next filter, or the dispatch at the end of the chain.
    ///
    /// Consumes `self` so it can only run once. The exchange is only borrowed
    /// for the returned future, so the caller can use it again afterwards.
    pub fn run<'e>(self, exchange: &'e mut Exchange, request: Request) -> BoxFuture<'e, Response>
    where
        'a: 'e,
    {
        match self.inner {
            NextInner::Chain { filter, next } => filter.process(exchange, request, *next),
            NextInner::Dispatch(dispatch) => dispatch(exchange, request),
        }
    }
}

/// A filter built from a closure.
///
/// ```
/// use palisade_middleware::FnFilter;
///
/// let filter = FnFilter::new("noop", |exchange, request, next| {
///     Box::pin(async move { next.run(exchange, request).await })
/// });
/// ```
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F>
where
    F: for<'a> Fn(&'a mut Exchange, Request, Next<'a>) -> BoxFuture<'a, Response>
        + Send
        + Sync
        + 'static,
{
    /// Creates a closure-based filter.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: for<'a> Fn(&'a mut Exchange, Request, Next<'a>) -> BoxFuture<'a, Response>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        (self.func)(exchange, request, next)
    }
}
