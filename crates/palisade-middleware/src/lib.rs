//! # Palisade Middleware
//!
//! The gateway's filter chain engine and its filters.
//!
//! Every request runs through an onion of filters around the backend
//! dispatch. Global filters apply to every route and are ordered by an
//! integer; a route's own filters form one block nested inside them.
//!
//! ```text
//! Request → CorrelationId → Logging → Metrics → RateLimit → RequestHeaders → ResponseHeaders → [route filters] → Dispatch
//!                                                                                                                  ↓
//! Response ← CorrelationId ← Logging ← Metrics ← RateLimit ← RequestHeaders ← ResponseHeaders ← [route filters] ←─┘
//! ```
//!
//! Any filter may short-circuit by returning its own response. Filters that
//! already ran still see that response on the way out, so a 401 produced by
//! an authentication filter is hardened and logged like any other.
//!
//! ## Example
//!
//! ```
//! use palisade_middleware::filters::{CorrelationIdFilter, ResponseHeaderFilter};
//! use palisade_middleware::FilterChain;
//!
//! let chain = FilterChain::builder()
//!     .global(ResponseHeaderFilter::new())
//!     .global(CorrelationIdFilter::new())
//!     .build();
//!
//! assert_eq!(chain.filter_names(), vec!["correlation_id", "response_headers"]);
//! ```

#![doc(html_root_url = "https://docs.rs/palisade-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod filter;
pub mod filters;
pub mod types;

pub use chain::{BoxedFilter, FilterChain, FilterChainBuilder};
pub use context::Exchange;
pub use filter::{BoxFuture, Dispatch, Filter, FnFilter, GlobalFilter, Next};
pub use types::{empty_request, Request, Response, ResponseExt};
