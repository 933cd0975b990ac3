//! Palisade gateway server.
//!
//! Accepts client requests, matches them to a route, runs the global and
//! route filters around the backend dispatch and writes the result back.
//!
//! ```text
//!  client ──► GatewayServer (hyper) ──► Gateway::handle
//!                                         │
//!                       admin endpoints ◄─┤
//!                                         ▼
//!                                     RouteTable ──► 404
//!                                         │
//!                                         ▼
//!             correlation_id ► logging ► metrics ► rate_limit ► request_headers
//!                                         ► response_headers ► route filters
//!                                         │
//!                                         ▼
//!                        circuit breaker ► Dispatcher ──► backend
//!                                │
//!                                └─► fallback (503)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use palisade_config::GatewayConfig;
//! use palisade_gateway::{GatewayServer, ShutdownSignal};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load(None::<&str>)?;
//! let server = GatewayServer::new(&config)?;
//! server.run(ShutdownSignal::with_os_signals()).await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/palisade-gateway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod admin;
pub mod api_docs;
pub mod circuit_breaker;
pub mod error;
pub mod fallback;
pub mod health;
pub mod proxy;
pub mod registry;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::{ServerError, ServerResult};
pub use fallback::{fallback_response, FallbackBody};
pub use health::{HealthChecker, HealthResponse, HealthStatus, ServiceHealth};
pub use proxy::{Dispatcher, JsonReply};
pub use registry::{FilterContext, FilterRegistry, SharedServices};
pub use routes::{Route, RouteTable};
pub use server::{Gateway, GatewayServer};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

/// Gateway version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
