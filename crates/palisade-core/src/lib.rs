//! # Palisade Core
//!
//! Core types shared by every crate of the Palisade API gateway.
//!
//! - [`GatewayError`] - Error taxonomy with HTTP status mapping
//! - [`ErrorBody`] - Structured JSON body written on every terminal error path
//! - [`CorrelationId`] - Per-request correlation identifier
//! - [`Identity`] - Caller identity resolved by the authentication filters
//! - [`headers`] - Well-known header names used across the gateway

#![doc(html_root_url = "https://docs.rs/palisade-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
pub mod headers;
mod identity;

pub use context::CorrelationId;
pub use error::{service_display_name, ErrorBody, ErrorCategory, GatewayError, GatewayResult};
pub use identity::Identity;
