//! Path-based API versioning.
//!
//! `/api/v2/users/1` is forwarded as `/api/users/1` with `X-API-Version: v2`.
//! Paths without a version segment pass through untouched.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, Next};
use crate::filters::{insert_str, rewrite_path};
use crate::types::{Request, Response};
use palisade_core::headers;
use tracing::debug;

/// Route filter stripping a `vN` segment after `/api/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiVersionFilter;

impl ApiVersionFilter {
    /// Creates the filter.
    pub fn new() -> Self {
        Self
    }

    /// Splits `/api/<vN>/<rest>` into the version and the unversioned path.
    pub fn split_version(path: &str) -> Option<(&str, String)> {
        let (version, rest) = path.strip_prefix("/api/")?.split_once('/')?;
        let digits = version.strip_prefix('v')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || rest.is_empty() {
            return None;
        }
        Some((version, format!("/api/{rest}")))
    }
}

impl Filter for ApiVersionFilter {
    fn name(&self) -> &'static str {
        "api_version"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let original = request.uri().path().to_string();
            if let Some((version, rewritten)) = Self::split_version(&original) {
                debug!(
                    correlation_id = %exchange.correlation_id(),
                    from = %original,
                    to = %rewritten,
                    version,
                    "API version rewrite"
                );
                insert_str(request.headers_mut(), &headers::API_VERSION, version);
                rewrite_path(&mut request, &rewritten);
            }
            next.run(exchange, request).await
        })
    }
}
