//! Drops leading path segments before dispatch.

use crate::context::Exchange;
use crate::filter::{BoxFuture, Filter, Next};
use crate::filters::rewrite_path;
use crate::types::{Request, Response};

/// Route filter removing the first `parts` path segments.
#[derive(Debug, Clone, Copy)]
pub struct StripPrefixFilter {
    parts: usize,
}

impl StripPrefixFilter {
    /// Creates the filter.
    pub fn new(parts: usize) -> Self {
        Self { parts }
    }

    /// Returns `path` without its first `parts` segments; "/" when none remain.
    pub fn strip(&self, path: &str) -> String {
        let rest: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .skip(self.parts)
            .collect();

        let mut stripped = format!("/{}", rest.join("/"));
        if path.ends_with('/') && stripped.len() > 1 {
            stripped.push('/');
        }
        stripped
    }
}

impl Filter for StripPrefixFilter {
    fn name(&self) -> &'static str {
        "strip_prefix"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if self.parts > 0 {
                let stripped = self.strip(request.uri().path());
                rewrite_path(&mut request, &stripped);
            }
            next.run(exchange, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip() {
        let filter = StripPrefixFilter::new(1);
        assert_eq!(filter.strip("/api/users/1"), "/users/1");
        assert_eq!(filter.strip("/api/users/"), "/users/");
        assert_eq!(filter.strip("/api"), "/");
        assert_eq!(StripPrefixFilter::new(2).strip("/api/users/1"), "/1");
        assert_eq!(StripPrefixFilter::new(5).strip("/api/users/1"), "/");
        assert_eq!(StripPrefixFilter::new(0).strip("/api"), "/api");
    }
}
