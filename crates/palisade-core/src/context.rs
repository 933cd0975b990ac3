//! Correlation identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier that ties together the logs of one request across the gateway
/// and the backend services.
///
/// Inbound ids are accepted verbatim so that a caller's own id survives the hop;
/// generated ids are UUID v7, which sort by creation time.
///
/// # Example
///
/// ```
/// use palisade_core::CorrelationId;
///
/// let generated = CorrelationId::new();
/// assert_eq!(generated.as_str().len(), 36);
///
/// let inbound = CorrelationId::from_header("abc-123").unwrap();
/// assert_eq!(inbound.as_str(), "abc-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a new correlation id using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Accepts an inbound header value.
    ///
    /// Returns `None` for blank values so the caller can generate a fresh id.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_blank_header_rejected() {
        assert!(CorrelationId::from_header("").is_none());
        assert!(CorrelationId::from_header("   ").is_none());
    }

    #[test]
    fn test_header_is_trimmed() {
        let id = CorrelationId::from_header("  req-42 ").unwrap();
        assert_eq!(id.to_string(), "req-42");
    }
}
