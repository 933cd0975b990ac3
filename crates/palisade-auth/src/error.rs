//! Authentication error types.

use thiserror::Error;

/// Result type for credential validation.
pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a credential was rejected.
///
/// Messages are meant for server-side logs. Clients only ever see the fixed
/// message chosen by the filter.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Not three dot-separated segments, or undecodable.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature does not verify against the configured secret.
    #[error("token signature does not verify")]
    InvalidSignature,

    /// `exp` is not strictly after the current time.
    #[error("token has expired")]
    Expired,

    /// Any other verification failure.
    #[error("token validation failed: {0}")]
    Invalid(String),

    /// Introspection endpoint reported `active = false`.
    #[error("token is not active")]
    Inactive,

    /// Introspection call failed, timed out, or returned an unreadable body.
    #[error("introspection request failed: {0}")]
    Introspection(String),

    /// A token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Returns true if the authority could not be consulted at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Introspection(_))
    }
}
