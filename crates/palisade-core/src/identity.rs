//! Caller identity resolved by the authentication filters.

use serde::{Deserialize, Serialize};

/// The authenticated caller of one request.
///
/// Identities live only for the duration of one exchange; they are never
/// persisted or shared across requests.
///
/// # Example
///
/// ```rust
/// use palisade_core::Identity;
///
/// let identity = Identity::Jwt {
///     subject: "alice".to_string(),
///     user_id: "user-456".to_string(),
///     roles: vec!["ROLE_USER".to_string()],
/// };
/// assert_eq!(identity.log_id(), "user:user-456");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    /// No credential was verified.
    #[default]
    Anonymous,
    /// Self-contained signed token verified locally.
    Jwt {
        /// `sub` claim.
        subject: String,
        /// `userId` claim, empty when absent.
        user_id: String,
        /// `roles` claim, empty when absent.
        roles: Vec<String>,
    },
    /// Opaque token validated by the introspection authority.
    OAuth2 {
        /// `sub` of the introspection result, empty when absent.
        subject: String,
        /// `client_id` of the introspection result, empty when absent.
        client_id: String,
        /// Space-separated scopes, empty when absent.
        scope: String,
    },
}

impl Identity {
    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains token material.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Anonymous => "anonymous".to_string(),
            Self::Jwt {
                user_id, subject, ..
            } => {
                if user_id.is_empty() {
                    format!("subject:{subject}")
                } else {
                    format!("user:{user_id}")
                }
            }
            Self::OAuth2 { client_id, .. } => format!("client:{client_id}"),
        }
    }

    /// Returns true if a credential was verified.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}
