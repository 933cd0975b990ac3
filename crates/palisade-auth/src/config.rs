//! Credential strategy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Local token verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Shared HMAC signing secret.
    #[serde(skip_serializing)]
    pub secret: String,
    /// Lifetime of tokens issued by the gateway, in milliseconds.
    pub expiration_ms: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiration_ms: 86_400_000, // 24 hours
        }
    }
}

impl JwtConfig {
    /// Creates a configuration with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Returns the token lifetime.
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    /// Returns true if a secret is configured.
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }
}

/// OAuth2 token introspection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2Config {
    /// Introspection endpoint.
    pub introspection_uri: String,
    /// Gateway's own client id.
    pub client_id: String,
    /// Gateway's own client secret.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Issuer of the tokens.
    pub issuer_uri: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            introspection_uri: "http://localhost:9000/oauth2/introspect".to_string(),
            client_id: "api-gateway-client".to_string(),
            client_secret: "gateway-secret".to_string(),
            issuer_uri: "http://localhost:9000".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
        }
    }
}

impl OAuth2Config {
    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the bound on one whole introspection round trip.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms + self.read_timeout_ms)
    }
}
