//! OAuth2 token introspection (RFC 7662).

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::config::OAuth2Config;
use crate::error::{AuthError, AuthResult};

/// Body returned by the introspection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    #[serde(default)]
    pub active: bool,
    /// Subject.
    #[serde(rename = "sub", default)]
    pub subject: Option<String>,
    /// Client the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Space-separated scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Token type hint.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience; a single string is accepted as a one-element list.
    #[serde(rename = "aud", default, deserialize_with = "one_or_many")]
    pub audience: Vec<String>,
}

impl IntrospectionResponse {
    /// Returns true if `exp` is present and already in the past.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(aud)) => vec![aud],
        Some(OneOrMany::Many(aud)) => aud,
    })
}

/// Client for the introspection endpoint.
///
/// Each call is exactly one round trip with no retry and no caching. A
/// transport failure, a non-2xx status and an unreadable body all surface as
/// [`AuthError::Introspection`].
#[derive(Debug, Clone)]
pub struct IntrospectionClient {
    http: reqwest::Client,
    config: OAuth2Config,
}

impl IntrospectionClient {
    /// Creates a client with the configured timeouts.
    pub fn new(config: OAuth2Config) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AuthError::Introspection(format!("failed to build client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Calls the endpoint and returns its raw answer.
    pub async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        let response = self
            .http
            .post(&self.config.introspection_uri)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("token", token)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(error = %e, "Token introspection request failed");
                AuthError::Introspection(e.to_string())
            })?;

        response.json::<IntrospectionResponse>().await.map_err(|e| {
            warn!(error = %e, "Token introspection returned an unreadable body");
            AuthError::Introspection(e.to_string())
        })
    }

    /// Introspects a token and applies the activity and expiry checks.
    pub async fn validate(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        let result = self.introspect(token).await?;

        if !result.active {
            return Err(AuthError::Inactive);
        }
        if result.is_expired_at(Utc::now().timestamp()) {
            return Err(AuthError::Expired);
        }

        debug!(
            subject = result.subject.as_deref().unwrap_or_default(),
            client_id = result.client_id.as_deref().unwrap_or_default(),
            "OAuth2 token validated"
        );
        Ok(result)
    }
}
