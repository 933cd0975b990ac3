//! Local verification of HMAC-signed JWTs.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Claims carried by a gateway token.
///
/// Only `exp` is required. Absent optional claims decode to empty values and
/// never fail validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Application user id.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Granted roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Issued-at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl TokenClaims {
    /// Creates claims for a subject, issued now and valid for `lifetime`.
    pub fn new(subject: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: Some(subject.into()),
            user_id: None,
            roles: Vec::new(),
            iat: Some(now),
            exp: now.saturating_add(lifetime),
            iss: None,
        }
    }

    /// Sets the user id claim.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the roles claim.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Subject, or "" when absent.
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or_default()
    }

    /// User id, or "" when absent.
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }

    /// Roles joined by ",", or "" when absent.
    pub fn roles_header(&self) -> String {
        self.roles.join(",")
    }
}

/// Verifies tokens against one shared secret.
///
/// Checks, in order: three dot-separated segments, signature, then `exp`
/// strictly after now. No leeway is applied.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Creates a verifier for the given secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verifies a token and returns its claims.
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        let segments = token.split('.').count();
        if token.is_empty() || segments != 3 {
            return Err(AuthError::Malformed(format!("{segments} segments")));
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::Malformed(e.to_string()),
                _ => AuthError::Invalid(e.to_string()),
            },
        )?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }

    /// Returns true if the token verifies.
    pub fn is_valid(&self, token: &str) -> bool {
        self.verify(token).is_ok()
    }

    /// Signs claims with HS256.
    pub fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "palisade-secret-key-for-jwt-authentication-must-be-long-enough";

    fn token_with(secret: &str, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn valid_claims() -> TokenClaims {
        TokenClaims::new("alice", Duration::from_secs(3600))
            .with_user_id("user-456")
            .with_roles(["ROLE_USER", "ROLE_ADMIN"])
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier.sign(&valid_claims()).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.user_id(), "user-456");
        assert_eq!(claims.roles_header(), "ROLE_USER,ROLE_ADMIN");
        assert!(verifier.is_valid(&token));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::new(SECRET);
        let now = Utc::now().timestamp();
        let token = token_with(
            SECRET,
            &serde_json::json!({"sub": "alice", "iat": now - 7200, "exp": now - 3600}),
        );

        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = TokenVerifier::new(SECRET);
        let other = TokenVerifier::new("a-completely-different-secret-that-should-not-work");
        let token = other.sign(&valid_claims()).unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let verifier = TokenVerifier::new(SECRET);
        assert!(matches!(verifier.verify(""), Err(AuthError::Malformed(_))));
        assert!(matches!(
            verifier.verify("this.is.not.a.valid.jwt.token"),
            Err(AuthError::Malformed(_))
        ));
        assert!(!verifier.is_valid("abc.def.ghi"));
    }

    #[test]
    fn test_missing_optional_claims() {
        let verifier = TokenVerifier::new(SECRET);
        let exp = Utc::now().timestamp() + 600;
        let token = token_with(SECRET, &serde_json::json!({"exp": exp}));

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.subject(), "");
        assert_eq!(claims.user_id(), "");
        assert_eq!(claims.roles_header(), "");
    }

    #[test]
    fn test_missing_exp_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = token_with(SECRET, &serde_json::json!({"sub": "alice"}));
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_hs512_accepted() {
        let verifier = TokenVerifier::new(SECRET);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &valid_claims(),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(verifier.is_valid(&token));
    }
}
