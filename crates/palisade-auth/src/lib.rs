//! # Palisade Auth
//!
//! The two credential strategies used by the gateway's authentication filters.
//!
//! - [`TokenVerifier`]: local, synchronous verification of HMAC-signed JWTs.
//!   No I/O.
//! - [`IntrospectionClient`]: remote validation of opaque tokens against an
//!   OAuth2 introspection endpoint, one round trip per call with a bounded
//!   timeout.
//!
//! Both return [`AuthError`] on failure. Callers map every error to a 401
//! with a fixed message; the error text is for logs only.
//!
//! ## Example
//!
//! ```
//! use palisade_auth::{TokenClaims, TokenVerifier};
//! use std::time::Duration;
//!
//! let verifier = TokenVerifier::new("a-long-enough-shared-secret-for-hs256");
//! let claims = TokenClaims::new("alice", Duration::from_secs(60))
//!     .with_user_id("user-456")
//!     .with_roles(["ROLE_USER"]);
//!
//! let token = verifier.sign(&claims).unwrap();
//! let verified = verifier.verify(&token).unwrap();
//! assert_eq!(verified.subject(), "alice");
//! ```

#![doc(html_root_url = "https://docs.rs/palisade-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod introspection;
pub mod token;

pub use config::{JwtConfig, OAuth2Config};
pub use error::{AuthError, AuthResult};
pub use introspection::{IntrospectionClient, IntrospectionResponse};
pub use token::{TokenClaims, TokenVerifier};
