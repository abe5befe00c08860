//! # authtoken-validator
//!
//! Validation of bearer JSON Web Tokens against the signing keys an issuer publishes as a
//! JWK set.
//!
//! ## Overview
//!
//! A service receives `Authorization: Bearer <token>` and needs to know whether the token
//! was issued by its auth service and has not expired. [`AuthTokenValidator`] answers
//! that with either a verified [`AuthToken`] or a [`ValidationError`] carrying the HTTP
//! status a transport layer should reply with.
//!
//! Signing keys are fetched from `<issuer>/.well-known/jwks` (or through OpenID
//! discovery) and cached by `kid`. A token signed with an unknown or expired key
//! triggers one refresh; concurrent requests that need the same refresh share a single
//! fetch.
//!
//! ## Architecture
//!
//! - **[`config`]** - issuer, key cache TTL, clock skew and fetch settings
//! - **[`keys`]** - key set fetching, JWK conversion and the TTL key cache
//! - **[`token`]** - verified tokens and the unverified header view
//! - **[`verifier`]** - signature and expiry checks against one resolved key
//! - **[`validator`]** - the request-facing facade and credential carriers
//! - **[`error`]** - the closed error taxonomy
//! - **[`logging`]** - `tracing` subscriber setup for binaries
//! - **[`cli`]** - the `authtoken-check` operator tool
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Validator as AuthTokenValidator
//!     participant Cache as KeyCache
//!     participant Issuer as Key Server
//!
//!     Caller->>Validator: from_headers(headers)
//!     Validator->>Validator: extract bearer, decode header (kid)
//!     Validator->>Cache: lookup(kid)
//!     alt miss or expired
//!         Validator->>Cache: refresh()
//!         Cache->>Issuer: GET /.well-known/jwks
//!         Issuer-->>Cache: JWK set
//!         Cache->>Cache: swap in new key map
//!     end
//!     Validator->>Validator: verify signature + exp
//!     Validator-->>Caller: AuthToken | ValidationError
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use authtoken_validator::{AuthTokenValidator, ValidatorConfig};
//! use std::time::Duration;
//!
//! let config = ValidatorConfig::default()
//!     .issuer("https://auth.example.com/core")
//!     .max_key_age(Duration::from_secs(3600));
//! let validator = AuthTokenValidator::new(config)?;
//!
//! // Fail fast at startup if the key server is unreachable.
//! validator.validate_configuration()?;
//!
//! let headers = [("authorization", "Bearer eyJhbGciOi...")];
//! match validator.from_headers(&headers) {
//!     Ok(token) => println!("hello {:?}", token.subject()),
//!     Err(e) => eprintln!("{} -> {}", e.status(), e),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod token;
pub mod validator;
pub mod verifier;

pub use config::{KeySetLocation, ValidatorConfig};
pub use error::{ConfigError, ErrorKind, FetchError, KeyError, ValidationError};
pub use keys::{CachedKey, HttpKeySetFetcher, KeyCache, KeyCacheStats, KeySetFetcher};
pub use token::AuthToken;
pub use validator::{bearer_token, AuthTokenValidator, CredentialCarrier};
pub use verifier::TokenVerifier;
