//! # Error Types
//!
//! Every failure the validator can report is one variant of a closed enum.
//!
//! - [`ValidationError`] is what callers of
//!   [`AuthTokenValidator`](crate::AuthTokenValidator) see. Four of its kinds are
//!   user-facing outcomes with a transport status attached; `ContractViolation` marks a
//!   broken protocol invariant and is never a user error.
//! - [`FetchError`] describes why a key set could not be retrieved. It is shared
//!   between every caller that waited on the same refresh, hence the `Arc` in
//!   [`ValidationError::PublicKeyLookupFailed`].
//! - [`KeyError`] is produced by the key material converter for a single JWK.
//! - [`ConfigError`] is returned when a validator is built from an unusable
//!   configuration.
//!
//! | kind | status | user error |
//! |------|--------|------------|
//! | `NoAuthorizationProvided` | 401 | yes |
//! | `BadToken` | 401 | yes |
//! | `PublicKeyNotFound` | 403 | yes |
//! | `PublicKeyLookupFailed` | 503 | no |
//! | `ContractViolation` | 500 | no |

use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Reasons a token could not be turned into an [`AuthToken`](crate::AuthToken).
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// No `Authorization: Bearer <token>` credential was presented.
    #[error("An authorization method wasn't provided")]
    NoAuthorizationProvided,

    /// The token is malformed, its signature does not verify, or it has expired.
    #[error("{0}")]
    BadToken(String),

    /// The token names a key identifier that the freshly refreshed key set lacks.
    #[error("Public key \"{0}\" not found")]
    PublicKeyNotFound(String),

    /// The key set could not be fetched. The underlying cause is kept as the source.
    #[error("An error occurred while looking up public keys. Check auth service configuration.")]
    PublicKeyLookupFailed(#[source] Arc<FetchError>),

    /// A protocol invariant did not hold (e.g. a signed envelope without a key id).
    #[error("token validation contract violated: {0}")]
    ContractViolation(String),
}

/// Discriminant shared by all [`ValidationError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoAuthorizationProvided,
    BadToken,
    PublicKeyNotFound,
    PublicKeyLookupFailed,
    ContractViolation,
}

impl ErrorKind {
    /// Stable name of the kind, suitable for logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoAuthorizationProvided => "NoAuthorizationProvided",
            ErrorKind::BadToken => "BadToken",
            ErrorKind::PublicKeyNotFound => "PublicKeyNotFound",
            ErrorKind::PublicKeyLookupFailed => "PublicKeyLookupFailed",
            ErrorKind::ContractViolation => "ContractViolation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::NoAuthorizationProvided => ErrorKind::NoAuthorizationProvided,
            ValidationError::BadToken(_) => ErrorKind::BadToken,
            ValidationError::PublicKeyNotFound(_) => ErrorKind::PublicKeyNotFound,
            ValidationError::PublicKeyLookupFailed(_) => ErrorKind::PublicKeyLookupFailed,
            ValidationError::ContractViolation(_) => ErrorKind::ContractViolation,
        }
    }

    /// HTTP status a transport layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            ValidationError::NoAuthorizationProvided | ValidationError::BadToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            ValidationError::PublicKeyNotFound(_) => StatusCode::FORBIDDEN,
            ValidationError::PublicKeyLookupFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ValidationError::ContractViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The fetch failure behind a [`ValidationError::PublicKeyLookupFailed`].
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            ValidationError::PublicKeyLookupFailed(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// `true` when the caller's credential is at fault rather than this service or
    /// its key server.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ValidationError::NoAuthorizationProvided
                | ValidationError::BadToken(_)
                | ValidationError::PublicKeyNotFound(_)
        )
    }
}

/// Failure to retrieve the published key set.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("response from {url} is malformed: {message}")]
    Malformed { url: String, message: String },

    #[error("discovery document at {url} has no usable jwks_uri")]
    MissingJwksUri { url: String },

    /// The refresh that this caller waited on ended without publishing an outcome.
    #[error("key set refresh was abandoned before completing")]
    Abandoned,
}

/// Failure to convert a single published JWK into verification key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("JWK has no key identifier")]
    MissingKeyId,

    #[error("JWK {kid:?} permits no supported signature algorithm")]
    NoSigningAlgorithm { kid: String },

    #[error("JWK {kid:?} cannot be converted: {source}")]
    Conversion {
        kid: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Invalid validator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("issuer {issuer:?} is not a valid URL: {source}")]
    InvalidIssuer {
        issuer: String,
        #[source]
        source: url::ParseError,
    },

    #[error("issuer {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("cannot build key set HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
