//! # Bearer Token Validator
//!
//! [`AuthTokenValidator`] turns an `Authorization: Bearer <token>` credential into a
//! verified [`AuthToken`] or a [`ValidationError`].
//!
//! Each call walks the same steps: extract the bearer token, decode the header without
//! verifying it, resolve the signing key by `kid` (refreshing the key cache on a miss),
//! then verify the signature and expiry with the algorithms the key allows. Only the key
//! cache survives between calls.
//!
//! ```no_run
//! use authtoken_validator::{AuthTokenValidator, ValidatorConfig};
//! use http::HeaderMap;
//!
//! let validator = AuthTokenValidator::new(ValidatorConfig::from_env())?;
//! let mut headers = HeaderMap::new();
//! headers.insert("authorization", "Bearer eyJ...".parse()?);
//! match validator.from_headers(&headers) {
//!     Ok(token) => println!("subject: {:?}", token.subject()),
//!     Err(e) => println!("{} ({})", e, e.status()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::ValidatorConfig;
use crate::error::{ConfigError, ValidationError};
use crate::keys::{CachedKey, HttpKeySetFetcher, KeyCache, KeySetFetcher};
use crate::logging::redact_token;
use crate::token::{AuthToken, DecodedHeader};
use crate::verifier::TokenVerifier;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

const AUTHORIZATION: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// Anything that can answer "what is the value of header `name`?".
///
/// Header names are matched case-insensitively.
pub trait CredentialCarrier {
    fn header(&self, name: &str) -> Option<&str>;
}

impl CredentialCarrier for http::HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }
}

impl CredentialCarrier for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> CredentialCarrier for [(K, V)] {
    fn header(&self, name: &str) -> Option<&str> {
        find_pair(self, name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> CredentialCarrier for [(K, V); N] {
    fn header(&self, name: &str) -> Option<&str> {
        find_pair(self, name)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> CredentialCarrier for Vec<(K, V)> {
    fn header(&self, name: &str) -> Option<&str> {
        find_pair(self, name)
    }
}

fn find_pair<'a, K: AsRef<str>, V: AsRef<str>>(pairs: &'a [(K, V)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k.as_ref().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_ref())
}

/// Extract the token from an `Authorization` value of the form `Bearer <token>`.
///
/// The scheme is case-sensitive and followed by exactly one space; the token must be
/// non-empty and on a single line.
pub fn bearer_token<C: CredentialCarrier + ?Sized>(carrier: &C) -> Option<&str> {
    carrier
        .header(AUTHORIZATION)?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty() && !token.contains(['\r', '\n']))
}

/// Validates bearer tokens against an issuer's published signing keys.
///
/// `Send + Sync`; share one instance (or clones of it) across threads so they share one
/// key cache.
#[derive(Debug, Clone)]
pub struct AuthTokenValidator {
    config: ValidatorConfig,
    cache: Arc<KeyCache>,
    verifier: TokenVerifier,
}

impl AuthTokenValidator {
    /// Build a validator that fetches keys from the configured issuer over HTTP.
    pub fn new(config: ValidatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fetcher = HttpKeySetFetcher::from_config(&config)?;
        debug!(
            issuer = config.issuer_uri(),
            entry_url = fetcher.entry_url(),
            "created token validator"
        );
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Build a validator around a custom key set source.
    pub fn with_fetcher(config: ValidatorConfig, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let cache = KeyCache::new(fetcher, config.max_key_age_duration())
            .with_min_refresh_interval(config.min_refresh_interval_duration());
        Self::with_cache(config, Arc::new(cache))
    }

    /// Build a validator over an existing, possibly shared, key cache.
    ///
    /// The cache's own TTL and refresh window apply; the config only supplies the
    /// verification settings.
    pub fn with_cache(config: ValidatorConfig, cache: Arc<KeyCache>) -> Self {
        let verifier = TokenVerifier::new(config.max_clock_skew_duration());
        Self {
            config,
            cache,
            verifier,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Validate the bearer credential carried by `carrier`.
    ///
    /// A missing or malformed `Authorization` value fails with
    /// [`ValidationError::NoAuthorizationProvided`] without touching the network.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_headers<C: CredentialCarrier + ?Sized>(
        &self,
        carrier: &C,
    ) -> Result<AuthToken, ValidationError> {
        match bearer_token(carrier) {
            Some(token) => self.from_signature(token),
            None => {
                debug!("no bearer credential presented");
                Err(ValidationError::NoAuthorizationProvided)
            }
        }
    }

    /// Validate a bare compact token.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_signature(&self, token: &str) -> Result<AuthToken, ValidationError> {
        let result = self.verify_token(token);
        match &result {
            Ok(_) => debug!(token = %redact_token(token), "token verified"),
            Err(e @ ValidationError::PublicKeyLookupFailed(_)) => {
                warn!(token = %redact_token(token), error = %e, "token rejected")
            }
            Err(e) => debug!(
                token = %redact_token(token),
                kind = e.kind().as_str(),
                error = %e,
                "token rejected"
            ),
        }
        result
    }

    /// Refresh the key cache once and report whether the issuer's keys are reachable.
    pub fn validate_configuration(&self) -> Result<(), ValidationError> {
        self.cache
            .refresh()
            .map_err(ValidationError::PublicKeyLookupFailed)
    }

    fn verify_token(&self, token: &str) -> Result<AuthToken, ValidationError> {
        let header = DecodedHeader::decode(token)?;
        let kid = header.kid.ok_or_else(|| {
            error!(
                algorithm = ?header.algorithm,
                "signed token header carries no kid"
            );
            ValidationError::ContractViolation("token header has no key id".to_string())
        })?;

        let key = self.resolve_key(&kid)?;
        let claims = self.verifier.verify(token, &key)?;
        Ok(AuthToken::new(claims, token))
    }

    fn resolve_key(&self, kid: &str) -> Result<Arc<CachedKey>, ValidationError> {
        if let Some(key) = self.cache.lookup(kid) {
            return Ok(key);
        }
        if self.cache.refresh_suppressed_for(kid) {
            debug!(kid, "unknown kid inside minimum refresh interval");
            return Err(ValidationError::PublicKeyNotFound(kid.to_string()));
        }

        self.cache
            .refresh()
            .map_err(ValidationError::PublicKeyLookupFailed)?;

        self.cache
            .get_refreshed(kid)
            .ok_or_else(|| ValidationError::PublicKeyNotFound(kid.to_string()))
    }
}
