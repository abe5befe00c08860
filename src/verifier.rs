//! Signature and expiry verification against a resolved key.

use crate::error::ValidationError;
use crate::keys::CachedKey;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, Validation};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

/// Verifies tokens with the algorithms a key allows, never the ones a header declares.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    leeway_secs: u64,
}

impl TokenVerifier {
    /// `max_clock_skew` is tolerated past `exp`. `nbf` is not checked.
    pub fn new(max_clock_skew: Duration) -> Self {
        Self {
            leeway_secs: max_clock_skew.as_secs(),
        }
    }

    pub fn leeway_secs(&self) -> u64 {
        self.leeway_secs
    }

    /// Verify `token` with `key` and return its payload claims.
    pub fn verify(&self, token: &str, key: &CachedKey) -> Result<Map<String, Value>, ValidationError> {
        let algorithms = key.algorithms();
        let Some(&first) = algorithms.first() else {
            return Err(ValidationError::BadToken("invalid algorithm".to_string()));
        };

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms.to_vec();
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<Map<String, Value>>(token, key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| ValidationError::BadToken(describe(&e)))
    }
}

fn describe(error: &jsonwebtoken::errors::Error) -> String {
    match error.kind() {
        JwtErrorKind::ExpiredSignature => "jwt expired".to_string(),
        JwtErrorKind::InvalidSignature => "invalid signature".to_string(),
        JwtErrorKind::InvalidAlgorithm => "invalid algorithm".to_string(),
        JwtErrorKind::InvalidToken
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => "jwt malformed".to_string(),
        _ => error.to_string(),
    }
}
