//! Verified tokens and the unverified header view used to pick a key.

use crate::error::ValidationError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::error;

/// A token whose signature and expiry have been verified.
///
/// Holds the payload claims exactly as signed and the raw token text it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    claims: Map<String, Value>,
    source: String,
}

impl AuthToken {
    pub(crate) fn new(claims: Map<String, Value>, source: impl Into<String>) -> Self {
        Self {
            claims,
            source: source.into(),
        }
    }

    /// All payload claims.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// A single claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The raw token this value was verified from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `sub` claim, when it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.claim("sub").and_then(Value::as_str)
    }

    /// The `exp` claim as a point in time, when present and numeric.
    pub fn expires_at(&self) -> Option<SystemTime> {
        let exp = self.claim("exp")?;
        let secs = exp
            .as_u64()
            .or_else(|| exp.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))?;
        UNIX_EPOCH.checked_add(Duration::from_secs(secs))
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }
}

/// Token header fields read without verification.
///
/// Only used to select a key. The declared algorithm is informational; verification
/// relies on the algorithms the selected key allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub kid: Option<String>,
    pub algorithm: Algorithm,
}

impl DecodedHeader {
    /// Decode the header segment of a compact token.
    ///
    /// Fails with [`ValidationError::BadToken`] when the token is not a structurally
    /// valid three-segment envelope with a JSON header, and with
    /// [`ValidationError::ContractViolation`] when the header carries a `kid` that is
    /// not a string.
    pub fn decode(token: &str) -> Result<Self, ValidationError> {
        if token.split('.').count() != 3 {
            return Err(ValidationError::BadToken("jwt malformed".to_string()));
        }
        match jsonwebtoken::decode_header(token) {
            Ok(header) => Ok(Self {
                kid: header.kid,
                algorithm: header.alg,
            }),
            Err(e) => match non_string_kid(token) {
                Some(kind) => {
                    error!(kid_type = kind, "signed token header carries a non-string kid");
                    Err(ValidationError::ContractViolation(format!(
                        "token header key id is {kind}, not a string"
                    )))
                }
                None => Err(ValidationError::BadToken(format!("jwt malformed: {e}"))),
            },
        }
    }
}

/// JSON type of the header `kid` when it is present and neither a string nor null.
///
/// Only consulted after `decode_header` has rejected the header; any decoding failure
/// here leaves the token a plain malformed one.
fn non_string_kid(token: &str) -> Option<&'static str> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let header: Value = serde_json::from_slice(&bytes).ok()?;
    match header.get("kid")? {
        Value::Null | Value::String(_) => None,
        Value::Bool(_) => Some("a boolean"),
        Value::Number(_) => Some("a number"),
        Value::Array(_) => Some("an array"),
        Value::Object(_) => Some("an object"),
    }
}
