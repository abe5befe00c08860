//! Conversion of published JWKs into verification key material.

use crate::error::KeyError;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

const HMAC_ALGORITHMS: &[Algorithm] = &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// A verification-ready key together with the signature algorithms it may be used with.
///
/// The source JWK is retained so that a refresh can tell whether a key published under a
/// known kid is unchanged and skip re-conversion.
pub struct KeyMaterial {
    jwk: Jwk,
    decoding_key: DecodingKey,
    algorithms: Vec<Algorithm>,
}

impl KeyMaterial {
    /// Convert one key set entry.
    ///
    /// # Errors
    ///
    /// - [`KeyError::MissingKeyId`] if the JWK carries no `kid`
    /// - [`KeyError::NoSigningAlgorithm`] if the key type (or its declared `alg`) permits
    ///   no signature algorithm this crate verifies
    /// - [`KeyError::Conversion`] if the key parameters are not valid key material
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, KeyError> {
        let kid = jwk.common.key_id.clone().ok_or(KeyError::MissingKeyId)?;

        let algorithms = allowed_algorithms(jwk);
        if algorithms.is_empty() {
            return Err(KeyError::NoSigningAlgorithm { kid });
        }

        let decoding_key =
            DecodingKey::from_jwk(jwk).map_err(|source| KeyError::Conversion { kid, source })?;

        Ok(Self {
            jwk: jwk.clone(),
            decoding_key,
            algorithms,
        })
    }

    pub fn kid(&self) -> Option<&str> {
        self.jwk.common.key_id.as_deref()
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Allowed signature algorithms, in preference order. Never empty.
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kid", &self.kid())
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

/// Signature algorithms a JWK may verify.
///
/// A declared `alg` narrows the result to that single algorithm, provided it belongs to
/// the key type's family; otherwise every algorithm of the family is allowed. Keys whose
/// type or curve has no supported signature algorithm yield an empty list.
pub fn allowed_algorithms(jwk: &Jwk) -> Vec<Algorithm> {
    let family = family_algorithms(&jwk.algorithm);

    match jwk.common.key_algorithm.as_ref() {
        Some(declared) => match signing_algorithm(declared) {
            Some(alg) if family.contains(&alg) => vec![alg],
            _ => Vec::new(),
        },
        None => family,
    }
}

fn family_algorithms(params: &AlgorithmParameters) -> Vec<Algorithm> {
    match params {
        AlgorithmParameters::RSA(_) => RSA_ALGORITHMS.to_vec(),
        AlgorithmParameters::OctetKey(_) => HMAC_ALGORITHMS.to_vec(),
        AlgorithmParameters::EllipticCurve(ec) => match ec.curve {
            EllipticCurve::P256 => vec![Algorithm::ES256],
            EllipticCurve::P384 => vec![Algorithm::ES384],
            // P-521 has no verifier in jsonwebtoken; Ed25519 is not an EC curve here.
            _ => Vec::new(),
        },
        AlgorithmParameters::OctetKeyPair(okp) => match okp.curve {
            EllipticCurve::Ed25519 => vec![Algorithm::EdDSA],
            _ => Vec::new(),
        },
        #[allow(unreachable_patterns)]
        _ => Vec::new(),
    }
}

fn signing_algorithm(alg: &KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        // Key-encryption algorithms (RSA1_5, RSA-OAEP, ...) never verify signatures.
        _ => None,
    }
}
