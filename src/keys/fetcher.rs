//! Fetching the issuer's published key set over HTTP, directly or via OpenID discovery.

use crate::config::{KeySetLocation, ValidatorConfig};
use crate::error::{ConfigError, FetchError};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of the issuer's published key set.
///
/// The key cache calls [`fetch`](KeySetFetcher::fetch) at most once at a time per cache,
/// but implementations shared between caches must tolerate concurrent calls.
pub trait KeySetFetcher: Send + Sync {
    /// Retrieve the full current key set.
    fn fetch(&self) -> Result<JwkSet, FetchError>;
}

/// Subset of the OpenID provider metadata we need.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: Option<String>,
}

/// Fetches the key set over HTTP with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::blocking::Client,
    entry_url: String,
    location: KeySetLocation,
}

impl HttpKeySetFetcher {
    /// Fetcher for an explicit entry URL.
    ///
    /// For [`KeySetLocation::Direct`] `entry_url` is the key set itself; for
    /// [`KeySetLocation::Discovery`] it is the discovery document.
    pub fn new(
        entry_url: impl Into<String>,
        location: KeySetLocation,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            client,
            entry_url: entry_url.into(),
            location,
        })
    }

    pub fn from_config(config: &ValidatorConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.key_set_entry_url(),
            config.location(),
            config.fetch_timeout_duration(),
        )
    }

    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }

    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json().map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn resolve_jwks_uri(&self) -> Result<String, FetchError> {
        let body = self.get_json(&self.entry_url)?;
        let document: DiscoveryDocument =
            serde_json::from_value(body).map_err(|e| FetchError::Malformed {
                url: self.entry_url.clone(),
                message: e.to_string(),
            })?;

        match document.jwks_uri {
            Some(uri) if !uri.trim().is_empty() => {
                debug!(jwks_uri = %uri, "resolved key set through discovery");
                Ok(uri)
            }
            _ => Err(FetchError::MissingJwksUri {
                url: self.entry_url.clone(),
            }),
        }
    }
}

impl KeySetFetcher for HttpKeySetFetcher {
    fn fetch(&self) -> Result<JwkSet, FetchError> {
        let url = match self.location {
            KeySetLocation::Direct => self.entry_url.clone(),
            KeySetLocation::Discovery => self.resolve_jwks_uri()?,
        };
        let body = self.get_json(&url)?;
        parse_key_set(&url, &body)
    }
}

/// Parse a key set document, dropping entries that are not valid JWKs.
///
/// A document without a `keys` array is malformed as a whole.
pub fn parse_key_set(url: &str, body: &serde_json::Value) -> Result<JwkSet, FetchError> {
    let entries = body
        .get("keys")
        .and_then(|v| v.as_array())
        .ok_or_else(|| FetchError::Malformed {
            url: url.to_string(),
            message: "missing \"keys\" array".to_string(),
        })?;

    let keys = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Jwk>(entry.clone()) {
            Ok(jwk) => Some(jwk),
            Err(e) => {
                let kid = entry.get("kid").and_then(|v| v.as_str()).unwrap_or("<none>");
                warn!(kid, error = %e, "skipping invalid JWK in key set");
                None
            }
        })
        .collect();

    Ok(JwkSet { keys })
}
