//! # Validator Configuration
//!
//! Construction-time settings for an [`AuthTokenValidator`](crate::AuthTokenValidator).
//! A configuration is immutable once a validator has been built from it.
//!
//! ## Environment Variables
//!
//! [`ValidatorConfig::from_env()`] reads the following variables. Unset or unparsable
//! values fall back to the defaults.
//!
//! | variable | meaning | default |
//! |----------|---------|---------|
//! | `AUTHTOKEN_ISSUER` | issuer base URI | `https://auth.brightspace.com/core` |
//! | `AUTHTOKEN_MAX_KEY_AGE` | key cache TTL, seconds | `18000` (5 hours) |
//! | `AUTHTOKEN_MAX_CLOCK_SKEW` | tolerated clock skew on `exp`, seconds | `300` |
//! | `AUTHTOKEN_DISCOVERY` | resolve the key set through OpenID discovery | `false` |
//! | `AUTHTOKEN_FETCH_TIMEOUT` | key set HTTP timeout, seconds (`0` disables) | `10` |
//! | `AUTHTOKEN_MIN_REFRESH_INTERVAL` | seconds during which an unknown kid does not trigger another fetch | `0` |
//!
//! ## Usage
//!
//! ```rust
//! use authtoken_validator::ValidatorConfig;
//! use std::time::Duration;
//!
//! let config = ValidatorConfig::default()
//!     .issuer("https://auth.example.com/core/")
//!     .max_key_age(Duration::from_secs(3600));
//! assert_eq!(config.issuer_uri(), "https://auth.example.com/core");
//! ```

use crate::error::ConfigError;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ISSUER: &str = "https://auth.brightspace.com/core";
pub const DEFAULT_MAX_KEY_AGE: Duration = Duration::from_secs(5 * 60 * 60);
pub const DEFAULT_MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the key set relative to the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks";
/// Path of the OpenID discovery document relative to the issuer.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Where the key set fetcher looks for the issuer's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySetLocation {
    /// `GET <issuer>/.well-known/jwks`
    #[default]
    Direct,
    /// `GET <issuer>/.well-known/openid-configuration`, then `GET <jwks_uri>`
    Discovery,
}

/// Settings shared by the key cache, the key set fetcher and the token verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    issuer: String,
    max_key_age: Duration,
    max_clock_skew: Duration,
    key_set_location: KeySetLocation,
    fetch_timeout: Option<Duration>,
    min_refresh_interval: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            max_key_age: DEFAULT_MAX_KEY_AGE,
            max_clock_skew: DEFAULT_MAX_CLOCK_SKEW,
            key_set_location: KeySetLocation::Direct,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
            min_refresh_interval: Duration::ZERO,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(issuer) = env::var("AUTHTOKEN_ISSUER") {
            config = config.issuer(issuer);
        }
        if let Some(age) = env_secs("AUTHTOKEN_MAX_KEY_AGE") {
            config.max_key_age = age;
        }
        if let Some(skew) = env_secs("AUTHTOKEN_MAX_CLOCK_SKEW") {
            config.max_clock_skew = skew;
        }
        if let Some(discovery) = env::var("AUTHTOKEN_DISCOVERY")
            .ok()
            .and_then(|v| parse_bool(&v))
        {
            config.key_set_location = if discovery {
                KeySetLocation::Discovery
            } else {
                KeySetLocation::Direct
            };
        }
        if let Some(timeout) = env_secs("AUTHTOKEN_FETCH_TIMEOUT") {
            config.fetch_timeout = (!timeout.is_zero()).then_some(timeout);
        }
        if let Some(interval) = env_secs("AUTHTOKEN_MIN_REFRESH_INTERVAL") {
            config.min_refresh_interval = interval;
        }
        config
    }

    /// Set the issuer base URI. Trailing slashes are stripped.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.issuer = issuer.trim_end_matches('/').to_string();
        self
    }

    /// Maximum age of a cached signing key before it must be re-fetched.
    pub fn max_key_age(mut self, age: Duration) -> Self {
        self.max_key_age = age;
        self
    }

    /// Clock skew tolerated when checking the `exp` claim.
    pub fn max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    pub fn key_set_location(mut self, location: KeySetLocation) -> Self {
        self.key_set_location = location;
        self
    }

    /// Timeout applied to each key set HTTP request. `None` leaves requests unbounded.
    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// After a successful refresh, unknown key ids are answered from the fresh key set
    /// for this long instead of triggering another fetch. Zero disables the window.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn issuer_uri(&self) -> &str {
        &self.issuer
    }

    pub fn max_key_age_duration(&self) -> Duration {
        self.max_key_age
    }

    pub fn max_clock_skew_duration(&self) -> Duration {
        self.max_clock_skew
    }

    pub fn location(&self) -> KeySetLocation {
        self.key_set_location
    }

    pub fn fetch_timeout_duration(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    pub fn min_refresh_interval_duration(&self) -> Duration {
        self.min_refresh_interval
    }

    /// URL of the key set or discovery document, depending on the configured location.
    pub fn key_set_entry_url(&self) -> String {
        match self.key_set_location {
            KeySetLocation::Direct => format!("{}{}", self.issuer, JWKS_PATH),
            KeySetLocation::Discovery => format!("{}{}", self.issuer, DISCOVERY_PATH),
        }
    }

    /// Check that the issuer is an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.issuer).map_err(|source| ConfigError::InvalidIssuer {
            issuer: self.issuer.clone(),
            source,
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            _ => Err(ConfigError::UnsupportedScheme(self.issuer.clone())),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
