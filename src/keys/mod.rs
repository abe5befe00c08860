//! # Signing Key Cache
//!
//! Issuer signing keys are fetched as a JWK set, converted once into verification key
//! material and cached by `kid` for a bounded time.
//!
//! - [`fetcher`] retrieves the key set (directly or through OpenID discovery)
//! - [`material`] converts a JWK into a `DecodingKey` plus its allowed algorithms
//! - [`cache`] holds the current key map and coalesces concurrent refreshes
//! - [`flight`] is the single-flight primitive the cache refreshes through
//!
//! ## Refresh Model
//!
//! A refresh replaces the whole map atomically and gives every published key the same
//! expiry (`now + max_key_age`), so keys expire as a cohort. Keys that are no longer
//! published disappear at the next refresh. A failed refresh leaves the previous map in
//! place; its entries still expire on schedule.

pub mod cache;
pub mod fetcher;
pub mod flight;
pub mod material;

pub use cache::{CachedKey, KeyCache, KeyCacheStats, RefreshResult};
pub use fetcher::{HttpKeySetFetcher, KeySetFetcher};
pub use flight::SingleFlight;
pub use material::{allowed_algorithms, KeyMaterial};
