//! TTL-scoped signing key cache with coalesced refreshes.

use super::fetcher::KeySetFetcher;
use super::flight::SingleFlight;
use super::material::KeyMaterial;
use crate::error::FetchError;
use arc_swap::ArcSwap;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Horizon used when `now + max_key_age` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Outcome of one refresh, shared by every caller that waited on it.
pub type RefreshResult = Result<(), Arc<FetchError>>;

/// A signing key that may be used for verification until its expiry.
#[derive(Debug)]
pub struct CachedKey {
    material: Arc<KeyMaterial>,
    expiry: Instant,
}

impl CachedKey {
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        self.material.decoding_key()
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        self.material.algorithms()
    }

    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    /// Valid-use test: the key is usable strictly before its expiry instant.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.expiry
    }
}

/// Immutable view of the cache, replaced wholesale on every successful refresh.
#[derive(Debug, Default)]
struct Snapshot {
    keys: HashMap<String, Arc<CachedKey>>,
    refreshed_at: Option<Instant>,
}

/// Cache statistics for observability and tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCacheStats {
    /// Lookups answered with a fresh key
    pub hits: u64,
    /// Lookups for an unknown or expired key
    pub misses: u64,
    /// Refreshes that replaced the key map
    pub refreshes: u64,
    /// Refreshes whose fetch failed
    pub failed_refreshes: u64,
    /// Keys in the current map
    pub keys: usize,
}

/// TTL-scoped cache of issuer signing keys keyed by `kid`.
///
/// Reads go through an [`ArcSwap`] snapshot and never block. Refreshes fetch the whole
/// key set, build a new map and swap it in atomically; overlapping refreshes are
/// coalesced so at most one fetch is outstanding per cache.
///
/// A cache belongs to one validator unless the same `Arc<KeyCache>` is handed to several
/// validators on purpose.
pub struct KeyCache {
    fetcher: Arc<dyn KeySetFetcher>,
    max_key_age: Duration,
    min_refresh_interval: Duration,
    snapshot: ArcSwap<Snapshot>,
    refresh_flight: SingleFlight<RefreshResult>,
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
}

impl KeyCache {
    /// Create an empty cache whose entries live for `max_key_age` after each refresh.
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, max_key_age: Duration) -> Self {
        Self {
            fetcher,
            max_key_age,
            min_refresh_interval: Duration::ZERO,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            refresh_flight: SingleFlight::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failed_refreshes: AtomicU64::new(0),
        }
    }

    /// Window after a successful refresh during which an unknown kid is answered from
    /// the fresh map instead of triggering another fetch. Zero (the default) disables it.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn max_key_age(&self) -> Duration {
        self.max_key_age
    }

    /// Return the key for `kid` if it is cached and unexpired.
    ///
    /// `None` means the caller must refresh before concluding anything about `kid`.
    pub fn lookup(&self, kid: &str) -> Option<Arc<CachedKey>> {
        let snapshot = self.snapshot.load();
        match snapshot.keys.get(kid) {
            Some(key) if key.is_fresh_at(Instant::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(kid, "signing key cache hit");
                Some(Arc::clone(key))
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(kid, "signing key expired");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(kid, "signing key cache miss");
                None
            }
        }
    }

    /// Key for `kid` in the map installed by the most recent successful refresh,
    /// regardless of expiry. Used to re-check right after a refresh.
    pub fn get_refreshed(&self, kid: &str) -> Option<Arc<CachedKey>> {
        self.snapshot.load().keys.get(kid).cloned()
    }

    /// `true` when `kid` is absent from a key set fetched less than the minimum refresh
    /// interval ago, so fetching again would only repeat the same answer.
    pub fn refresh_suppressed_for(&self, kid: &str) -> bool {
        if self.min_refresh_interval.is_zero() {
            return false;
        }
        let snapshot = self.snapshot.load();
        match snapshot.refreshed_at {
            Some(at) => !snapshot.keys.contains_key(kid) && at.elapsed() < self.min_refresh_interval,
            None => false,
        }
    }

    /// Fetch the current key set and atomically replace the cached map.
    ///
    /// If a refresh is already running, block until it finishes and return its outcome
    /// instead of starting another fetch. On failure the previous map stays in place.
    pub fn refresh(&self) -> RefreshResult {
        self.refresh_flight
            .run(|| self.fetch_and_swap())
            .unwrap_or_else(|| Err(Arc::new(FetchError::Abandoned)))
    }

    /// `true` while a refresh is running.
    pub fn refresh_in_flight(&self) -> bool {
        self.refresh_flight.in_flight()
    }

    pub fn stats(&self) -> KeyCacheStats {
        KeyCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failed_refreshes: self.failed_refreshes.load(Ordering::Relaxed),
            keys: self.snapshot.load().keys.len(),
        }
    }

    fn fetch_and_swap(&self) -> RefreshResult {
        let started = Instant::now();
        let key_set = match self.fetcher.fetch() {
            Ok(key_set) => key_set,
            Err(e) => {
                self.failed_refreshes.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "signing key refresh failed; keeping previous keys");
                return Err(Arc::new(e));
            }
        };

        let previous = self.snapshot.load_full();
        let now = Instant::now();
        let keys = build_key_map(&key_set, &previous.keys, expiry_after(now, self.max_key_age));
        let key_count = keys.len();
        self.snapshot.store(Arc::new(Snapshot {
            keys,
            refreshed_at: Some(now),
        }));
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        info!(
            keys = key_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "signing keys refreshed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("max_key_age", &self.max_key_age)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Expiry for keys installed at `now`, saturating to a far-future instant for TTLs too
/// large to add.
fn expiry_after(now: Instant, max_key_age: Duration) -> Instant {
    now.checked_add(max_key_age)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Build the next key map from a fetched key set.
///
/// Every published key gets the same fresh `expiry`. Material for a kid whose JWK is
/// unchanged since the previous map is reused; entries that cannot be converted are
/// skipped.
fn build_key_map(
    key_set: &JwkSet,
    previous: &HashMap<String, Arc<CachedKey>>,
    expiry: Instant,
) -> HashMap<String, Arc<CachedKey>> {
    let mut next = HashMap::with_capacity(key_set.keys.len());

    for jwk in &key_set.keys {
        let Some(kid) = jwk.common.key_id.as_deref() else {
            warn!("skipping published key without kid");
            continue;
        };

        let reused = previous
            .get(kid)
            .filter(|cached| cached.material.jwk() == jwk)
            .map(|cached| Arc::clone(&cached.material));

        let material = match reused {
            Some(material) => material,
            None => match KeyMaterial::from_jwk(jwk) {
                Ok(material) => Arc::new(material),
                Err(e) => {
                    warn!(kid, error = %e, "skipping unusable published key");
                    continue;
                }
            },
        };

        next.insert(kid.to_string(), Arc::new(CachedKey { material, expiry }));
    }

    next
}
