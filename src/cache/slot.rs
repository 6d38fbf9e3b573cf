//! Single-slot TTL caches backed by a [`KeyValueStore`]
//!
//! Each cache keeps at most one entry under a fixed storage key. An entry is
//! returned only while its key matches the requested one and it is younger
//! than the TTL; anything else clears the slot (lazy eviction on read).
//! Storage and parse failures are logged and treated as a miss so that caching
//! never fails the operation it fronts.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

use super::KeyValueStore;
use crate::alerts::WeatherAlert;
use crate::data::WeatherRecord;
use crate::units::TemperatureUnit;

/// Storage key of the weather slot
pub const WEATHER_CACHE_KEY: &str = "weather_cache";

/// Weather entries are valid for 10 minutes
pub const WEATHER_CACHE_TTL_MINUTES: i64 = 10;

/// Storage key of the alerts slot
pub const ALERTS_CACHE_KEY: &str = "weather_alerts_cache";

/// Alert entries are valid for 30 minutes
pub const ALERTS_CACHE_TTL_MINUTES: i64 = 30;

/// Alerts fetched for a point are reused within this many degrees of it
pub const ALERTS_MATCH_DEGREES: f64 = 0.1;

/// Decides whether a stored entry was computed for the requested key
pub trait SlotKey: Serialize + DeserializeOwned {
    fn matches(&self, stored: &Self) -> bool;
}

/// Wrapper persisted in the store
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<K, V> {
    /// The cached value
    data: V,
    /// When the value was cached
    cached_at: DateTime<Utc>,
    /// Key the value was computed for
    key: K,
}

/// A single-entry cache with time-to-live
pub struct SlotCache<K, V> {
    store: Arc<dyn KeyValueStore>,
    storage_key: &'static str,
    ttl: Duration,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for SlotCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            storage_key: self.storage_key,
            ttl: self.ttl,
            _entry: PhantomData,
        }
    }
}

impl<K, V> std::fmt::Debug for SlotCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotCache")
            .field("storage_key", &self.storage_key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<K: SlotKey, V: Serialize + DeserializeOwned> SlotCache<K, V> {
    pub fn with_ttl(store: Arc<dyn KeyValueStore>, storage_key: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            storage_key,
            ttl,
            _entry: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value if it is valid for `key` right now
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Returns the cached value if it is valid for `key` at `now`
    ///
    /// A stale, mismatched or unreadable entry is removed before returning `None`.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let raw = match self.store.get(self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(storage_key = self.storage_key, error = %e, "Cache read error");
                return None;
            }
        };

        let entry: CacheEntry<K, V> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(storage_key = self.storage_key, error = %e, "Discarding unreadable cache entry");
                self.clear();
                return None;
            }
        };

        let expired = now.signed_duration_since(entry.cached_at) >= self.ttl;
        if expired || !key.matches(&entry.key) {
            tracing::debug!(storage_key = self.storage_key, expired, "Cache entry invalidated");
            self.clear();
            return None;
        }

        Some(entry.data)
    }

    /// Replaces the slot with `value` computed for `key`, stamped now
    pub fn set(&self, value: &V, key: &K) {
        self.set_at(value, key, Utc::now());
    }

    /// Replaces the slot with `value` computed for `key`, stamped at `now`
    pub fn set_at(&self, value: &V, key: &K, now: DateTime<Utc>) {
        let entry = CacheEntry {
            data: value,
            cached_at: now,
            key,
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(storage_key = self.storage_key, error = %e, "Cache serialize error");
                return;
            }
        };
        if let Err(e) = self.store.set(self.storage_key, &json) {
            tracing::warn!(storage_key = self.storage_key, error = %e, "Cache write error");
        }
    }

    /// Empties the slot
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(self.storage_key) {
            tracing::warn!(storage_key = self.storage_key, error = %e, "Cache clear error");
        }
    }
}

/// Key of the weather slot: rounded coordinates plus unit system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherKey {
    pub latitude: f64,
    pub longitude: f64,
    pub units: TemperatureUnit,
}

impl WeatherKey {
    /// Builds a key, rounding coordinates to 4 decimals (~11 m)
    pub fn new(latitude: f64, longitude: f64, units: TemperatureUnit) -> Self {
        Self {
            latitude: round4(latitude),
            longitude: round4(longitude),
            units,
        }
    }
}

impl SlotKey for WeatherKey {
    /// Exact match after rounding; nearby locations do not share an entry
    fn matches(&self, stored: &Self) -> bool {
        self == stored
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Cache of the last normalized forecast
pub type WeatherCache = SlotCache<WeatherKey, WeatherRecord>;

impl WeatherCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(
            store,
            WEATHER_CACHE_KEY,
            Duration::minutes(WEATHER_CACHE_TTL_MINUTES),
        )
    }
}

/// Key of the alerts slot: the coordinates the alerts were fetched for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertsKey {
    pub latitude: f64,
    pub longitude: f64,
}

impl SlotKey for AlertsKey {
    /// Proximity match: alerts cover an area, not a point
    fn matches(&self, stored: &Self) -> bool {
        (self.latitude - stored.latitude).abs() < ALERTS_MATCH_DEGREES
            && (self.longitude - stored.longitude).abs() < ALERTS_MATCH_DEGREES
    }
}

/// Cache of the last alert list
pub type AlertsCache = SlotCache<AlertsKey, Vec<WeatherAlert>>;

impl AlertsCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(
            store,
            ALERTS_CACHE_KEY,
            Duration::minutes(ALERTS_CACHE_TTL_MINUTES),
        )
    }
}
