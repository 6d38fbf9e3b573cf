//! Cache module for persisting normalized results
//!
//! `store` provides the string key-value interface (disk or memory) and `slot`
//! builds single-entry TTL caches on top of it. A cache hit requires a matching
//! key and an entry younger than the TTL; every failure degrades to a miss.

mod slot;
mod store;

pub use slot::{
    AlertsCache, AlertsKey, SlotCache, SlotKey, WeatherCache, WeatherKey, ALERTS_CACHE_KEY,
    ALERTS_CACHE_TTL_MINUTES, WEATHER_CACHE_KEY, WEATHER_CACHE_TTL_MINUTES,
};
pub use store::{FileStore, KeyValueStore, MemoryStore};
