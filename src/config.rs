//! Configuration: API endpoints and persisted user preferences
//!
//! Preferences are stored as individual JSON values in a [`KeyValueStore`],
//! one key per setting. Values that are missing or unrecognized fall back to
//! the defaults rather than failing startup.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

use crate::cache::KeyValueStore;
use crate::data::Location;
use crate::units::{PressureUnit, TemperatureUnit, TimeFormat};

pub const TEMPERATURE_UNIT_KEY: &str = "temperatureUnit";
pub const PRESSURE_UNIT_KEY: &str = "pressureUnit";
pub const TIME_FORMAT_KEY: &str = "timeFormat";
pub const LOCATION_KEY: &str = "location";

/// Base URLs of every external service the crate talks to
///
/// Defaults point at the public services; tests point them at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub forecast: String,
    pub air_quality: String,
    pub geocoding_search: String,
    pub reverse_geocoding: String,
    /// National Weather Service API root (US alerts)
    pub nws: String,
    /// Environment Canada weather-alerts collection
    pub canada_alerts: String,
    /// Directory holding the provincial RSS warning feeds
    pub canada_rss: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            air_quality: "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
            geocoding_search: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            reverse_geocoding: "https://api.bigdatacloud.net/data/reverse-geocode-client"
                .to_string(),
            nws: "https://api.weather.gov".to_string(),
            canada_alerts: "https://api.weather.gc.ca/collections/weather-alerts/items"
                .to_string(),
            canada_rss: "https://weather.gc.ca/rss/warning".to_string(),
        }
    }
}

impl Endpoints {
    /// Routes every service to paths under a single base URL
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            forecast: format!("{}/v1/forecast", base),
            air_quality: format!("{}/v1/air-quality", base),
            geocoding_search: format!("{}/v1/search", base),
            reverse_geocoding: format!("{}/data/reverse-geocode-client", base),
            nws: format!("{}/nws", base),
            canada_alerts: format!("{}/collections/weather-alerts/items", base),
            canada_rss: format!("{}/rss/warning", base),
        }
    }
}

/// User preferences that survive restarts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Preferences {
    pub temperature_unit: TemperatureUnit,
    pub pressure_unit: PressureUnit,
    pub time_format: TimeFormat,
    /// Only present when the user explicitly saved one
    pub location: Option<Location>,
}

impl Preferences {
    /// Loads preferences, using defaults for anything missing or unreadable
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        Self {
            temperature_unit: read_value(store, TEMPERATURE_UNIT_KEY)
                .unwrap_or(defaults.temperature_unit),
            pressure_unit: read_value(store, PRESSURE_UNIT_KEY).unwrap_or(defaults.pressure_unit),
            time_format: read_value(store, TIME_FORMAT_KEY).unwrap_or(defaults.time_format),
            location: read_value(store, LOCATION_KEY),
        }
    }

    /// Persists every preference
    ///
    /// # Errors
    /// Returns the first storage error encountered.
    pub fn save(&self, store: &dyn KeyValueStore) -> io::Result<()> {
        write_value(store, TEMPERATURE_UNIT_KEY, &self.temperature_unit)?;
        write_value(store, PRESSURE_UNIT_KEY, &self.pressure_unit)?;
        write_value(store, TIME_FORMAT_KEY, &self.time_format)?;
        match &self.location {
            Some(location) => write_value(store, LOCATION_KEY, location),
            None => store.remove(LOCATION_KEY),
        }
    }
}

fn read_value<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(key, error = %e, "Could not read preference");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "Ignoring unrecognized preference value");
            None
        }
    }
}

fn write_value<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> io::Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    store.set(key, &json)
}
