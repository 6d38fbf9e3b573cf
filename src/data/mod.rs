//! Core data models for skyglance
//!
//! This module contains the canonical, already-normalized weather types handed
//! to presentation code, along with the API clients that feed them.

pub mod codes;
pub mod geocode;
pub mod weather;

pub use codes::WeatherKind;
pub use geocode::{GeocodeClient, GeocodeResult};
pub use weather::{AirQualityResponse, FetchError, ForecastClient, ForecastResponse};

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to every outgoing request
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Builds the HTTP client shared by every API client
///
/// The weather.gov API rejects requests without a User-Agent.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("skyglance/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
}

/// A named place the forecast is requested for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            country: None,
        }
    }

    /// Location used when nothing was given and nothing could be detected
    pub fn default_location() -> Self {
        Self {
            name: "San Francisco".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            country: Some("US".to_string()),
        }
    }

    /// Label built from coordinates, used when reverse geocoding fails
    pub fn coordinate_label(latitude: f64, longitude: f64) -> String {
        format!("{:.2}, {:.2}", latitude, longitude)
    }
}

/// One hourly sample of the forecast
///
/// Every measurement is optional because the upstream API may omit any field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Local wall-clock time of the location
    pub time: NaiveDateTime,
    /// Display label ("Now", "3PM", "15:00")
    pub label: String,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    /// WMO weather code
    pub weather_code: Option<u8>,
    pub icon: String,
    pub precipitation_mm: Option<f64>,
    /// Percentage 0-100
    pub precipitation_probability: Option<f64>,
    /// In the requested unit (km/h or mph)
    pub wind_speed: Option<f64>,
    /// Degrees
    pub wind_direction: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    /// Surface pressure in hPa
    pub pressure: Option<f64>,
    pub uv_index: Option<f64>,
    pub dew_point: Option<f64>,
    /// Meters
    pub visibility: Option<f64>,
    /// Percentage 0-100
    pub cloud_cover: Option<f64>,
}

/// Per-day summary of the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub date: NaiveDate,
    /// Short weekday ("Mon")
    pub label: String,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub weather_code: Option<u8>,
    pub icon: String,
    pub precipitation_sum: Option<f64>,
    pub precipitation_probability_max: Option<f64>,
    pub wind_speed_max: Option<f64>,
    pub wind_direction_dominant: Option<f64>,
    pub humidity_mean: Option<f64>,
    /// Mean of the hourly surface pressure samples inside the day, hPa
    pub pressure_mean: Option<f64>,
    pub uv_index_max: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
}

/// Closed set of condition categories used to pick backgrounds and copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionCategory {
    Sunny,
    Cloudy,
    Rain,
    Snow,
    ClearNight,
    Night,
    Storm,
}

impl ConditionCategory {
    /// Lowercase description, e.g. "clear night"
    pub fn description(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::ClearNight => "clear night",
            Self::Night => "night",
            Self::Storm => "storm",
        }
    }
}

/// Same-hour-yesterday differences; `None` when yesterday's sample is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Deltas {
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

/// Air quality snapshot from the secondary air-quality API
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AirQuality {
    pub european_aqi: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

/// Conditions for the current hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(flatten)]
    pub snapshot: ForecastPoint,
    pub is_night: bool,
    pub condition: ConditionCategory,
    pub description: String,
    pub deltas: Deltas,
    pub air_quality: Option<AirQuality>,
}

/// Today's temperature range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TodayRange {
    pub max: Option<f64>,
    pub min: Option<f64>,
}

/// Canonical normalized forecast handed to presentation code
///
/// Built fresh on every cache miss and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// IANA timezone of the location as reported by the API
    pub timezone: String,
    pub current: CurrentConditions,
    /// Up to 24 hours starting at the current hour
    pub hourly: Vec<ForecastPoint>,
    /// Up to 7 days starting today
    pub daily: Vec<DayAggregate>,
    pub today: TodayRange,
}
