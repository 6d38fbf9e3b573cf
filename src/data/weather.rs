//! Open-Meteo forecast and air-quality API client
//!
//! This module fetches the raw forecast payload and deserializes it into
//! columnar series. Turning those series into a [`super::WeatherRecord`] is
//! the normalizer's job; nothing here interprets the values.

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::AirQuality;
use crate::config::Endpoints;
use crate::units::TemperatureUnit;

/// Hourly variables requested from the forecast API
pub const HOURLY_FIELDS: &str = "temperature_2m,apparent_temperature,weather_code,precipitation,\
precipitation_probability,windspeed_10m,winddirection_10m,relative_humidity_2m,surface_pressure,\
uv_index,dewpoint_2m,visibility,cloudcover";

/// Daily variables requested from the forecast API
pub const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,sunrise,sunset,\
precipitation_sum,precipitation_probability_max,wind_speed_10m_max,wind_direction_10m_dominant,\
relative_humidity_2m_mean,uv_index_max";

/// Current air-quality variables requested from the air-quality API
pub const AIR_QUALITY_FIELDS: &str =
    "european_aqi,pm10,pm2_5,carbon_monoxide,nitrogen_dioxide,sulphur_dioxide,ozone";

/// Days of forecast requested
pub const FORECAST_DAYS: u8 = 7;

/// Days of history requested, so that same-hour-yesterday samples exist
pub const PAST_DAYS: u8 = 1;

/// Errors that can occur when fetching or interpreting forecast data
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Failed to fetch weather: HTTP {0}")]
    Status(StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Invalid time format in response
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

/// `current_weather` block of the forecast response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "weather_code")]
    pub weathercode: Option<u8>,
}

/// Hourly series, positionally aligned with `time`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature: Vec<Option<f64>>,
    #[serde(default, alias = "weathercode")]
    pub weather_code: Vec<Option<u8>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
    #[serde(default, alias = "wind_speed_10m")]
    pub windspeed_10m: Vec<Option<f64>>,
    #[serde(default, alias = "wind_direction_10m")]
    pub winddirection_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    pub uv_index: Vec<Option<f64>>,
    #[serde(default, alias = "dew_point_2m")]
    pub dewpoint_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub visibility: Vec<Option<f64>>,
    #[serde(default, alias = "cloud_cover")]
    pub cloudcover: Vec<Option<f64>>,
}

impl HourlySeries {
    /// Parses the hourly timestamps, dropping malformed entries and their samples
    ///
    /// The returned series stays positionally aligned with the returned times.
    pub fn retain_parsed_times(&self) -> (Vec<NaiveDateTime>, HourlySeries) {
        let mut kept = Vec::with_capacity(self.time.len());
        let mut times = Vec::with_capacity(self.time.len());
        for (i, raw) in self.time.iter().enumerate() {
            match parse_datetime(raw) {
                Ok(t) => {
                    kept.push(i);
                    times.push(t);
                }
                Err(e) => tracing::warn!(error = %e, "Dropping hourly sample"),
            }
        }
        if kept.len() == self.time.len() {
            return (times, self.clone());
        }

        let series = HourlySeries {
            time: pick(&self.time, &kept),
            temperature_2m: pick(&self.temperature_2m, &kept),
            apparent_temperature: pick(&self.apparent_temperature, &kept),
            weather_code: pick(&self.weather_code, &kept),
            precipitation: pick(&self.precipitation, &kept),
            precipitation_probability: pick(&self.precipitation_probability, &kept),
            windspeed_10m: pick(&self.windspeed_10m, &kept),
            winddirection_10m: pick(&self.winddirection_10m, &kept),
            relative_humidity_2m: pick(&self.relative_humidity_2m, &kept),
            surface_pressure: pick(&self.surface_pressure, &kept),
            uv_index: pick(&self.uv_index, &kept),
            dewpoint_2m: pick(&self.dewpoint_2m, &kept),
            visibility: pick(&self.visibility, &kept),
            cloudcover: pick(&self.cloudcover, &kept),
        };
        (times, series)
    }
}

/// Values at the kept positions; a series shorter than `time` stays shorter
fn pick<T: Clone>(values: &[T], kept: &[usize]) -> Vec<T> {
    kept.iter().filter_map(|&i| values.get(i).cloned()).collect()
}

/// Daily series, positionally aligned with `time`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default, alias = "weathercode")]
    pub weather_code: Vec<Option<u8>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub sunrise: Vec<Option<String>>,
    #[serde(default)]
    pub sunset: Vec<Option<String>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m_dominant: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub uv_index_max: Vec<Option<f64>>,
}

/// Raw forecast response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub current_weather: Option<CurrentWeather>,
    #[serde(default)]
    pub hourly: HourlySeries,
    #[serde(default)]
    pub daily: DailySeries,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirQualityCurrent {
    #[serde(default)]
    pub european_aqi: Option<f64>,
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
}

/// Raw air-quality response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirQualityResponse {
    #[serde(default)]
    pub current: Option<AirQualityCurrent>,
}

impl AirQualityResponse {
    /// Snapshot of the current readings, `None` when the block is absent
    pub fn into_air_quality(self) -> Option<AirQuality> {
        self.current.map(|c| AirQuality {
            european_aqi: c.european_aqi,
            pm2_5: c.pm2_5,
            pm10: c.pm10,
        })
    }
}

/// Client for the Open-Meteo forecast and air-quality endpoints
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    forecast_url: String,
    air_quality_url: String,
}

impl ForecastClient {
    pub fn new(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            forecast_url: endpoints.forecast.clone(),
            air_quality_url: endpoints.air_quality.clone(),
        }
    }

    /// Fetch the raw forecast for the given coordinates
    ///
    /// Temperatures and wind speeds come back already in the requested unit
    /// system. No retry is attempted.
    pub async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
        units: TemperatureUnit,
    ) -> Result<ForecastResponse, FetchError> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("current_weather", "true".to_string()),
                ("timezone", "auto".to_string()),
                ("temperature_unit", units.api_temperature_unit().to_string()),
                ("wind_speed_unit", units.api_wind_unit().to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("past_days", PAST_DAYS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        let forecast: ForecastResponse = serde_json::from_str(&text)?;
        tracing::debug!(
            hours = forecast.hourly.time.len(),
            days = forecast.daily.time.len(),
            "Fetched forecast"
        );
        Ok(forecast)
    }

    /// Fetch current air quality for the given coordinates
    pub async fn fetch_air_quality(&self, lat: f64, lon: f64) -> Result<AirQualityResponse, FetchError> {
        let response = self
            .client
            .get(&self.air_quality_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current", AIR_QUALITY_FIELDS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Parse an API local timestamp such as "2024-07-15T05:30"
pub fn parse_datetime(datetime_str: &str) -> Result<NaiveDateTime, FetchError> {
    NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| FetchError::InvalidTimeFormat(datetime_str.to_string()))
}

/// Parse an API date such as "2024-07-15"
pub fn parse_date(date_str: &str) -> Result<NaiveDate, FetchError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| FetchError::InvalidTimeFormat(date_str.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "latitude": 49.28,
        "longitude": -123.12,
        "timezone": "America/Vancouver",
        "current_weather": {
            "time": "2024-07-15T14:00",
            "temperature": 22.5,
            "windspeed": 12.5,
            "winddirection": 270,
            "weathercode": 2,
            "is_day": 1
        },
        "hourly": {
            "time": ["2024-07-15T13:00", "2024-07-15T14:00"],
            "temperature_2m": [21.9, 22.5],
            "weathercode": [1, 2],
            "surface_pressure": [1012.4, null],
            "windspeed_10m": [10.0, 12.5]
        },
        "daily": {
            "time": ["2024-07-15"],
            "sunrise": ["2024-07-15T05:30"],
            "sunset": ["2024-07-15T21:15"],
            "uv_index_max": [7.5]
        }
    }"#;

    #[test]
    fn test_parse_sample_response() {
        let response: ForecastResponse =
            serde_json::from_str(SAMPLE_RESPONSE).expect("Failed to parse sample response");

        assert_eq!(response.timezone, "America/Vancouver");
        let current = response.current_weather.expect("current_weather present");
        assert_eq!(current.time.as_deref(), Some("2024-07-15T14:00"));
        assert_eq!(current.temperature, Some(22.5));
        assert_eq!(current.weathercode, Some(2));

        assert_eq!(response.hourly.weather_code, vec![Some(1), Some(2)]);
        assert_eq!(response.hourly.surface_pressure, vec![Some(1012.4), None]);
        assert!(response.hourly.relative_humidity_2m.is_empty());
        assert_eq!(response.daily.sunrise[0].as_deref(), Some("2024-07-15T05:30"));
    }

    #[test]
    fn test_missing_blocks_default_to_empty() {
        let response: ForecastResponse = serde_json::from_str("{}").expect("empty object parses");
        assert!(response.current_weather.is_none());
        assert!(response.hourly.time.is_empty());
        assert!(response.daily.time.is_empty());
    }

    #[test]
    fn test_parse_malformed_json() {
        let result: Result<ForecastResponse, _> = serde_json::from_str("{ not valid json }");
        assert!(result.is_err());
    }

    #[test]
    fn test_retain_parsed_times() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let (times, series) = response.hourly.retain_parsed_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1], parse_datetime("2024-07-15T14:00").unwrap());
        assert_eq!(series.temperature_2m, vec![Some(21.9), Some(22.5)]);
    }

    #[test]
    fn test_retain_parsed_times_drops_bad_entry_with_samples() {
        let series = HourlySeries {
            time: vec![
                "2024-07-15T13:00".to_string(),
                "yesterday".to_string(),
                "2024-07-15T15:00".to_string(),
            ],
            temperature_2m: vec![Some(21.0), Some(99.0), Some(23.0)],
            weather_code: vec![Some(1), Some(95), Some(2)],
            surface_pressure: vec![Some(1012.0)],
            ..HourlySeries::default()
        };
        let (times, kept) = series.retain_parsed_times();

        assert_eq!(times.len(), 2);
        assert_eq!(times[1], parse_datetime("2024-07-15T15:00").unwrap());
        assert_eq!(kept.time, vec!["2024-07-15T13:00", "2024-07-15T15:00"]);
        assert_eq!(kept.temperature_2m, vec![Some(21.0), Some(23.0)]);
        assert_eq!(kept.weather_code, vec![Some(1), Some(2)]);
        assert_eq!(kept.surface_pressure, vec![Some(1012.0)]);
        assert!(kept.visibility.is_empty());
    }

    #[test]
    fn test_parse_datetime_formats() {
        let a = parse_datetime("2024-07-15T05:30").unwrap();
        let b = parse_datetime("2024-07-15T05:30:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_datetime("2024-07-15 05:30").is_err());
        assert!(parse_date("2024-07-15").is_ok());
        assert!(parse_date("15/07/2024").is_err());
    }

    #[test]
    fn test_air_quality_conversion() {
        let response: AirQualityResponse = serde_json::from_str(
            r#"{"current": {"time": "2024-07-15T14:00", "european_aqi": 23, "pm2_5": 4.1, "pm10": 7.9}}"#,
        )
        .unwrap();
        let aq = response.into_air_quality().unwrap();
        assert_eq!(aq.european_aqi, Some(23.0));
        assert_eq!(aq.pm2_5, Some(4.1));

        let empty: AirQualityResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_air_quality().is_none());
    }

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to fetch weather: HTTP 500 Internal Server Error");
    }
}
