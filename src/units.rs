//! Unit preferences and display formatting
//!
//! Pressure is stored in hPa everywhere and converted only when formatted.
//! Temperature and wind speed arrive from the forecast API already in the
//! requested unit, so for those this module only supplies labels and the
//! request strings.

use serde::{Deserialize, Serialize};

/// Pressure shown when a reading is missing. Presentation only; never stored.
pub const DEFAULT_PRESSURE_HPA: f64 = 1013.0;

const HPA_TO_INHG: f64 = 0.02953;

/// Temperature/wind unit system requested from the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// °C and km/h
    #[default]
    Metric,
    /// °F and mph
    Imperial,
}

impl TemperatureUnit {
    /// Parses a unit name, accepting a few common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Some(Self::Metric),
            "imperial" | "f" | "fahrenheit" => Some(Self::Imperial),
            _ => None,
        }
    }

    /// Canonical name, also used as the persisted value and cache key component
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// `temperature_unit` query value for the forecast API
    pub fn api_temperature_unit(&self) -> &'static str {
        match self {
            Self::Metric => "celsius",
            Self::Imperial => "fahrenheit",
        }
    }

    /// `wind_speed_unit` query value for the forecast API
    pub fn api_wind_unit(&self) -> &'static str {
        match self {
            Self::Metric => "kmh",
            Self::Imperial => "mph",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    pub fn wind_symbol(&self) -> &'static str {
        match self {
            Self::Metric => "km/h",
            Self::Imperial => "mph",
        }
    }
}

/// Pressure display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PressureUnit {
    #[default]
    #[serde(rename = "hPa")]
    Hpa,
    #[serde(rename = "inHg")]
    InHg,
    #[serde(rename = "kPa")]
    Kpa,
}

impl PressureUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hpa" | "mbar" => Some(Self::Hpa),
            "inhg" => Some(Self::InHg),
            "kpa" => Some(Self::Kpa),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Hpa => "hPa",
            Self::InHg => "inHg",
            Self::Kpa => "kPa",
        }
    }
}

/// Clock style for hour labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "24h")]
    H24,
}

impl TimeFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "12h" | "12" => Some(Self::H12),
            "24h" | "24" => Some(Self::H24),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H12 => "12h",
            Self::H24 => "24h",
        }
    }
}

pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa * HPA_TO_INHG
}

pub fn hpa_to_kpa(hpa: f64) -> f64 {
    hpa / 10.0
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg / HPA_TO_INHG
}

pub fn kpa_to_hpa(kpa: f64) -> f64 {
    kpa * 10.0
}

/// Converts an hPa reading into the given unit without rounding
pub fn convert_pressure(hpa: f64, unit: PressureUnit) -> f64 {
    match unit {
        PressureUnit::Hpa => hpa,
        PressureUnit::InHg => hpa_to_inhg(hpa),
        PressureUnit::Kpa => hpa_to_kpa(hpa),
    }
}

/// Formats an hPa reading for display
///
/// Rounding is fixed per unit: hPa to an integer, inHg to 2 decimals and
/// kPa to 1 decimal.
///
/// # Examples
/// ```
/// use skyglance::units::{format_pressure, PressureUnit};
/// assert_eq!(format_pressure(1013.25, PressureUnit::Hpa), "1013 hPa");
/// assert_eq!(format_pressure(1013.25, PressureUnit::InHg), "29.92 inHg");
/// assert_eq!(format_pressure(1013.25, PressureUnit::Kpa), "101.3 kPa");
/// ```
pub fn format_pressure(hpa: f64, unit: PressureUnit) -> String {
    let value = convert_pressure(hpa, unit);
    match unit {
        PressureUnit::Hpa => format!("{} hPa", value.round()),
        PressureUnit::InHg => format!("{:.2} inHg", value),
        PressureUnit::Kpa => format!("{:.1} kPa", value),
    }
}

/// Formats a possibly missing reading, falling back to standard sea-level pressure
pub fn format_pressure_or_default(hpa: Option<f64>, unit: PressureUnit) -> String {
    format_pressure(hpa.unwrap_or(DEFAULT_PRESSURE_HPA), unit)
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label for a wind direction in degrees
pub fn degrees_to_compass(deg: f64) -> &'static str {
    let deg = deg.rem_euclid(360.0);
    let idx = ((deg / 22.5) + 0.5) as usize % 16;
    COMPASS[idx]
}
