//! WMO weather code lookup
//!
//! Weather codes from WMO (World Meteorological Organization), as used by Open-Meteo:
//! - 0: Clear sky
//! - 1, 2: Mainly clear, partly cloudy
//! - 3: Overcast
//! - 45, 48: Fog
//! - 51-57: Drizzle (including freezing drizzle)
//! - 61-67: Rain (including freezing rain)
//! - 71-77: Snow
//! - 80-82: Rain showers
//! - 85, 86: Snow showers
//! - 95-99: Thunderstorm

use serde::{Deserialize, Serialize};

use super::ConditionCategory;

/// Coarse weather kind derived from a WMO code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherKind {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Storm,
    Unknown,
}

impl WeatherKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Clear,
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51..=57 => Self::Drizzle,
            61..=67 | 80..=82 => Self::Rain,
            71..=77 | 85 | 86 => Self::Snow,
            95..=99 => Self::Storm,
            _ => Self::Unknown,
        }
    }
}

/// Emoji icon for a weather code
///
/// Clear and partly cloudy skies get a moon at night. Missing or unknown codes
/// get a thermometer.
pub fn icon(code: Option<u8>, is_night: bool) -> &'static str {
    let Some(code) = code else {
        return "🌡️";
    };
    match (WeatherKind::from_code(code), is_night) {
        (WeatherKind::Clear | WeatherKind::PartlyCloudy, true) => "🌙",
        (WeatherKind::Clear, false) => "☀️",
        (WeatherKind::PartlyCloudy, false) => "🌤️",
        (WeatherKind::Cloudy, _) => "☁️",
        (WeatherKind::Fog, _) => "🌫️",
        (WeatherKind::Drizzle, _) => "🌦️",
        (WeatherKind::Rain, _) => "🌧️",
        (WeatherKind::Snow, _) => "❄️",
        (WeatherKind::Storm, _) => "⛈️",
        (WeatherKind::Unknown, _) => "🌡️",
    }
}

/// Condition category for a weather code
pub fn condition_category(code: Option<u8>, is_night: bool) -> ConditionCategory {
    let kind = code.map(WeatherKind::from_code).unwrap_or(WeatherKind::Unknown);
    match kind {
        WeatherKind::Clear | WeatherKind::PartlyCloudy if is_night => ConditionCategory::ClearNight,
        WeatherKind::Clear | WeatherKind::PartlyCloudy => ConditionCategory::Sunny,
        WeatherKind::Cloudy | WeatherKind::Fog => ConditionCategory::Cloudy,
        WeatherKind::Drizzle | WeatherKind::Rain => ConditionCategory::Rain,
        WeatherKind::Snow => ConditionCategory::Snow,
        WeatherKind::Storm => ConditionCategory::Storm,
        WeatherKind::Unknown if is_night => ConditionCategory::Night,
        WeatherKind::Unknown => ConditionCategory::Cloudy,
    }
}
