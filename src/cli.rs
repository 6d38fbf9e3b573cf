//! Command-line interface parsing for skyglance
//!
//! Flags given on the command line override the stored preferences. Nothing is
//! written back unless `--save` is passed.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Preferences;
use crate::data::Location;
use crate::units::{PressureUnit, TemperatureUnit, TimeFormat};

#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    #[error("Invalid units: '{0}'. Valid units: metric, imperial")]
    InvalidUnits(String),

    #[error("Invalid pressure unit: '{0}'. Valid units: hPa, inHg, kPa")]
    InvalidPressureUnit(String),

    #[error("Invalid time format: '{0}'. Valid formats: 12h, 24h")]
    InvalidTimeFormat(String),

    #[error("Coordinates out of range: {0}, {1}")]
    InvalidCoordinates(f64, f64),
}

/// skyglance - current conditions, hourly and daily forecast with yesterday's deltas
#[derive(Parser, Debug)]
#[command(name = "skyglance")]
#[command(about = "Weather forecasts with day-over-day deltas, alerts and air quality")]
#[command(version)]
pub struct Cli {
    /// Place name to look up; the first match is used
    #[arg(long, value_name = "NAME", conflicts_with_all = ["lat", "lon"])]
    pub city: Option<String>,

    /// Latitude in decimal degrees (requires --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Temperature and wind units: metric or imperial
    #[arg(long, value_name = "UNITS")]
    pub units: Option<String>,

    /// Pressure display unit: hPa, inHg or kPa
    #[arg(long, value_name = "UNIT")]
    pub pressure_unit: Option<String>,

    /// Hour label style: 12h or 24h
    #[arg(long, value_name = "FORMAT")]
    pub time_format: Option<String>,

    /// Ignore the cached forecast and fetch a fresh one
    #[arg(long)]
    pub refresh: bool,

    /// Print the normalized record as JSON
    #[arg(long)]
    pub json: bool,

    /// Also show active weather alerts (US and Canada)
    #[arg(long)]
    pub alerts: bool,

    /// Hide an alert by id in future runs
    #[arg(long, value_name = "ID")]
    pub dismiss: Vec<String>,

    /// List matching places and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["city", "lat", "lon"])]
    pub search: Option<String>,

    /// Keep running and print an update every refresh interval
    #[arg(long)]
    pub watch: bool,

    /// Persist the chosen units, formats and location
    #[arg(long)]
    pub save: bool,

    /// Directory for cached data and preferences
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Where the forecast should be fetched for
#[derive(Debug, Clone, PartialEq)]
pub enum LocationRequest {
    /// Geocode this name
    City(String),
    /// Reverse-geocode these coordinates for a display name
    Coordinates { latitude: f64, longitude: f64 },
    /// A location the user saved earlier
    Saved(Location),
    /// Nothing given and nothing saved
    Default,
}

/// Settings resolved from CLI arguments and stored preferences
#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    pub units: TemperatureUnit,
    pub pressure_unit: PressureUnit,
    pub time_format: TimeFormat,
    pub location: LocationRequest,
    pub refresh: bool,
    pub json: bool,
    pub alerts: bool,
    pub watch: bool,
    pub save: bool,
}

pub fn parse_units_arg(s: &str) -> Result<TemperatureUnit, CliError> {
    TemperatureUnit::parse(s).ok_or_else(|| CliError::InvalidUnits(s.to_string()))
}

pub fn parse_pressure_unit_arg(s: &str) -> Result<PressureUnit, CliError> {
    PressureUnit::parse(s).ok_or_else(|| CliError::InvalidPressureUnit(s.to_string()))
}

pub fn parse_time_format_arg(s: &str) -> Result<TimeFormat, CliError> {
    TimeFormat::parse(s).ok_or_else(|| CliError::InvalidTimeFormat(s.to_string()))
}

impl StartupConfig {
    /// Merges CLI arguments over stored preferences
    ///
    /// # Errors
    /// Returns a [`CliError`] for any unrecognized unit or format, or for
    /// coordinates outside the valid range.
    pub fn from_cli(cli: &Cli, prefs: &Preferences) -> Result<Self, CliError> {
        let units = match &cli.units {
            Some(s) => parse_units_arg(s)?,
            None => prefs.temperature_unit,
        };
        let pressure_unit = match &cli.pressure_unit {
            Some(s) => parse_pressure_unit_arg(s)?,
            None => prefs.pressure_unit,
        };
        let time_format = match &cli.time_format {
            Some(s) => parse_time_format_arg(s)?,
            None => prefs.time_format,
        };

        let location = match (&cli.city, cli.lat, cli.lon) {
            (Some(city), _, _) => LocationRequest::City(city.trim().to_string()),
            (None, Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Err(CliError::InvalidCoordinates(latitude, longitude));
                }
                LocationRequest::Coordinates { latitude, longitude }
            }
            _ => match &prefs.location {
                Some(saved) => LocationRequest::Saved(saved.clone()),
                None => LocationRequest::Default,
            },
        };

        Ok(StartupConfig {
            units,
            pressure_unit,
            time_format,
            location,
            refresh: cli.refresh,
            json: cli.json,
            alerts: cli.alerts,
            watch: cli.watch,
            save: cli.save,
        })
    }

    /// Preferences to persist for `--save`, with the resolved location
    pub fn to_preferences(&self, location: &Location) -> Preferences {
        Preferences {
            temperature_unit: self.units,
            pressure_unit: self.pressure_unit,
            time_format: self.time_format,
            location: Some(location.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_arg_aliases() {
        assert_eq!(parse_units_arg("metric").unwrap(), TemperatureUnit::Metric);
        assert_eq!(parse_units_arg("F").unwrap(), TemperatureUnit::Imperial);
        assert_eq!(parse_units_arg("imperial").unwrap(), TemperatureUnit::Imperial);
    }

    #[test]
    fn test_parse_units_arg_invalid() {
        let err = parse_units_arg("kelvin").unwrap_err();
        assert_eq!(err, CliError::InvalidUnits("kelvin".to_string()));
        assert!(err.to_string().contains("Invalid units"));
    }

    #[test]
    fn test_parse_pressure_and_time_format() {
        assert_eq!(parse_pressure_unit_arg("inHg").unwrap(), PressureUnit::InHg);
        assert_eq!(parse_pressure_unit_arg("kpa").unwrap(), PressureUnit::Kpa);
        assert!(parse_pressure_unit_arg("psi").is_err());
        assert_eq!(parse_time_format_arg("24h").unwrap(), TimeFormat::H24);
        assert!(parse_time_format_arg("13h").is_err());
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["skyglance"]);
        assert!(cli.city.is_none());
        assert!(cli.lat.is_none());
        assert!(!cli.refresh);
        assert!(!cli.json);
        assert!(cli.dismiss.is_empty());
    }

    #[test]
    fn test_cli_parse_negative_coordinates() {
        let cli = Cli::parse_from(["skyglance", "--lat", "37.7749", "--lon", "-122.4194"]);
        assert_eq!(cli.lat, Some(37.7749));
        assert_eq!(cli.lon, Some(-122.4194));
    }

    #[test]
    fn test_cli_lat_requires_lon() {
        assert!(Cli::try_parse_from(["skyglance", "--lat", "10"]).is_err());
    }

    #[test]
    fn test_cli_city_conflicts_with_coordinates() {
        let result =
            Cli::try_parse_from(["skyglance", "--city", "Paris", "--lat", "1", "--lon", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_repeated_dismiss() {
        let cli = Cli::parse_from(["skyglance", "--dismiss", "a", "--dismiss", "b"]);
        assert_eq!(cli.dismiss, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_startup_config_uses_preferences() {
        let prefs = Preferences {
            temperature_unit: TemperatureUnit::Imperial,
            pressure_unit: PressureUnit::InHg,
            time_format: TimeFormat::H24,
            location: Some(Location::new("Toronto", 43.6532, -79.3832)),
        };
        let cli = Cli::parse_from(["skyglance"]);
        let config = StartupConfig::from_cli(&cli, &prefs).unwrap();

        assert_eq!(config.units, TemperatureUnit::Imperial);
        assert_eq!(config.pressure_unit, PressureUnit::InHg);
        assert_eq!(config.time_format, TimeFormat::H24);
        assert_eq!(
            config.location,
            LocationRequest::Saved(Location::new("Toronto", 43.6532, -79.3832))
        );
    }

    #[test]
    fn test_startup_config_flags_override_preferences() {
        let prefs = Preferences {
            temperature_unit: TemperatureUnit::Imperial,
            ..Preferences::default()
        };
        let cli = Cli::parse_from(["skyglance", "--units", "metric", "--city", " Oslo "]);
        let config = StartupConfig::from_cli(&cli, &prefs).unwrap();

        assert_eq!(config.units, TemperatureUnit::Metric);
        assert_eq!(config.location, LocationRequest::City("Oslo".to_string()));
    }

    #[test]
    fn test_startup_config_default_location() {
        let cli = Cli::parse_from(["skyglance"]);
        let config = StartupConfig::from_cli(&cli, &Preferences::default()).unwrap();
        assert_eq!(config.location, LocationRequest::Default);
        assert!(!config.save);
    }

    #[test]
    fn test_startup_config_rejects_out_of_range_coordinates() {
        let cli = Cli::parse_from(["skyglance", "--lat", "95", "--lon", "0"]);
        let result = StartupConfig::from_cli(&cli, &Preferences::default());
        assert_eq!(result.unwrap_err(), CliError::InvalidCoordinates(95.0, 0.0));
    }

    #[test]
    fn test_startup_config_invalid_time_format() {
        let cli = Cli::parse_from(["skyglance", "--time-format", "noon"]);
        assert!(StartupConfig::from_cli(&cli, &Preferences::default()).is_err());
    }

    #[test]
    fn test_to_preferences_carries_location() {
        let cli = Cli::parse_from(["skyglance", "--units", "imperial", "--save"]);
        let config = StartupConfig::from_cli(&cli, &Preferences::default()).unwrap();
        let location = Location::new("Oslo", 59.91, 10.75);

        let prefs = config.to_preferences(&location);
        assert_eq!(prefs.temperature_unit, TemperatureUnit::Imperial);
        assert_eq!(prefs.location, Some(location));
    }
}
