//! Plain-text and JSON rendering of a forecast for the terminal

use serde::Serialize;

use crate::alerts::WeatherAlert;
use crate::data::{GeocodeResult, Location, WeatherRecord};
use crate::pipeline::{three_hour_trend, yesterday_comparisons, TrendReading};
use crate::units::{degrees_to_compass, format_pressure_or_default, PressureUnit, TemperatureUnit};

const MISSING: &str = "--";

/// Everything printed by `--json`
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub location: &'a Location,
    pub units: TemperatureUnit,
    pub pressure_unit: PressureUnit,
    pub pressure_trend: Option<TrendReading>,
    #[serde(flatten)]
    pub record: &'a WeatherRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<&'a [WeatherAlert]>,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        location: &'a Location,
        record: &'a WeatherRecord,
        units: TemperatureUnit,
        pressure_unit: PressureUnit,
    ) -> Self {
        Self {
            location,
            units,
            pressure_unit,
            pressure_trend: three_hour_trend(&record.hourly),
            record,
            alerts: None,
        }
    }

    pub fn with_alerts(mut self, alerts: &'a [WeatherAlert]) -> Self {
        self.alerts = Some(alerts);
        self
    }
}

fn temp(value: Option<f64>) -> String {
    value
        .map(|v| format!("{}°", v.round()))
        .unwrap_or_else(|| MISSING.to_string())
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{}%", v.round()))
        .unwrap_or_else(|| MISSING.to_string())
}

fn wind(speed: Option<f64>, direction: Option<f64>, units: TemperatureUnit) -> String {
    match (speed, direction) {
        (Some(speed), Some(deg)) => {
            format!("{} {} {}", speed.round(), units.wind_symbol(), degrees_to_compass(deg))
        }
        (Some(speed), None) => format!("{} {}", speed.round(), units.wind_symbol()),
        _ => MISSING.to_string(),
    }
}

/// Multi-line summary: current conditions, comparisons, hourly and daily tables
pub fn render_record(
    record: &WeatherRecord,
    location: &Location,
    units: TemperatureUnit,
    pressure_unit: PressureUnit,
) -> String {
    let current = &record.current;
    let now = &current.snapshot;
    let mut lines = Vec::new();

    let place = match &location.country {
        Some(country) => format!("{}, {}", location.name, country),
        None => location.name.clone(),
    };
    lines.push(format!("{} ({})", place, record.timezone));
    lines.push(format!(
        "{} {}{}  {}",
        now.icon,
        temp(now.temperature),
        units.temperature_symbol().trim_start_matches('°'),
        current.description
    ));
    lines.push(format!(
        "Feels like {}  High {}  Low {}",
        temp(now.apparent_temperature),
        temp(record.today.max),
        temp(record.today.min)
    ));
    lines.push(format!(
        "Wind {}  Humidity {}  Precip {}",
        wind(now.wind_speed, now.wind_direction, units),
        percent(now.humidity),
        percent(now.precipitation_probability)
    ));

    let mut pressure_line = format!(
        "Pressure {}",
        format_pressure_or_default(now.pressure, pressure_unit)
    );
    if let Some(reading) = three_hour_trend(&record.hourly) {
        pressure_line.push_str(&format!(
            " {} {}",
            reading.trend.arrow(),
            reading.trend.prediction()
        ));
    }
    lines.push(pressure_line);

    if let Some(air) = &current.air_quality {
        lines.push(format!(
            "Air quality: AQI {}  PM2.5 {}  PM10 {}",
            air.european_aqi.map_or(MISSING.to_string(), |v| v.round().to_string()),
            air.pm2_5.map_or(MISSING.to_string(), |v| format!("{:.1}", v)),
            air.pm10.map_or(MISSING.to_string(), |v| format!("{:.1}", v)),
        ));
    }

    let comparisons = yesterday_comparisons(current, units);
    if !comparisons.is_empty() {
        lines.push(String::new());
        lines.push("Compared with yesterday:".to_string());
        lines.extend(comparisons.into_iter().map(|c| format!("  {}", c.text)));
    }

    if !record.hourly.is_empty() {
        lines.push(String::new());
        lines.push("Next 24 hours:".to_string());
        for point in &record.hourly {
            lines.push(format!(
                "  {:>6} {} {:>5} {:>5}",
                point.label,
                point.icon,
                temp(point.temperature),
                percent(point.precipitation_probability)
            ));
        }
    }

    if !record.daily.is_empty() {
        lines.push(String::new());
        lines.push("Daily:".to_string());
        for day in &record.daily {
            lines.push(format!(
                "  {:<4} {} {:>5} / {:<5} {:>5}  {}",
                day.label,
                day.icon,
                temp(day.max),
                temp(day.min),
                percent(day.precipitation_probability_max),
                format_pressure_or_default(day.pressure_mean, pressure_unit)
            ));
        }
    }

    lines.join("\n")
}

/// One block per alert, with its id so it can be dismissed
pub fn render_alerts(alerts: &[WeatherAlert]) -> String {
    if alerts.is_empty() {
        return "No active weather alerts".to_string();
    }
    let mut lines = Vec::new();
    for alert in alerts {
        lines.push(format!("[{}] {}", alert.severity.as_str().to_uppercase(), alert.title));
        lines.push(format!("  {} | {}", alert.sender, alert.area));
        if let Some(expires) = &alert.expires {
            lines.push(format!("  Expires {}", expires));
        }
        lines.push(format!("  {}", alert.description.trim()));
        if let Some(url) = &alert.url {
            lines.push(format!("  {}", url));
        }
        lines.push(format!("  id: {}", alert.id));
    }
    lines.join("\n")
}

pub fn render_search(results: &[GeocodeResult]) -> String {
    if results.is_empty() {
        return "No matching places".to_string();
    }
    results
        .iter()
        .map(|r| {
            let country = r.country.as_deref().unwrap_or("");
            format!("{}, {} ({:.4}, {:.4})", r.name, country, r.latitude, r.longitude)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertSeverity;
    use crate::data::{
        ConditionCategory, CurrentConditions, DayAggregate, Deltas, ForecastPoint, TodayRange,
    };
    use chrono::NaiveDate;

    fn point(hour: u32, label: &str, pressure: f64) -> ForecastPoint {
        ForecastPoint {
            time: NaiveDate::from_ymd_opt(2024, 7, 15)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            label: label.to_string(),
            temperature: Some(18.4),
            apparent_temperature: Some(17.0),
            weather_code: Some(0),
            icon: "☀️".to_string(),
            precipitation_mm: Some(0.0),
            precipitation_probability: Some(10.0),
            wind_speed: Some(12.0),
            wind_direction: Some(270.0),
            humidity: Some(60.0),
            pressure: Some(pressure),
            uv_index: None,
            dew_point: None,
            visibility: None,
            cloud_cover: None,
        }
    }

    fn record() -> WeatherRecord {
        let hourly: Vec<ForecastPoint> = (0..8)
            .map(|i| point(14 + i, if i == 0 { "Now" } else { "3PM" }, 1010.0 + i as f64))
            .collect();
        WeatherRecord {
            timezone: "America/Los_Angeles".to_string(),
            current: CurrentConditions {
                snapshot: hourly[0].clone(),
                is_night: false,
                condition: ConditionCategory::Sunny,
                description: "sunny".to_string(),
                deltas: Deltas {
                    temperature: Some(3.0),
                    ..Deltas::default()
                },
                air_quality: None,
            },
            daily: vec![DayAggregate {
                date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
                label: "Mon".to_string(),
                max: Some(22.0),
                min: Some(12.0),
                weather_code: Some(0),
                icon: "☀️".to_string(),
                precipitation_sum: None,
                precipitation_probability_max: Some(20.0),
                wind_speed_max: None,
                wind_direction_dominant: None,
                humidity_mean: None,
                pressure_mean: Some(1012.5),
                uv_index_max: None,
                sunrise: None,
                sunset: None,
            }],
            hourly,
            today: TodayRange {
                max: Some(22.0),
                min: Some(12.0),
            },
        }
    }

    #[test]
    fn test_render_record_sections() {
        let location = Location::default_location();
        let text = render_record(&record(), &location, TemperatureUnit::Metric, PressureUnit::Hpa);

        assert!(text.starts_with("San Francisco, US (America/Los_Angeles)"));
        assert!(text.contains("18°C  sunny"));
        assert!(text.contains("Wind 12 km/h W"));
        assert!(text.contains("Pressure 1010 hPa ↑ Improving weather likely"));
        assert!(text.contains("3° warmer than yesterday"));
        assert!(text.contains("Next 24 hours:"));
        assert!(text.contains("Mon"));
    }

    #[test]
    fn test_render_record_pressure_unit() {
        let location = Location::new("Somewhere", 0.0, 0.0);
        let mut record = record();
        record.current.snapshot.pressure = None;
        let text = render_record(&record, &location, TemperatureUnit::Imperial, PressureUnit::InHg);

        assert!(text.contains("Pressure 29.91 inHg"));
        assert!(text.contains("12 mph W"));
    }

    #[test]
    fn test_render_alerts() {
        assert_eq!(render_alerts(&[]), "No active weather alerts");

        let alert = WeatherAlert {
            id: "abc".to_string(),
            title: "Heat Warning".to_string(),
            description: "Hot.".to_string(),
            severity: AlertSeverity::Severe,
            url: None,
            sender: "Environment Canada".to_string(),
            area: "Toronto".to_string(),
            expires: None,
        };
        let text = render_alerts(&[alert]);
        assert!(text.starts_with("[SEVERE] Heat Warning"));
        assert!(text.contains("id: abc"));
    }

    #[test]
    fn test_json_report_flattens_record() {
        let location = Location::default_location();
        let record = record();
        let report = JsonReport::new(&location, &record, TemperatureUnit::Metric, PressureUnit::Kpa);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["units"], "metric");
        assert_eq!(value["pressure_unit"], "kPa");
        assert_eq!(value["pressure_trend"]["trend"], "rising");
        assert_eq!(value["timezone"], "America/Los_Angeles");
        assert!(value.get("alerts").is_none());
    }
}
