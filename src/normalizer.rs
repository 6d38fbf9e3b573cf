//! Weather normalization: raw forecast payload to [`WeatherRecord`]
//!
//! [`WeatherNormalizer::fetch`] is the entry point used by the front end. It
//! answers from the cache when it can; otherwise it fetches the forecast and
//! air quality concurrently, runs [`normalize`] and stores the result.

use chrono::{NaiveDate, NaiveDateTime};

use crate::cache::{WeatherCache, WeatherKey};
use crate::data::codes::{condition_category, icon};
use crate::data::weather::{parse_date, parse_datetime, DailySeries, HourlySeries};
use crate::data::{
    AirQuality, CurrentConditions, DayAggregate, Deltas, FetchError, ForecastClient, ForecastPoint,
    ForecastResponse, Location, TodayRange, WeatherRecord,
};
use crate::pipeline::aggregate::{
    first_in_window, max_in_window, mean_in_window, min_in_window, sum_in_window, DayWindow,
};
use crate::pipeline::align::{
    find_current_index, format_day_label, format_hour_label, forward_window, is_night, NOW_LABEL,
};
use crate::pipeline::delta::DeltaSeries;
use crate::units::{TemperatureUnit, TimeFormat};

/// Maximum number of days in the daily forecast
pub const MAX_DAYS: usize = 7;

/// Cache-fronted forecast fetcher and normalizer
#[derive(Debug, Clone)]
pub struct WeatherNormalizer {
    client: ForecastClient,
    cache: WeatherCache,
    time_format: TimeFormat,
}

impl WeatherNormalizer {
    pub fn new(client: ForecastClient, cache: WeatherCache, time_format: TimeFormat) -> Self {
        Self {
            client,
            cache,
            time_format,
        }
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Returns the normalized forecast for `location` in `units`
    ///
    /// A valid cache entry is returned without any network access. Forecast
    /// failures are returned to the caller; air-quality failures only leave
    /// `air_quality` empty.
    pub async fn fetch(
        &self,
        location: &Location,
        units: TemperatureUnit,
    ) -> Result<WeatherRecord, FetchError> {
        let key = WeatherKey::new(location.latitude, location.longitude, units);
        if let Some(mut record) = self.cache.get(&key) {
            tracing::debug!(location = %location.name, "Weather cache hit");
            relabel_hours(&mut record.hourly, self.time_format);
            return Ok(record);
        }

        let (forecast, air) = futures::join!(
            self.client
                .fetch_forecast(location.latitude, location.longitude, units),
            self.client
                .fetch_air_quality(location.latitude, location.longitude)
        );

        let forecast = forecast?;
        let air_quality = match air {
            Ok(response) => response.into_air_quality(),
            Err(e) => {
                tracing::warn!(error = %e, "Air quality unavailable");
                None
            }
        };

        let record = normalize(&forecast, air_quality, self.time_format)?;
        self.cache.set(&record, &key);
        tracing::info!(
            location = %location.name,
            hours = record.hourly.len(),
            days = record.daily.len(),
            "Weather updated"
        );
        Ok(record)
    }

    /// Discards any cached forecast and fetches a fresh one
    pub async fn refresh(
        &self,
        location: &Location,
        units: TemperatureUnit,
    ) -> Result<WeatherRecord, FetchError> {
        self.cache.clear();
        self.fetch(location, units).await
    }
}

/// Rewrites hour labels for a different time format, keeping "Now" first
fn relabel_hours(hourly: &mut [ForecastPoint], format: TimeFormat) {
    for (i, point) in hourly.iter_mut().enumerate() {
        point.label = if i == 0 {
            NOW_LABEL.to_string()
        } else {
            format_hour_label(point.time, format)
        };
    }
}

/// Finite value at `i`, if any
fn sample(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().filter(|v| v.is_finite())
}

fn code_at(codes: &[Option<u8>], i: usize) -> Option<u8> {
    codes.get(i).copied().flatten()
}

fn optional_datetime(values: &[Option<String>], i: usize) -> Option<NaiveDateTime> {
    let raw = values.get(i)?.as_deref()?;
    match parse_datetime(raw) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unparseable sun time");
            None
        }
    }
}

/// Local daylight bounds used to classify hours as day or night
#[derive(Debug, Clone, Copy)]
struct Daylight {
    sunrise: Option<NaiveDateTime>,
    sunset: Option<NaiveDateTime>,
}

impl Daylight {
    /// Time-of-day comparison; without both bounds every hour counts as day
    fn is_night_at(&self, time: NaiveDateTime) -> bool {
        match (self.sunrise, self.sunset) {
            (Some(sunrise), Some(sunset)) => is_night(time.time(), sunrise.time(), sunset.time()),
            _ => false,
        }
    }
}

fn hourly_point(
    hourly: &HourlySeries,
    time: NaiveDateTime,
    i: usize,
    label: String,
    night: bool,
) -> ForecastPoint {
    let weather_code = code_at(&hourly.weather_code, i);
    ForecastPoint {
        time,
        label,
        temperature: sample(&hourly.temperature_2m, i),
        apparent_temperature: sample(&hourly.apparent_temperature, i),
        weather_code,
        icon: icon(weather_code, night).to_string(),
        precipitation_mm: sample(&hourly.precipitation, i),
        precipitation_probability: sample(&hourly.precipitation_probability, i),
        wind_speed: sample(&hourly.windspeed_10m, i),
        wind_direction: sample(&hourly.winddirection_10m, i),
        humidity: sample(&hourly.relative_humidity_2m, i),
        pressure: sample(&hourly.surface_pressure, i),
        uv_index: sample(&hourly.uv_index, i),
        dew_point: sample(&hourly.dewpoint_2m, i),
        visibility: sample(&hourly.visibility, i),
        cloud_cover: sample(&hourly.cloudcover, i),
    }
}

/// Builds one day from the daily fields, filling gaps from the hourly window
fn day_aggregate(
    daily: &DailySeries,
    hourly: &HourlySeries,
    times: &[NaiveDateTime],
    hourly_codes: &[Option<f64>],
    date: NaiveDate,
    i: usize,
) -> DayAggregate {
    let window = DayWindow::for_date(date);
    let weather_code = code_at(&daily.weather_code, i).or_else(|| {
        first_in_window(times, hourly_codes, window).map(|c| c as u8)
    });

    DayAggregate {
        date,
        label: format_day_label(date),
        max: sample(&daily.temperature_2m_max, i)
            .or_else(|| max_in_window(times, &hourly.temperature_2m, window)),
        min: sample(&daily.temperature_2m_min, i)
            .or_else(|| min_in_window(times, &hourly.temperature_2m, window)),
        weather_code,
        icon: icon(weather_code, false).to_string(),
        precipitation_sum: sample(&daily.precipitation_sum, i)
            .or_else(|| sum_in_window(times, &hourly.precipitation, window)),
        precipitation_probability_max: sample(&daily.precipitation_probability_max, i)
            .or_else(|| max_in_window(times, &hourly.precipitation_probability, window)),
        wind_speed_max: sample(&daily.wind_speed_10m_max, i)
            .or_else(|| max_in_window(times, &hourly.windspeed_10m, window)),
        wind_direction_dominant: sample(&daily.wind_direction_10m_dominant, i)
            .or_else(|| first_in_window(times, &hourly.winddirection_10m, window)),
        humidity_mean: sample(&daily.relative_humidity_2m_mean, i)
            .or_else(|| mean_in_window(times, &hourly.relative_humidity_2m, window)),
        pressure_mean: mean_in_window(times, &hourly.surface_pressure, window),
        uv_index_max: sample(&daily.uv_index_max, i)
            .or_else(|| max_in_window(times, &hourly.uv_index, window)),
        sunrise: optional_datetime(&daily.sunrise, i),
        sunset: optional_datetime(&daily.sunset, i),
    }
}

/// Turns a raw forecast payload into the canonical record
///
/// "Now" is the API's `current_weather.time` in the location's local time,
/// falling back to the first hourly timestamp. Pure: no I/O, no clock.
pub fn normalize(
    raw: &ForecastResponse,
    air_quality: Option<AirQuality>,
    time_format: TimeFormat,
) -> Result<WeatherRecord, FetchError> {
    let daily = &raw.daily;
    let (times, hourly) = raw.hourly.retain_parsed_times();
    let hourly = &hourly;
    let first_hour = *times
        .first()
        .ok_or_else(|| FetchError::MissingField("hourly.time".to_string()))?;

    let current_weather = raw.current_weather.clone().unwrap_or_default();
    let now = match current_weather.time.as_deref().map(parse_datetime) {
        Some(Ok(t)) => t,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Unparseable current time, using first hour");
            first_hour
        }
        None => first_hour,
    };

    // (daily index, date) pairs; days with a malformed date are skipped
    let dates: Vec<(usize, NaiveDate)> = daily
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, d)| match parse_date(d) {
            Ok(date) => Some((i, date)),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping day");
                None
            }
        })
        .collect();
    let today_index = dates
        .iter()
        .find(|(_, d)| *d == now.date())
        .map_or(0, |(i, _)| *i);
    let daylight = Daylight {
        sunrise: optional_datetime(&daily.sunrise, today_index),
        sunset: optional_datetime(&daily.sunset, today_index),
    };
    let night_now = daylight.is_night_at(now);

    let index = find_current_index(&times, now);
    let window = forward_window(times.len(), index);
    tracing::debug!(%now, index, "Aligned hourly series");

    let hourly_points: Vec<ForecastPoint> = window
        .clone()
        .enumerate()
        .map(|(offset, i)| {
            let label = if offset == 0 {
                NOW_LABEL.to_string()
            } else {
                format_hour_label(times[i], time_format)
            };
            hourly_point(hourly, times[i], i, label, daylight.is_night_at(times[i]))
        })
        .collect();

    let mut snapshot = hourly_point(hourly, times[index], index, NOW_LABEL.to_string(), night_now);
    snapshot.temperature = current_weather
        .temperature
        .filter(|t| t.is_finite())
        .or(snapshot.temperature);
    snapshot.weather_code = current_weather.weathercode.or(snapshot.weather_code);
    snapshot.icon = icon(snapshot.weather_code, night_now).to_string();

    let deltas = Deltas::compute(
        DeltaSeries {
            temperature: &hourly.temperature_2m,
            precipitation: &hourly.precipitation,
            wind_speed: &hourly.windspeed_10m,
            humidity: &hourly.relative_humidity_2m,
            pressure: &hourly.surface_pressure,
        },
        index,
    );

    let condition = condition_category(snapshot.weather_code, night_now);
    let current = CurrentConditions {
        snapshot,
        is_night: night_now,
        condition,
        description: condition.description().to_string(),
        deltas,
        air_quality,
    };

    let hourly_codes: Vec<Option<f64>> = hourly
        .weather_code
        .iter()
        .map(|c| c.map(f64::from))
        .collect();
    let days: Vec<DayAggregate> = dates
        .iter()
        .filter(|(_, date)| *date >= now.date())
        .take(MAX_DAYS)
        .map(|&(i, date)| day_aggregate(daily, hourly, &times, &hourly_codes, date, i))
        .collect();

    let today = days
        .first()
        .map(|day| TodayRange {
            max: day.max,
            min: day.min,
        })
        .unwrap_or_default();

    Ok(WeatherRecord {
        timezone: raw.timezone.clone(),
        current,
        hourly: hourly_points,
        daily: days,
        today,
    })
}
