//! Same-hour-yesterday deltas
//!
//! The forecast request asks for one past day, so with hourly samples the
//! entry 24 positions before the aligned "now" index is the same hour
//! yesterday. Deltas are advisory: anything unexpected yields `None`.

use crate::data::Deltas;

/// Number of hourly samples in one day
pub const SAMPLES_PER_DAY: usize = 24;

/// `samples[i] - samples[i - 24]`, or `None` if either side is unavailable
pub fn delta_from_yesterday(samples: &[Option<f64>], i: usize) -> Option<f64> {
    let yesterday = i.checked_sub(SAMPLES_PER_DAY)?;
    let now = (*samples.get(i)?)?;
    let then = (*samples.get(yesterday)?)?;
    let delta = now - then;
    delta.is_finite().then_some(delta)
}

/// Hourly series the deltas are computed over, indexed like the hourly timestamps
#[derive(Debug, Clone, Copy)]
pub struct DeltaSeries<'a> {
    pub temperature: &'a [Option<f64>],
    pub precipitation: &'a [Option<f64>],
    pub wind_speed: &'a [Option<f64>],
    pub humidity: &'a [Option<f64>],
    pub pressure: &'a [Option<f64>],
}

impl Deltas {
    /// Computes every tracked delta at the aligned index
    pub fn compute(series: DeltaSeries<'_>, i: usize) -> Self {
        Self {
            temperature: delta_from_yesterday(series.temperature, i),
            precipitation: delta_from_yesterday(series.precipitation, i),
            wind: delta_from_yesterday(series.wind_speed, i),
            humidity: delta_from_yesterday(series.humidity, i),
            pressure: delta_from_yesterday(series.pressure, i),
        }
    }
}
