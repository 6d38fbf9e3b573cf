//! Derived summaries: short-term pressure trend and yesterday comparisons

use serde::Serialize;

use crate::data::{CurrentConditions, ForecastPoint};
use crate::units::TemperatureUnit;

/// Samples averaged on each side of the trend comparison
const TREND_SPAN: usize = 3;

/// Mean pressure change below which the trend is steady, hPa
const STEADY_THRESHOLD_HPA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureTrend {
    Rising,
    Falling,
    Steady,
}

impl PressureTrend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Rising => "↑",
            Self::Falling => "↓",
            Self::Steady => "→",
        }
    }

    pub fn prediction(&self) -> &'static str {
        match self {
            Self::Rising => "Improving weather likely",
            Self::Falling => "Unsettled weather possible",
            Self::Steady => "Little change expected",
        }
    }
}

/// Result of [`three_hour_trend`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendReading {
    pub trend: PressureTrend,
    /// Difference of the two 3-hour means, hPa
    pub change: f64,
}

/// Compares mean pressure over the next three hours with the three after that
///
/// `hourly` is the forward window, so its first element is the current hour.
/// Missing or zero pressures are skipped; `None` when fewer than six usable
/// samples remain.
pub fn three_hour_trend(hourly: &[ForecastPoint]) -> Option<TrendReading> {
    let pressures: Vec<f64> = hourly
        .iter()
        .filter_map(|point| point.pressure)
        .filter(|p| p.is_finite() && *p != 0.0)
        .take(TREND_SPAN * 2)
        .collect();
    if pressures.len() < TREND_SPAN * 2 {
        return None;
    }

    let (first, next) = pressures.split_at(TREND_SPAN);
    let change = mean(next) - mean(first);
    let trend = if change.abs() < STEADY_THRESHOLD_HPA {
        PressureTrend::Steady
    } else if change > 0.0 {
        PressureTrend::Rising
    } else {
        PressureTrend::Falling
    };

    Some(TrendReading { trend, change })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonKind {
    Temperature,
    Precipitation,
    Wind,
    Humidity,
    Pressure,
}

/// One human-readable line comparing now with the same hour yesterday
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub kind: ComparisonKind,
    pub text: String,
}

impl Comparison {
    fn new(kind: ComparisonKind, text: String) -> Self {
        Self { kind, text }
    }
}

/// Builds comparison lines for every delta that is available
pub fn yesterday_comparisons(current: &CurrentConditions, units: TemperatureUnit) -> Vec<Comparison> {
    let deltas = &current.deltas;
    let mut lines = Vec::new();

    if let Some(diff) = deltas.temperature {
        let diff = diff.round();
        let text = if diff == 0.0 {
            "Same as yesterday".to_string()
        } else {
            let direction = if diff > 0.0 { "warmer" } else { "colder" };
            format!("{}° {} than yesterday", diff.abs(), direction)
        };
        lines.push(Comparison::new(ComparisonKind::Temperature, text));
    }

    if let Some(diff) = deltas.precipitation {
        let text = if diff.abs() < 0.1 {
            similar()
        } else {
            let direction = if diff > 0.0 { "more" } else { "less" };
            format!("{:.1}mm {} than yesterday", diff.abs(), direction)
        };
        lines.push(Comparison::new(ComparisonKind::Precipitation, text));
    }

    if let Some(diff) = deltas.wind {
        let diff = diff.round();
        let text = if diff.abs() < 2.0 {
            similar()
        } else {
            let direction = if diff > 0.0 { "windier" } else { "calmer" };
            format!(
                "{} {} {} than yesterday",
                diff.abs(),
                units.wind_symbol(),
                direction
            )
        };
        lines.push(Comparison::new(ComparisonKind::Wind, text));
    }

    if let Some(diff) = deltas.humidity {
        let diff = diff.round();
        let text = if diff.abs() < 3.0 {
            similar()
        } else {
            let direction = if diff > 0.0 { "more humid" } else { "drier" };
            format!("{}% {} than yesterday", diff.abs(), direction)
        };
        lines.push(Comparison::new(ComparisonKind::Humidity, text));
    }

    if let Some(diff) = deltas.pressure {
        let text = if diff.abs() < 1.0 {
            similar()
        } else {
            let direction = if diff > 0.0 { "higher" } else { "lower" };
            format!("{:.1} hPa {} than yesterday", diff.abs(), direction)
        };
        lines.push(Comparison::new(ComparisonKind::Pressure, text));
    }

    lines
}

fn similar() -> String {
    "Similar to yesterday".to_string()
}
