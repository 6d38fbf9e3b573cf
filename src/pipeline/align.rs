//! Alignment of the hourly series against "now"
//!
//! The forecast API returns hourly buckets in the location's local time, which
//! rarely line up exactly with the instant of the request. Alignment walks a
//! strict-to-relaxed chain of rules and always produces an index.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::ops::Range;

use crate::units::TimeFormat;

/// Length of the forward hourly window
pub const WINDOW_HOURS: usize = 24;

/// Label given to the first element of the forward window
pub const NOW_LABEL: &str = "Now";

/// Finds the index of the hourly entry representing the current hour
///
/// Rules, first match wins:
/// 1. same hour-of-day and same day-of-month as `now`
/// 2. hour-of-day within ±1 and same day-of-month
/// 3. first entry at or after `now`
/// 4. first entry after `now`
/// 5. index 0
///
/// Never panics; an empty slice yields 0.
pub fn find_current_index(times: &[NaiveDateTime], now: NaiveDateTime) -> usize {
    let same_day = |t: &NaiveDateTime| t.day() == now.day();

    times
        .iter()
        .position(|t| t.hour() == now.hour() && same_day(t))
        .or_else(|| {
            times
                .iter()
                .position(|t| t.hour().abs_diff(now.hour()) <= 1 && same_day(t))
        })
        .or_else(|| times.iter().position(|t| *t >= now))
        .or_else(|| times.iter().position(|t| *t > now))
        .unwrap_or(0)
}

/// Index range of the forward window starting at `index`, clamped to `len`
pub fn forward_window(len: usize, index: usize) -> Range<usize> {
    let start = index.min(len);
    let end = index.saturating_add(WINDOW_HOURS).min(len);
    start..end
}

/// Hour label such as "3PM" (12h) or "15:00" (24h)
pub fn format_hour_label(time: NaiveDateTime, format: TimeFormat) -> String {
    match format {
        TimeFormat::H12 => {
            let (pm, hour) = time.hour12();
            format!("{}{}", hour, if pm { "PM" } else { "AM" })
        }
        TimeFormat::H24 => format!("{:02}:{:02}", time.hour(), time.minute()),
    }
}

/// Short weekday label such as "Mon"
pub fn format_day_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// Whether `now` falls outside daylight, comparing time-of-day only
///
/// Dates are ignored so that a sunrise/sunset from an adjacent day still
/// classifies the current time correctly. Seconds are not considered.
pub fn is_night(now: NaiveTime, sunrise: NaiveTime, sunset: NaiveTime) -> bool {
    let now = hour_fraction(now);
    now < hour_fraction(sunrise) || now > hour_fraction(sunset)
}

fn hour_fraction(t: NaiveTime) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}
