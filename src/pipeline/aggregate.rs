//! Reductions of hourly samples over calendar-day windows
//!
//! A day window is the local midnight-to-midnight span of a date. Hourly
//! timestamps and values are positionally aligned; a sample is counted when
//! its timestamp falls inside the window and its value is present and finite.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Half-open `[start, end)` local-time span of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }
}

fn samples_in_window<'a>(
    times: &'a [NaiveDateTime],
    values: &'a [Option<f64>],
    window: DayWindow,
) -> impl Iterator<Item = f64> + 'a {
    times
        .iter()
        .zip(values.iter())
        .filter(move |(time, _)| window.contains(**time))
        .filter_map(|(_, value)| *value)
        .filter(|value| value.is_finite())
}

/// Arithmetic mean of the qualifying samples in the window
///
/// Zero readings are excluded along with missing ones (a zero surface pressure
/// is a sensor gap, not a measurement). Returns `None` rather than `NaN` when
/// nothing qualifies.
pub fn mean_in_window(
    times: &[NaiveDateTime],
    values: &[Option<f64>],
    window: DayWindow,
) -> Option<f64> {
    let (sum, count) = samples_in_window(times, values, window)
        .filter(|value| *value != 0.0)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Largest sample in the window
pub fn max_in_window(
    times: &[NaiveDateTime],
    values: &[Option<f64>],
    window: DayWindow,
) -> Option<f64> {
    samples_in_window(times, values, window).reduce(f64::max)
}

/// Smallest sample in the window
pub fn min_in_window(
    times: &[NaiveDateTime],
    values: &[Option<f64>],
    window: DayWindow,
) -> Option<f64> {
    samples_in_window(times, values, window).reduce(f64::min)
}

/// Total of the samples in the window, `None` when there are none
pub fn sum_in_window(
    times: &[NaiveDateTime],
    values: &[Option<f64>],
    window: DayWindow,
) -> Option<f64> {
    samples_in_window(times, values, window).fold(None, |total, v| Some(total.unwrap_or(0.0) + v))
}

/// First present sample in the window
pub fn first_in_window(
    times: &[NaiveDateTime],
    values: &[Option<f64>],
    window: DayWindow,
) -> Option<f64> {
    samples_in_window(times, values, window).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hours(start: &str, count: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M").unwrap();
        (0..count).map(|i| start + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_day_window_bounds() {
        let window = DayWindow::for_date(date("2024-07-15"));
        let times = hours("2024-07-14T23:00", 3);
        assert!(!window.contains(times[0]));
        assert!(window.contains(times[1]));
        assert!(window.contains(hours("2024-07-15T23:00", 1)[0]));
        assert!(!window.contains(hours("2024-07-16T00:00", 1)[0]));
    }

    #[test]
    fn test_pressure_mean_skips_missing_samples() {
        let times = hours("2024-07-15T00:00", 5);
        let pressure = vec![Some(1005.0), Some(1010.0), Some(1015.0), None, Some(1020.0)];

        let mean = mean_in_window(&times, &pressure, DayWindow::for_date(date("2024-07-15")));

        assert_eq!(mean, Some(1012.5));
    }

    #[test]
    fn test_mean_excludes_zero_and_non_finite() {
        let times = hours("2024-07-15T00:00", 4);
        let values = vec![Some(0.0), Some(1000.0), Some(f64::NAN), Some(1010.0)];
        let mean = mean_in_window(&times, &values, DayWindow::for_date(date("2024-07-15")));
        assert_eq!(mean, Some(1005.0));
    }

    #[test]
    fn test_mean_none_for_empty_window() {
        let times = hours("2024-07-15T00:00", 24);
        let values = vec![Some(1000.0); 24];

        let mean = mean_in_window(&times, &values, DayWindow::for_date(date("2024-07-17")));
        assert_eq!(mean, None);

        let gaps = vec![None, Some(0.0), None];
        let mean = mean_in_window(&times[..3], &gaps, DayWindow::for_date(date("2024-07-15")));
        assert_eq!(mean, None);
    }

    #[test]
    fn test_mean_only_counts_samples_of_that_day() {
        let times = hours("2024-07-14T00:00", 48);
        let values: Vec<Option<f64>> =
            (0..48).map(|i| Some(if i < 24 { 990.0 } else { 1020.0 })).collect();

        assert_eq!(
            mean_in_window(&times, &values, DayWindow::for_date(date("2024-07-14"))),
            Some(990.0)
        );
        assert_eq!(
            mean_in_window(&times, &values, DayWindow::for_date(date("2024-07-15"))),
            Some(1020.0)
        );
    }

    #[test]
    fn test_max_and_first_in_window() {
        let times = hours("2024-07-15T22:00", 4);
        let values = vec![Some(40.0), None, Some(10.0), Some(30.0)];
        let window = DayWindow::for_date(date("2024-07-16"));

        assert_eq!(max_in_window(&times, &values, window), Some(30.0));
        assert_eq!(min_in_window(&times, &values, window), Some(10.0));
        assert_eq!(sum_in_window(&times, &values, window), Some(40.0));
        assert_eq!(first_in_window(&times, &values, window), Some(10.0));
        assert_eq!(
            max_in_window(&times, &values, DayWindow::for_date(date("2024-07-20"))),
            None
        );
    }

    #[test]
    fn test_mismatched_lengths_use_shorter_series() {
        let times = hours("2024-07-15T00:00", 3);
        let values = vec![Some(1000.0)];
        assert_eq!(
            mean_in_window(&times, &values, DayWindow::for_date(date("2024-07-15"))),
            Some(1000.0)
        );
    }
}
