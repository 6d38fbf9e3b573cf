//! Normalization pipeline stages
//!
//! Pure functions over the raw hourly and daily series: alignment against
//! "now", day-window aggregation, yesterday deltas and derived trends.

pub mod aggregate;
pub mod align;
pub mod delta;
pub mod trend;

pub use aggregate::{
    first_in_window, max_in_window, mean_in_window, min_in_window, sum_in_window, DayWindow,
};
pub use align::{find_current_index, format_day_label, format_hour_label, forward_window, is_night};
pub use delta::{delta_from_yesterday, DeltaSeries};
pub use trend::{
    three_hour_trend, yesterday_comparisons, Comparison, ComparisonKind, PressureTrend, TrendReading,
};
