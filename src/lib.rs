//! skyglance library
//!
//! Fetches forecasts from Open-Meteo, normalizes them into a [`data::WeatherRecord`]
//! aligned to the current hour, and caches the result. Alerts come from the
//! National Weather Service or Environment Canada depending on location.

pub mod alerts;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod normalizer;
pub mod pipeline;
pub mod refresh;
pub mod report;
pub mod units;
