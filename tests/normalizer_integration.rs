//! Integration tests for the forecast pipeline using wiremock
//!
//! Every service is routed to a mock server through `Endpoints::with_base`.

use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skyglance::cache::{KeyValueStore, MemoryStore, WeatherCache, WEATHER_CACHE_KEY};
use skyglance::config::Endpoints;
use skyglance::data::{build_http_client, FetchError, ForecastClient, Location};
use skyglance::normalizer::WeatherNormalizer;
use skyglance::refresh::{RefreshConfig, RefreshHandle, RefreshMessage};
use skyglance::units::{TemperatureUnit, TimeFormat};

/// Eight days of hourly data from 2024-07-14, "now" at 2024-07-15 14:00
fn forecast_body() -> serde_json::Value {
    let start = NaiveDate::from_ymd_opt(2024, 7, 14)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let hours = 8 * 24;
    let times: Vec<String> = (0..hours)
        .map(|i| (start + Duration::hours(i)).format("%Y-%m-%dT%H:%M").to_string())
        .collect();
    let mut temperature: Vec<f64> = (0..hours).map(|i| 10.0 + (i % 24) as f64 * 0.5).collect();
    temperature[14] = 15.0;
    temperature[38] = 18.0;
    let dates: Vec<String> = (0..8)
        .map(|d| (start.date() + Duration::days(d)).format("%Y-%m-%d").to_string())
        .collect();

    serde_json::json!({
        "latitude": 37.77,
        "longitude": -122.42,
        "timezone": "America/Los_Angeles",
        "current_weather": {
            "time": "2024-07-15T14:00",
            "temperature": 18.0,
            "weathercode": 0
        },
        "hourly": {
            "time": times,
            "temperature_2m": temperature,
            "weather_code": vec![1; hours as usize],
            "relative_humidity_2m": vec![60.0; hours as usize],
            "surface_pressure": vec![1012.0; hours as usize],
            "windspeed_10m": vec![10.0; hours as usize]
        },
        "daily": {
            "time": dates,
            "sunrise": dates.iter().map(|d| format!("{}T05:55", d)).collect::<Vec<_>>(),
            "sunset": dates.iter().map(|d| format!("{}T20:30", d)).collect::<Vec<_>>(),
            "temperature_2m_max": vec![22.0; 8],
            "temperature_2m_min": vec![13.0; 8]
        }
    })
}

fn normalizer_for(server: &MockServer, store: Arc<dyn KeyValueStore>) -> WeatherNormalizer {
    let endpoints = Endpoints::with_base(&server.uri());
    let client = build_http_client().unwrap();
    WeatherNormalizer::new(
        ForecastClient::new(client, &endpoints),
        WeatherCache::new(store),
        TimeFormat::H12,
    )
}

async fn mount_forecast(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("timezone", "auto"))
        .and(query_param("past_days", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_builds_record_when_air_quality_fails() {
    let server = MockServer::start().await;
    mount_forecast(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let record = normalizer
        .fetch(&Location::default_location(), TemperatureUnit::Metric)
        .await
        .unwrap();

    assert_eq!(record.timezone, "America/Los_Angeles");
    assert_eq!(record.hourly.len(), 24);
    assert_eq!(record.hourly[0].label, "Now");
    assert_eq!(record.current.snapshot.temperature, Some(18.0));
    assert_eq!(record.current.deltas.temperature, Some(3.0));
    assert!(record.current.air_quality.is_none());
    assert_eq!(record.daily.len(), 7);
    assert_eq!(record.daily[0].label, "Mon");
    assert_eq!(record.today.max, Some(22.0));
}

#[tokio::test]
async fn test_fetch_includes_air_quality() {
    let server = MockServer::start().await;
    mount_forecast(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": { "european_aqi": 21.0, "pm2_5": 4.5, "pm10": 8.1 }
        })))
        .mount(&server)
        .await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let record = normalizer
        .fetch(&Location::default_location(), TemperatureUnit::Metric)
        .await
        .unwrap();

    let air = record.current.air_quality.unwrap();
    assert_eq!(air.european_aqi, Some(21.0));
    assert_eq!(air.pm2_5, Some(4.5));
}

#[tokio::test]
async fn test_forecast_error_status_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let normalizer = normalizer_for(&server, store.clone());
    let err = normalizer
        .fetch(&Location::default_location(), TemperatureUnit::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to fetch weather: HTTP 503 Service Unavailable");
    match err {
        FetchError::Status(status) => assert_eq!(status.as_u16(), 503),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.get(WEATHER_CACHE_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let server = MockServer::start().await;
    mount_forecast(&server, 1).await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let location = Location::default_location();

    let first = normalizer.fetch(&location, TemperatureUnit::Metric).await.unwrap();
    let second = normalizer.fetch(&location, TemperatureUnit::Metric).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_units_change_misses_cache() {
    let server = MockServer::start().await;
    mount_forecast(&server, 2).await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let location = Location::default_location();

    normalizer.fetch(&location, TemperatureUnit::Metric).await.unwrap();
    normalizer.fetch(&location, TemperatureUnit::Imperial).await.unwrap();
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let server = MockServer::start().await;
    mount_forecast(&server, 2).await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let location = Location::default_location();

    normalizer.fetch(&location, TemperatureUnit::Metric).await.unwrap();
    normalizer.refresh(&location, TemperatureUnit::Metric).await.unwrap();
}

#[tokio::test]
async fn test_refresh_handle_delivers_update_on_request() {
    let server = MockServer::start().await;
    mount_forecast(&server, 1).await;

    let normalizer = normalizer_for(&server, Arc::new(MemoryStore::new()));
    let mut handle = RefreshHandle::spawn(
        normalizer,
        Location::default_location(),
        TemperatureUnit::Metric,
        RefreshConfig {
            interval: StdDuration::from_secs(3600),
            enabled: false,
        },
    );
    handle.request_refresh();

    let started = tokio::time::timeout(StdDuration::from_secs(5), handle.receiver.recv())
        .await
        .unwrap()
        .unwrap();
    let generation = match started {
        RefreshMessage::RefreshStarted { generation } => generation,
        other => panic!("expected RefreshStarted, got {other:?}"),
    };

    let updated = tokio::time::timeout(StdDuration::from_secs(5), handle.receiver.recv())
        .await
        .unwrap()
        .unwrap();
    match updated {
        RefreshMessage::WeatherUpdated {
            generation: g,
            record,
        } => {
            assert_eq!(g, generation);
            assert!(handle.tracker().is_current(g));
            assert_eq!(record.hourly[0].label, "Now");
        }
        other => panic!("expected WeatherUpdated, got {other:?}"),
    }

    handle.shutdown().await;
}
