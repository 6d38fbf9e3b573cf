//! skyglance - weather at a glance in the terminal
//!
//! Prints current conditions, the next 24 hours and the week ahead for a
//! place, with comparisons against the same hour yesterday.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use skyglance::alerts::{AlertsService, DismissedAlerts, WeatherAlert};
use skyglance::cache::{FileStore, KeyValueStore, MemoryStore, WeatherCache};
use skyglance::cli::{Cli, LocationRequest, StartupConfig};
use skyglance::config::{Endpoints, Preferences};
use skyglance::data::{build_http_client, ForecastClient, GeocodeClient, Location, WeatherRecord};
use skyglance::normalizer::WeatherNormalizer;
use skyglance::refresh::{or_shutdown, RefreshConfig, RefreshHandle, RefreshMessage, WeatherState};
use skyglance::report::{render_alerts, render_record, render_search, JsonReport};

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` overrides the level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cli: &Cli) -> Arc<dyn KeyValueStore> {
    if let Some(dir) = &cli.cache_dir {
        return Arc::new(FileStore::with_dir(dir));
    }
    match FileStore::new() {
        Some(store) => Arc::new(store),
        None => {
            tracing::warn!("No cache directory available, nothing will persist");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn resolve_location(request: &LocationRequest, geocoder: &GeocodeClient) -> Result<Location> {
    match request {
        LocationRequest::City(name) => {
            let found = geocoder
                .search(name)
                .await
                .into_iter()
                .next()
                .with_context(|| format!("No place found matching '{}'", name))?;
            Ok(found.into())
        }
        LocationRequest::Coordinates {
            latitude,
            longitude,
        } => Ok(match geocoder.reverse(*latitude, *longitude).await {
            Some(found) => found.into(),
            None => Location::new(
                Location::coordinate_label(*latitude, *longitude),
                *latitude,
                *longitude,
            ),
        }),
        LocationRequest::Saved(location) => Ok(location.clone()),
        LocationRequest::Default => Ok(Location::default_location()),
    }
}

fn print_report(
    config: &StartupConfig,
    location: &Location,
    record: &WeatherRecord,
    alerts: Option<&[WeatherAlert]>,
) -> Result<()> {
    if config.json {
        let mut report = JsonReport::new(location, record, config.units, config.pressure_unit);
        if let Some(alerts) = alerts {
            report = report.with_alerts(alerts);
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        render_record(record, location, config.units, config.pressure_unit)
    );
    if let Some(alerts) = alerts {
        println!();
        println!("{}", render_alerts(alerts));
    }
    Ok(())
}

async fn load_alerts(
    config: &StartupConfig,
    service: &AlertsService,
    location: &Location,
) -> Option<Vec<WeatherAlert>> {
    if !config.alerts {
        return None;
    }
    Some(
        service
            .active_alerts(location.latitude, location.longitude)
            .await,
    )
}

/// Prints a fresh report after every background refresh until Ctrl-C
async fn watch(
    normalizer: WeatherNormalizer,
    location: &Location,
    config: &StartupConfig,
    alerts: &AlertsService,
) -> Result<()> {
    let mut handle = RefreshHandle::spawn(
        normalizer,
        location.clone(),
        config.units,
        RefreshConfig::default(),
    );
    let mut state = WeatherState::new(handle.tracker());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let Some(Some(message)) = or_shutdown(handle.receiver.recv(), ctrl_c.as_mut()).await else {
            break;
        };
        let started = matches!(message, RefreshMessage::RefreshStarted { .. });
        if !state.apply(message, Utc::now()) || started {
            continue;
        }
        if let Some(error) = state.error() {
            eprintln!("Refresh failed: {}", error);
        } else if let Some(record) = state.record() {
            let Some(current_alerts) =
                or_shutdown(load_alerts(config, alerts, location), ctrl_c.as_mut()).await
            else {
                break;
            };
            println!();
            print_report(config, location, record, current_alerts.as_deref())?;
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = open_store(&cli);
    let prefs = Preferences::load(store.as_ref());
    let config = StartupConfig::from_cli(&cli, &prefs)?;

    let endpoints = Endpoints::default();
    let http = build_http_client().context("Failed to build HTTP client")?;
    let geocoder = GeocodeClient::new(http.clone(), &endpoints);

    if let Some(query) = &cli.search {
        println!("{}", render_search(&geocoder.search(query).await));
        return Ok(());
    }

    let dismissed = DismissedAlerts::persistent(store.clone());
    for id in &cli.dismiss {
        dismissed.dismiss(id);
    }
    let alerts = AlertsService::new(http.clone(), &endpoints, store.clone(), dismissed);

    let location = resolve_location(&config.location, &geocoder).await?;
    if config.save {
        config
            .to_preferences(&location)
            .save(store.as_ref())
            .context("Failed to save preferences")?;
        tracing::info!(location = %location.name, "Preferences saved");
    }

    let normalizer = WeatherNormalizer::new(
        ForecastClient::new(http, &endpoints),
        WeatherCache::new(store.clone()),
        config.time_format,
    );
    let result = if config.refresh {
        normalizer.refresh(&location, config.units).await
    } else {
        normalizer.fetch(&location, config.units).await
    };
    let record = result.context("Failed to load weather")?;

    let current_alerts = load_alerts(&config, &alerts, &location).await;
    print_report(&config, &location, &record, current_alerts.as_deref())?;

    if config.watch {
        watch(normalizer, &location, &config, &alerts).await?;
    }
    Ok(())
}
