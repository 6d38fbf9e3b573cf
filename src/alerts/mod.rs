//! Government weather alerts
//!
//! Alerts come from the National Weather Service for US locations and from
//! Environment and Climate Change Canada for Canadian ones. Alerts are
//! informational: every upstream failure is logged and yields an empty list.

pub mod canada;
pub mod dismissed;
pub mod nws;

pub use canada::{CanadaClient, Province};
pub use dismissed::{DismissedAlerts, DISMISSED_ALERTS_KEY};
pub use nws::NwsClient;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{AlertsCache, AlertsKey, KeyValueStore};
use crate::config::Endpoints;

/// Errors from a single alert source; never surfaced past [`AlertsService`]
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse feed: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl AlertSeverity {
    /// Maps an NWS `severity` value; anything unrecognized is moderate
    pub fn from_nws(severity: &str) -> Self {
        match severity {
            "Minor" => Self::Minor,
            "Moderate" => Self::Moderate,
            "Severe" => Self::Severe,
            "Extreme" => Self::Extreme,
            _ => Self::Moderate,
        }
    }

    /// Infers severity from free text such as an alert headline
    ///
    /// Keywords are checked in order: warning, watch, advisory, emergency.
    pub fn from_keywords<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let texts: Vec<String> = texts.into_iter().map(str::to_lowercase).collect();
        let mentions = |keyword: &str| texts.iter().any(|t| t.contains(keyword));

        if mentions("warning") {
            Self::Severe
        } else if mentions("watch") {
            Self::Moderate
        } else if mentions("advisory") {
            Self::Minor
        } else if mentions("emergency") {
            Self::Extreme
        } else {
            Self::Moderate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Extreme => "extreme",
        }
    }
}

/// An active alert, normalized across sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub url: Option<String>,
    pub sender: String,
    pub area: String,
    /// Expiry as reported upstream (ISO 8601)
    #[serde(default)]
    pub expires: Option<String>,
}

/// Alert source chosen for a coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Canada,
    UnitedStates,
}

impl Region {
    /// Approximate bounding box test; everything outside Canada goes to NWS
    pub fn detect(latitude: f64, longitude: f64) -> Self {
        let in_canada = (41.7..=83.1).contains(&latitude) && (-141.0..=-52.6).contains(&longitude);
        if in_canada {
            Self::Canada
        } else {
            Self::UnitedStates
        }
    }
}

/// Builds a stable id for alerts whose source does not provide one
pub(crate) fn synthetic_id(prefix: &str, text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    format!("{}-{}", prefix, slug.trim_end_matches('-'))
}

/// Region-aware alert lookup with caching and dismissal filtering
#[derive(Debug, Clone)]
pub struct AlertsService {
    nws: NwsClient,
    canada: CanadaClient,
    cache: AlertsCache,
    dismissed: DismissedAlerts,
}

impl AlertsService {
    pub fn new(
        client: Client,
        endpoints: &Endpoints,
        store: Arc<dyn KeyValueStore>,
        dismissed: DismissedAlerts,
    ) -> Self {
        Self {
            nws: NwsClient::new(client.clone(), endpoints),
            canada: CanadaClient::new(client, endpoints),
            cache: AlertsCache::new(store),
            dismissed,
        }
    }

    /// Every alert currently in effect near the point, dismissed or not
    pub async fn fetch_alerts(&self, latitude: f64, longitude: f64) -> Vec<WeatherAlert> {
        let key = AlertsKey {
            latitude,
            longitude,
        };
        if let Some(alerts) = self.cache.get(&key) {
            tracing::debug!(count = alerts.len(), "Using cached alerts");
            return alerts;
        }

        let region = Region::detect(latitude, longitude);
        let alerts = match region {
            Region::Canada => self.canada.fetch_alerts(latitude, longitude).await,
            Region::UnitedStates => match self.nws.fetch_alerts(latitude, longitude).await {
                Ok(alerts) => alerts,
                Err(e) => {
                    tracing::info!(error = %e, "NWS alerts not available for this location");
                    Vec::new()
                }
            },
        };

        tracing::debug!(?region, count = alerts.len(), "Fetched alerts");
        self.cache.set(&alerts, &key);
        alerts
    }

    /// Alerts near the point that the user has not dismissed
    pub async fn active_alerts(&self, latitude: f64, longitude: f64) -> Vec<WeatherAlert> {
        let mut alerts = self.fetch_alerts(latitude, longitude).await;
        alerts.retain(|alert| !self.dismissed.contains(&alert.id));
        alerts
    }

    pub fn dismiss(&self, id: &str) {
        self.dismissed.dismiss(id);
    }

    pub fn dismissed(&self) -> &DismissedAlerts {
        &self.dismissed
    }
}
