//! National Weather Service (api.weather.gov) alerts
//!
//! Two requests: the `points` lookup resolves coordinates to a forecast zone
//! and county, then `alerts/active` lists what is in effect for both.

use reqwest::Client;
use serde::Deserialize;

use super::{synthetic_id, AlertError, AlertSeverity, WeatherAlert};
use crate::config::Endpoints;

const DEFAULT_TITLE: &str = "Weather Alert";
const DEFAULT_DESCRIPTION: &str = "Check local weather service for details.";
const DEFAULT_SENDER: &str = "National Weather Service";
const DEFAULT_AREA: &str = "Local Area";

#[derive(Debug, Deserialize)]
struct PointResponse {
    properties: PointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointProperties {
    #[serde(default)]
    forecast_zone: Option<String>,
    #[serde(default)]
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    web: Option<String>,
    #[serde(default)]
    sender_name: Option<String>,
    #[serde(default)]
    area_desc: Option<String>,
    #[serde(default)]
    expires: Option<String>,
}

/// Returns the first value that is present and non-empty
fn first_of(values: &[&Option<String>]) -> Option<String> {
    values
        .iter()
        .filter_map(|v| v.as_deref())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

impl AlertProperties {
    fn into_alert(self, index: usize) -> WeatherAlert {
        let title = first_of(&[&self.headline, &self.event]).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let id = first_of(&[&self.id])
            .unwrap_or_else(|| synthetic_id(&format!("nws-{}", index), &title));

        WeatherAlert {
            id,
            severity: AlertSeverity::from_nws(self.severity.as_deref().unwrap_or_default()),
            description: first_of(&[&self.description, &self.instruction])
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            url: first_of(&[&self.web]),
            sender: first_of(&[&self.sender_name]).unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            area: first_of(&[&self.area_desc]).unwrap_or_else(|| DEFAULT_AREA.to_string()),
            expires: first_of(&[&self.expires]),
            title,
        }
    }
}

/// Last path segment of an NWS resource URL ("…/zones/forecast/CAZ006" → "CAZ006")
fn zone_id(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[derive(Debug, Clone)]
pub struct NwsClient {
    client: Client,
    base_url: String,
}

impl NwsClient {
    pub fn new(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            base_url: endpoints.nws.trim_end_matches('/').to_string(),
        }
    }

    /// Active alerts for the zone and county containing the point
    pub async fn fetch_alerts(&self, lat: f64, lon: f64) -> Result<Vec<WeatherAlert>, AlertError> {
        let point_url = format!("{}/points/{:.4},{:.4}", self.base_url, lat, lon);
        let point: PointResponse = self.get_json(&point_url).await?;

        let zones: Vec<&str> = [&point.properties.forecast_zone, &point.properties.county]
            .into_iter()
            .flatten()
            .map(|url| zone_id(url))
            .filter(|id| !id.is_empty())
            .collect();
        if zones.is_empty() {
            return Err(AlertError::MissingField("properties.forecastZone".to_string()));
        }

        let alerts_url = format!("{}/alerts/active", self.base_url);
        let response = self
            .client
            .get(&alerts_url)
            .query(&[("zone", zones.join(","))])
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AlertError::Status(response.status()));
        }
        let collection: AlertCollection = serde_json::from_str(&response.text().await?)?;

        Ok(collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| feature.properties.into_alert(i))
            .collect())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AlertError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AlertError::Status(response.status()));
        }
        Ok(serde_json::from_str(&response.text().await?)?)
    }
}
