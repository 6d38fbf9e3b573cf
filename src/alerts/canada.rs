//! Environment and Climate Change Canada alerts
//!
//! Sources are tried in order until one yields alerts: the GeoMet OGC API
//! `weather-alerts` collection, then the provincial RSS warning feed.

use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{synthetic_id, AlertError, AlertSeverity, WeatherAlert};
use crate::config::Endpoints;

const SENDER: &str = "Environment and Climate Change Canada";
const DEFAULT_TITLE: &str = "Weather Alert";
const DEFAULT_DESCRIPTION: &str = "Check Environment Canada for details.";
const DEFAULT_AREA: &str = "Local Area";
const WARNINGS_URL: &str = "https://weather.gc.ca/warnings/index_e.html";

/// Half-width of the bounding box sent to the alerts API, degrees
const BBOX_DEGREES: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Province {
    Ontario,
    BritishColumbia,
    Quebec,
    Alberta,
    Manitoba,
    Saskatchewan,
    NovaScotia,
    NewBrunswick,
    NewfoundlandAndLabrador,
    PrinceEdwardIsland,
    Yukon,
    NorthwestTerritories,
    Nunavut,
}

/// Approximate boxes as (province, lat range, lon range), checked in order
const PROVINCE_BOXES: [(Province, (f64, f64), (f64, f64)); 13] = [
    (Province::Ontario, (41.7, 49.0), (-95.0, -74.0)),
    (Province::BritishColumbia, (48.0, 60.0), (-139.0, -114.0)),
    (Province::Quebec, (44.0, 62.0), (-80.0, -57.0)),
    (Province::Alberta, (49.0, 60.0), (-120.0, -110.0)),
    (Province::Manitoba, (49.0, 60.0), (-102.0, -95.0)),
    (Province::Saskatchewan, (49.0, 60.0), (-110.0, -102.0)),
    (Province::NovaScotia, (43.0, 47.0), (-66.0, -59.0)),
    (Province::NewBrunswick, (45.0, 48.0), (-69.0, -63.0)),
    (Province::NewfoundlandAndLabrador, (46.0, 61.0), (-67.0, -52.0)),
    (Province::PrinceEdwardIsland, (46.0, 47.0), (-64.0, -62.0)),
    (Province::Yukon, (60.0, 70.0), (-141.0, -123.0)),
    (Province::NorthwestTerritories, (60.0, 70.0), (-123.0, -102.0)),
    (Province::Nunavut, (60.0, 83.0), (-102.0, -52.0)),
];

impl Province {
    /// First province whose box contains the point; boxes overlap near borders
    pub fn from_coordinates(lat: f64, lon: f64) -> Option<Self> {
        PROVINCE_BOXES
            .iter()
            .find(|(_, (lat_min, lat_max), (lon_min, lon_max))| {
                (*lat_min..=*lat_max).contains(&lat) && (*lon_min..=*lon_max).contains(&lon)
            })
            .map(|(province, _, _)| *province)
    }

    /// Two-letter postal code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ontario => "ON",
            Self::BritishColumbia => "BC",
            Self::Quebec => "QC",
            Self::Alberta => "AB",
            Self::Manitoba => "MB",
            Self::Saskatchewan => "SK",
            Self::NovaScotia => "NS",
            Self::NewBrunswick => "NB",
            Self::NewfoundlandAndLabrador => "NL",
            Self::PrinceEdwardIsland => "PE",
            Self::Yukon => "YT",
            Self::NorthwestTerritories => "NT",
            Self::Nunavut => "NU",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ontario => "Ontario",
            Self::BritishColumbia => "British Columbia",
            Self::Quebec => "Quebec",
            Self::Alberta => "Alberta",
            Self::Manitoba => "Manitoba",
            Self::Saskatchewan => "Saskatchewan",
            Self::NovaScotia => "Nova Scotia",
            Self::NewBrunswick => "New Brunswick",
            Self::NewfoundlandAndLabrador => "Newfoundland and Labrador",
            Self::PrinceEdwardIsland => "Prince Edward Island",
            Self::Yukon => "Yukon",
            Self::NorthwestTerritories => "Northwest Territories",
            Self::Nunavut => "Nunavut",
        }
    }

    /// File name of the province's RSS warning feed ("on-1_e.xml")
    pub fn feed_file(&self) -> String {
        format!("{}-1_e.xml", self.code().to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Option<Vec<Feature>>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Map<String, Value>,
}

/// First of `keys` holding a non-empty string
fn string_prop(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| props.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
}

fn alert_from_properties(props: &Map<String, Value>, index: usize) -> WeatherAlert {
    let title = string_prop(props, &["headline", "title", "event"])
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let alert_type = string_prop(props, &["alert_type"]).unwrap_or_default();

    WeatherAlert {
        id: string_prop(props, &["identifier", "id"])
            .unwrap_or_else(|| synthetic_id(&format!("ca-{}", index), &title)),
        severity: AlertSeverity::from_keywords([title.as_str(), alert_type.as_str()]),
        description: string_prop(props, &["description", "instruction", "summary"])
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        url: Some(string_prop(props, &["url"]).unwrap_or_else(|| WARNINGS_URL.to_string())),
        sender: SENDER.to_string(),
        area: string_prop(props, &["area_name", "region_name", "location"])
            .unwrap_or_else(|| DEFAULT_AREA.to_string()),
        expires: string_prop(props, &["expires", "expiry_date"]),
        title,
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

/// Parses a provincial warning feed; items without a title or description are skipped
fn parse_rss(xml: &str, province: Province) -> Result<Vec<WeatherAlert>, AlertError> {
    let rss: Rss = from_str(xml)?;
    let prefix = format!("rss-{}", province.code().to_lowercase());

    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.title?.trim().to_string();
            let description = item.description?.trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(WeatherAlert {
                id: synthetic_id(&prefix, &title),
                severity: AlertSeverity::from_keywords([title.as_str()]),
                url: item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                sender: SENDER.to_string(),
                area: province.name().to_string(),
                expires: None,
                title,
                description,
            })
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct CanadaClient {
    client: Client,
    alerts_url: String,
    rss_base: String,
}

impl CanadaClient {
    pub fn new(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            alerts_url: endpoints.canada_alerts.clone(),
            rss_base: endpoints.canada_rss.trim_end_matches('/').to_string(),
        }
    }

    /// Alerts near the point from the first source that has any
    pub async fn fetch_alerts(&self, lat: f64, lon: f64) -> Vec<WeatherAlert> {
        match self.fetch_from_api(lat, lon).await {
            Ok(alerts) if !alerts.is_empty() => return alerts,
            Ok(_) => tracing::debug!("Alerts API returned nothing, trying provincial feed"),
            Err(e) => tracing::info!(error = %e, "Alerts API failed, trying provincial feed"),
        }

        let Some(province) = Province::from_coordinates(lat, lon) else {
            return Vec::new();
        };
        match self.fetch_from_rss(province).await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::info!(province = province.code(), error = %e, "RSS feed parsing failed");
                Vec::new()
            }
        }
    }

    async fn fetch_from_api(&self, lat: f64, lon: f64) -> Result<Vec<WeatherAlert>, AlertError> {
        let bbox = format!(
            "{},{},{},{}",
            lon - BBOX_DEGREES,
            lat - BBOX_DEGREES,
            lon + BBOX_DEGREES,
            lat + BBOX_DEGREES
        );
        let response = self
            .client
            .get(&self.alerts_url)
            .query(&[("bbox", bbox.as_str()), ("f", "json")])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AlertError::Status(response.status()));
        }

        let collection: FeatureCollection = serde_json::from_str(&response.text().await?)?;
        Ok(collection
            .features
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, feature)| alert_from_properties(&feature.properties, i))
            .collect())
    }

    async fn fetch_from_rss(&self, province: Province) -> Result<Vec<WeatherAlert>, AlertError> {
        let url = format!("{}/{}", self.rss_base, province.feed_file());
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AlertError::Status(response.status()));
        }
        parse_rss(&response.text().await?, province)
    }
}
