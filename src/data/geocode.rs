//! Place-name search and reverse geocoding
//!
//! Forward search uses the Open-Meteo geocoding API; reverse lookup uses the
//! BigDataCloud client endpoint. Neither lookup is critical: failures are
//! logged and come back as an empty list or `None`.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Location;
use crate::config::Endpoints;

/// Maximum number of search results requested
pub const SEARCH_RESULT_COUNT: usize = 6;

const UNKNOWN_LOCATION: &str = "Unknown Location";
const UNKNOWN_COUNTRY: &str = "Unknown";

#[derive(Debug, Error)]
enum GeocodeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),
}

/// A place returned by a geocoding lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<GeocodeResult> for Location {
    fn from(result: GeocodeResult) -> Self {
        Location {
            name: result.name,
            latitude: result.latitude,
            longitude: result.longitude,
            country: result.country,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    locality: Option<String>,
    #[serde(default)]
    principal_subdivision: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl ReverseResponse {
    fn place_name(&self) -> String {
        [&self.city, &self.locality, &self.principal_subdivision]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }

    fn country(&self) -> String {
        self.country_code
            .clone()
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }
}

/// Client for forward and reverse geocoding
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    search_url: String,
    reverse_url: String,
}

impl GeocodeClient {
    pub fn new(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            search_url: endpoints.geocoding_search.clone(),
            reverse_url: endpoints.reverse_geocoding.clone(),
        }
    }

    /// Searches places by name, returning at most six matches
    ///
    /// An empty query returns an empty list without issuing a request.
    pub async fn search(&self, query: &str) -> Vec<GeocodeResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.try_search(query).await {
            Ok(results) => {
                tracing::debug!(query, count = results.len(), "Geocoding search complete");
                results
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "Geocoding fetch failed");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str) -> Result<Vec<GeocodeResult>, GeocodeError> {
        let url = format!(
            "{}?name={}&count={}&language=en&format=json",
            self.search_url,
            urlencoding::encode(query),
            SEARCH_RESULT_COUNT
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        let mut results = body.results.unwrap_or_default();
        results.truncate(SEARCH_RESULT_COUNT);
        Ok(results)
    }

    /// Looks up the place name for a coordinate pair
    ///
    /// The returned result keeps the queried coordinates.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Option<GeocodeResult> {
        match self.try_reverse(latitude, longitude).await {
            Ok(body) => Some(GeocodeResult {
                id: None,
                name: body.place_name(),
                country: Some(body.country()),
                latitude,
                longitude,
            }),
            Err(e) => {
                tracing::warn!(latitude, longitude, error = %e, "Reverse geocoding failed");
                None
            }
        }
    }

    async fn try_reverse(&self, latitude: f64, longitude: f64) -> Result<ReverseResponse, GeocodeError> {
        let url = format!(
            "{}?latitude={}&longitude={}&localityLanguage=en",
            self.reverse_url, latitude, longitude
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}
