use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::GoogleConfig,
    models::Geocode,
    utils::error::{AppError, AppResult},
};

const GEOCODE_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub geocode: Geocode,
    pub formatted_address: Option<String>,
}

/// Resolves a free-text address to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeEntry>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    formatted_address: Option<String>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Geocode,
}

impl GeocodeResponse {
    fn into_result(self, address: &str) -> AppResult<GeocodeResult> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => {
                return Err(AppError::UpstreamFailure(format!(
                    "No geocoding results for '{}'",
                    address
                )))
            }
            other => {
                return Err(AppError::UpstreamFailure(format!(
                    "Geocoding failed with status {}: {}",
                    other,
                    self.error_message.unwrap_or_default()
                )))
            }
        }

        let first = self.results.into_iter().next().ok_or_else(|| {
            AppError::UpstreamFailure(format!("No geocoding results for '{}'", address))
        })?;

        Ok(GeocodeResult {
            geocode: first.geometry.location,
            formatted_address: first.formatted_address,
        })
    }
}

pub struct GoogleGeocoder {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.maps_api_key.clone(),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> AppResult<GeocodeResult> {
        log::info!("🗺️  Geocoding '{}'", address);

        let response = self
            .http
            .get(GEOCODE_API_URL)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamFailure(format!(
                "Geocoding API error: {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response.json().await?;
        body.into_result(address)
    }
}
