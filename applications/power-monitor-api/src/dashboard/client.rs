use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{DeviceSnapshot, EnergyConsumptionResponse, EnergyRow, NewSnapshot, SaveResponse};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
}

/// HTTP client for the readings API.
#[derive(Clone)]
pub struct ReadingsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ReadingsClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// Latest snapshot of every device.
    pub async fn latest_readings(&self) -> Result<Vec<DeviceSnapshot>, ApiError> {
        self.get(&["api", "readings"]).await
    }

    /// All snapshots of one device, newest first.
    pub async fn device_history(&self, device_id: &str) -> Result<Vec<DeviceSnapshot>, ApiError> {
        self.get(&["api", "readings", device_id]).await
    }

    pub async fn energy_consumption(&self) -> Result<Vec<EnergyRow>, ApiError> {
        let response: EnergyConsumptionResponse = self.get(&["api", "energy-consumption"]).await?;
        Ok(response.loads)
    }

    pub async fn post_reading(&self, snapshot: &NewSnapshot) -> Result<DeviceSnapshot, ApiError> {
        let url = self.url(&["api", "readings"]);
        let response = self.http.post(url).json(snapshot).send().await?;
        let saved: SaveResponse = Self::handle_response(response).await?;
        Ok(saved.data)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let response = self.http.get(self.url(segments)).send().await?;
        Self::handle_response(response).await
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}
