use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::number;

const UPLOAD_PHOTO: &str = "/api/calorie_tracker/upload_photo";
const GET_PREFERRED_ANALYZER: &str = "/api/calorie_tracker/get_preferred_analyzer";
const SET_PREFERRED_ANALYZER: &str = "/api/calorie_tracker/set_preferred_analyzer";
const FETCH_ANALYZERS: &str = "/api/calorie_tracker/fetch_analyzers";

/// An image analyzer integration that can estimate calories from a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    pub config_entry_id: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl Analyzer {
    pub fn label(&self) -> String {
        match &self.model {
            Some(model) if !model.is_empty() => format!("{} ({})", self.title, model),
            _ => self.title.clone(),
        }
    }
}

/// A food item recognized in a photo.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFood {
    pub food_item: String,
    pub calories: f64,
}

/// Response of the photo upload endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhotoAnalysis {
    pub success: bool,
    pub food_items: Vec<DetectedFood>,
    pub raw_result: Option<String>,
}

impl PhotoAnalysis {
    fn decode(value: &Value) -> Self {
        let food_items = value
            .get("food_items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let name = item
                            .get("food_item")
                            .or_else(|| item.get("name"))
                            .and_then(Value::as_str)?;
                        Some(DetectedFood {
                            food_item: name.to_string(),
                            calories: number(item.get("calories")).unwrap_or(0.0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            success: value.get("success").and_then(Value::as_bool).unwrap_or(false),
            food_items,
            raw_result: value
                .get("raw_result")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// An image accepted for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Check the image format from its bytes. Only JPEG, PNG and GIF are
    /// accepted by the backend.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> ClientResult<Self> {
        let file_name = file_name.into();
        let format = image::guess_format(&bytes)
            .map_err(|_| ClientError::UnsupportedImage(format!("unknown ({})", file_name)))?;
        let mime = match format {
            image::ImageFormat::Jpeg => "image/jpeg",
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Gif => "image/gif",
            other => {
                return Err(ClientError::UnsupportedImage(
                    other.to_mime_type().to_string(),
                ));
            }
        };
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }
}

/// Client for the integration's authenticated HTTP endpoints.
#[derive(Clone, Debug)]
pub struct PhotoApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PhotoApiClient {
    /// Create a new API client with configurable timeouts.
    pub fn new(base_url: String, token: String, network_config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(response: reqwest::Response) -> ClientResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            warn!("API returned error status {}: {}", status, message);
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Value>().await?)
    }

    /// Upload a photo for analysis by the analyzer `config_entry_id`.
    pub async fn upload_photo(
        &self,
        config_entry_id: &str,
        model: Option<&str>,
        photo: PhotoUpload,
    ) -> ClientResult<PhotoAnalysis> {
        debug!(analyzer = config_entry_id, size = photo.bytes.len(), "Uploading photo");
        let part = reqwest::multipart::Part::bytes(photo.bytes)
            .file_name(photo.file_name)
            .mime_str(photo.mime)?;
        let form = reqwest::multipart::Form::new()
            .text("config_entry", config_entry_id.to_string())
            .text("model", model.unwrap_or_default().to_string())
            .part("image", part);

        let response = self
            .client
            .post(self.url(UPLOAD_PHOTO))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let analysis = PhotoAnalysis::decode(&Self::read_json(response).await?);
        if !analysis.success {
            return Err(ClientError::Validation(
                "The analyzer could not identify any food in this photo".into(),
            ));
        }
        Ok(analysis)
    }

    pub async fn fetch_analyzers(&self) -> ClientResult<Vec<Analyzer>> {
        let response = self
            .client
            .get(self.url(FETCH_ANALYZERS))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let value = Self::read_json(response).await?;
        let list = value.get("analyzers").cloned().unwrap_or(value);
        Ok(serde_json::from_value(list)?)
    }

    /// Preferred analyzer of the profile whose config entry is given.
    pub async fn get_preferred_analyzer(
        &self,
        profile_config_entry_id: &str,
    ) -> ClientResult<Option<Analyzer>> {
        let response = self
            .client
            .post(self.url(GET_PREFERRED_ANALYZER))
            .bearer_auth(&self.token)
            .json(&json!({ "config_entry_id": profile_config_entry_id }))
            .send()
            .await?;
        let value = Self::read_json(response).await?;
        match value.get("preferred_analyzer") {
            None | Some(Value::Null) => Ok(None),
            Some(analyzer) => Ok(Some(serde_json::from_value(analyzer.clone())?)),
        }
    }

    pub async fn set_preferred_analyzer(
        &self,
        profile_config_entry_id: &str,
        analyzer: &Analyzer,
    ) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url(SET_PREFERRED_ANALYZER))
            .bearer_auth(&self.token)
            .json(&json!({
                "config_entry_id": profile_config_entry_id,
                "analyzer_data": analyzer,
            }))
            .send()
            .await?;
        Self::read_json(response).await.map(|_| ())
    }
}
