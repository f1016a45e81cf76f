//! Submission Client.
//!
//! Uploads a photograph and its location to the inference service and maps
//! the diagnosis into a `SubmissionResult`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::module::define;
use crate::module::device::CapturedImage;
use crate::module::util::conf::ConfigError;
use crate::module::util::init::AppProperty;

/// Diagnosis returned by the service. Built in full or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Detected disease, `None` when the service sent none.
    pub disease: Option<String>,
    /// Recommended treatment, `None` when the service sent none.
    pub solution: Option<String>,
    /// Url of the stored image, empty when the service sent none.
    pub image_url: String,
}

/// Upload failures. The session keeps its previous result on any of them.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("can't read image: {0}")]
    Image(String),
    #[error("request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Server { status: StatusCode, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Uploads an image and a location text.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        image: &CapturedImage,
        location: &str,
    ) -> Result<SubmissionResult, SubmissionError>;
}

/// Response body of `POST /upload_plant`.
#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    prediction: Option<Value>,
    #[serde(default, rename = "Solution")]
    solution: Option<Value>,
    #[serde(default)]
    url: Option<Value>,
}

impl UploadResponse {
    fn into_result(self) -> SubmissionResult {
        SubmissionResult {
            disease: text(self.prediction),
            solution: text(self.solution),
            image_url: text(self.url).unwrap_or_default(),
        }
    }
}

/// Non-empty text of a JSON value. Null and empty strings are absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// MIME type guessed from a file extension.
pub fn mime_for(ext: &str) -> String {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        "svg" => "image/svg+xml".to_string(),
        other => format!("image/{}", other),
    }
}

/// HTTP client of the inference service.
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl UploadClient {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Client for the platform selected in the `[api]` config section.
    pub fn from_property(
        property: &AppProperty,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let api = &property.conf.api;
        Ok(Self::new(
            client,
            api.base_url()?,
            Duration::from_secs(api.timeout_secs),
        ))
    }

    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url, define::api::UPLOAD_PATH)
    }

    /// Turn the image reference into the `image` part of the form.
    async fn image_part(&self, image: &CapturedImage) -> Result<Part, SubmissionError> {
        let bytes = match image {
            CapturedImage::LocalFile(path) => tokio::fs::read(path)
                .await
                .map_err(|e| SubmissionError::Image(format!("{}: {}", path.display(), e)))?,
            CapturedImage::Uri(uri) => match Url::parse(uri) {
                Ok(url) if url.scheme() == "file" => {
                    // Percent-decoded, `my%20leaf.jpg` is `my leaf.jpg` on disk.
                    let path = url.to_file_path().map_err(|()| {
                        SubmissionError::Image(format!("not a local file uri {}", uri))
                    })?;
                    tokio::fs::read(&path)
                        .await
                        .map_err(|e| SubmissionError::Image(format!("{}: {}", uri, e)))?
                }
                Ok(url) if matches!(url.scheme(), "http" | "https") => self.download(uri).await?,
                _ => {
                    return Err(SubmissionError::Image(format!(
                        "unsupported image uri {}",
                        uri
                    )))
                }
            },
        };

        let ext = image.extension().unwrap_or_else(|| "jpeg".to_string());
        Part::bytes(bytes)
            .file_name(format!("image.{}", ext))
            .mime_str(&mime_for(&ext))
            .map_err(|e| SubmissionError::Image(e.to_string()))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, SubmissionError> {
        let res = self
            .client
            .get(uri)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| SubmissionError::Image(format!("{}: {}", uri, e)))?;
        let bytes = res
            .bytes()
            .await
            .map_err(|e| SubmissionError::Image(format!("{}: {}", uri, e)))?;
        Ok(bytes.to_vec())
    }

    fn transport_error(&self, e: reqwest::Error) -> SubmissionError {
        log::error!("API response error: {}", e);
        match e.is_timeout() {
            true => SubmissionError::Timeout(self.timeout),
            false => {
                log::error!("Network error - no response received");
                SubmissionError::Network(e)
            }
        }
    }
}

#[async_trait]
impl Submitter for UploadClient {
    async fn submit(
        &self,
        image: &CapturedImage,
        location: &str,
    ) -> Result<SubmissionResult, SubmissionError> {
        log::info!("Submitting plant data with image: {}", image);
        log::info!("Submitting plant data with location: {}", location);

        let form = Form::new()
            .part(define::api::IMAGE_FIELD, self.image_part(image).await?)
            .text(define::api::LOCATION_FIELD, location.to_string());

        let url = self.upload_url();
        log::info!("Making API request to: {}", url);
        let res = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        log::info!("API response received: {}", status);
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            log::error!("Error status: {}", status);
            log::error!("Error data: {}", body);
            return Err(SubmissionError::Server { status, body });
        }

        let body = res.text().await.map_err(|e| self.transport_error(e))?;
        let response: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| SubmissionError::InvalidResponse(format!("{}: {}", e, body)))?;
        let result = response.into_result();
        log::info!("Upload successful: {:?}", result);
        Ok(result)
    }
}
