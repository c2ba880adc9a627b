use log::debug;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::types::{Job, JobInput, JobRequest, PoseSequence, Recognition, ValidationError};

/// How a backend call can fail. No call retries on its own; the caller
/// owns retry policy.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to reach the backend API.")]
    Network(#[source] reqwest::Error),
    #[error("Backend returned a malformed response.")]
    Decode(#[source] reqwest::Error),
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Shape of the backend's non-2xx bodies (`{"detail": ...}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Thin typed wrapper over the conversion service's HTTP surface.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a server-relative result path (e.g. `/files/{id}/out.mp4`)
    /// into a downloadable URL.
    pub fn file_url(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative.trim_start_matches('/'))
    }

    pub async fn create_job(&self, request: &JobRequest) -> Result<Job, ApiError> {
        request.validate()?;
        let form = build_job_form(request).await?;
        debug!("submitting {} job to {}", request.input.mode(), self.base_url);
        let response = self
            .http
            .post(format!("{}/jobs", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Network)?;
        json_or_error(response).await
    }

    pub async fn fetch_job(&self, id: &str) -> Result<Job, ApiError> {
        let response = self
            .http
            .get(format!("{}/jobs/{}", self.base_url, id))
            .send()
            .await
            .map_err(ApiError::Network)?;
        json_or_error(response).await
    }

    /// Fetches the downsampled keypoint sequence for a completed job;
    /// `stride` controls temporal downsampling server-side.
    pub async fn fetch_pose(&self, id: &str, stride: u32) -> Result<PoseSequence, ApiError> {
        let response = self
            .http
            .get(format!("{}/pose-json/{}", self.base_url, id))
            .query(&[("stride", stride)])
            .send()
            .await
            .map_err(ApiError::Network)?;
        json_or_error(response).await
    }

    /// Classifies a single JPEG-encoded frame.
    pub async fn recognize(&self, jpeg: Vec<u8>) -> Result<Recognition, ApiError> {
        let part = Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(ApiError::Network)?;
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/recognize", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Network)?;
        json_or_error(response).await
    }
}

async fn build_job_form(request: &JobRequest) -> Result<Form, ApiError> {
    // validate() has already ruled out unsupported languages.
    let (spoken, signed) = request
        .language
        .codes()
        .ok_or(ValidationError::UnsupportedLanguage)?;

    let mut form = Form::new()
        .text("mode", request.input.mode())
        .text("glosser", request.glosser.code())
        .text("spoken_language", spoken)
        .text("signed_language", signed)
        .text("avatar_type", request.avatar.code());

    match &request.input {
        JobInput::Text { text } => {
            form = form.text("text", text.clone());
        }
        JobInput::Audio { path } | JobInput::Video { path } => {
            let path = path.trim();
            let bytes = tokio::fs::read(path).await?;
            let file_name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            form = form.part("file", Part::bytes(bytes).file_name(file_name));
        }
        JobInput::Youtube {
            url,
            prefer_captions,
        } => {
            form = form
                .text("youtube_url", url.trim().to_string())
                .text("prefer_captions", prefer_captions.to_string())
                .text("caption_language", spoken);
        }
    }

    Ok(form)
}

async fn json_or_error<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| format!("Backend returned status {}.", status.as_u16()));
        return Err(ApiError::Backend {
            status: status.as_u16(),
            message,
        });
    }
    response.json::<T>().await.map_err(ApiError::Decode)
}
