//! OpenAI image and video providers over the REST API.

use super::{
    AppliedParams, ImageProvider, ImageQuality, ImageRequest, ProviderStatus, VideoProvider,
    VideoRequest,
};
use crate::config::OpenAISettings;
use crate::error::{Result, ToolError};
use crate::openai::{api_key, http_client, API_KEY_ENV};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Shared HTTP plumbing for both providers.
#[derive(Clone)]
struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestClient {
    fn new(settings: &OpenAISettings, api_key: Option<String>) -> Self {
        Self {
            http: http_client(Duration::from_secs(settings.timeout_secs)),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ToolError::Configuration(format!("{} is not set", API_KEY_ENV))
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(ToolError::OpenAI(format!("{} failed with HTTP {}: {}", what, status, detail)))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// Image generation through `/images/generations`.
pub struct OpenAIImageProvider {
    client: RestClient,
    model: String,
}

impl OpenAIImageProvider {
    /// Provider using `OPENAI_API_KEY`.
    pub fn new(settings: &OpenAISettings, model: &str) -> Self {
        Self::with_api_key(settings, model, api_key())
    }

    pub fn with_api_key(settings: &OpenAISettings, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: RestClient::new(settings, api_key),
            model: model.to_string(),
        }
    }

    /// Closest size the model accepts for the requested aspect ratio.
    fn size_for(width: u32, height: u32) -> &'static str {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => "1536x1024",
            std::cmp::Ordering::Less => "1024x1536",
            std::cmp::Ordering::Equal => "1024x1024",
        }
    }

    fn quality_for(quality: ImageQuality) -> &'static str {
        match quality {
            ImageQuality::Standard => "medium",
            ImageQuality::Premium => "high",
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAIImageProvider {
    #[instrument(skip(self, request), fields(model = %self.model, seed = request.seed))]
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>> {
        let key = self.client.key()?;
        let applied = self.applied(request);
        debug!("Sending size {}; ignoring {:?}", applied.dimensions, applied.ignored);

        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "n": 1,
            "size": applied.dimensions,
            "quality": Self::quality_for(request.quality),
        });

        let response = self
            .client
            .http
            .post(self.client.url("images/generations"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let response = RestClient::check(response, "Image generation").await?;

        let parsed: ImagesResponse = response.json().await?;
        let encoded = parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| ToolError::GenerationFailed("provider returned no image".to_string()))?;

        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ToolError::GenerationFailed(format!("invalid image payload: {}", e)))?;
        info!("Generated image ({} bytes)", bytes.len());
        Ok(bytes)
    }

    /// The images endpoint takes neither a seed nor a guidance scale.
    fn applied(&self, request: &ImageRequest) -> AppliedParams {
        AppliedParams::exact(Self::size_for(request.width, request.height))
            .ignoring(&["cfg_scale", "seed"])
    }
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    id: String,
    status: String,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl VideoJob {
    fn provider_status(self) -> ProviderStatus {
        match self.status.as_str() {
            "queued" => ProviderStatus::Submitted,
            "in_progress" => ProviderStatus::InProgress,
            "completed" => ProviderStatus::Completed,
            "failed" => ProviderStatus::Failed(
                self.error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            _ => ProviderStatus::Other(self.status),
        }
    }
}

/// Video generation through `/videos`.
///
/// Output is staged by the provider; an output location is the video's
/// resource path (`videos/{id}`).
pub struct OpenAIVideoProvider {
    client: RestClient,
    model: String,
}

impl OpenAIVideoProvider {
    /// Provider using `OPENAI_API_KEY`.
    pub fn new(settings: &OpenAISettings, model: &str) -> Self {
        Self::with_api_key(settings, model, api_key())
    }

    pub fn with_api_key(settings: &OpenAISettings, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: RestClient::new(settings, api_key),
            model: model.to_string(),
        }
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<VideoJob>> {
        let response = self
            .client
            .http
            .get(self.client.url(&format!("videos/{}", job_id)))
            .bearer_auth(self.client.key()?)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = RestClient::check(response, "Video status").await?;
        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl VideoProvider for OpenAIVideoProvider {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn submit(&self, request: &VideoRequest, output_location: &str) -> Result<String> {
        let key = self.client.key()?;
        debug!(
            "Staging {} on the provider side; ignoring {:?}",
            output_location,
            self.applied(request).ignored
        );

        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "seconds": request.duration_seconds.to_string(),
            "size": request.dimension,
        });

        let response = self
            .client
            .http
            .post(self.client.url("videos"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let response = RestClient::check(response, "Video submission").await?;
        let job: VideoJob = response.json().await?;
        Ok(job.id)
    }

    async fn poll(&self, job_id: &str) -> Result<ProviderStatus> {
        let job = self.get_job(job_id).await?.ok_or_else(|| {
            ToolError::UnexpectedStatus(format!("video job {} no longer exists", job_id))
        })?;
        Ok(job.provider_status())
    }

    async fn locate_output(&self, _output_location: &str, job_id: &str) -> Result<Option<String>> {
        match self.get_job(job_id).await? {
            Some(job) if job.status == "completed" => Ok(Some(format!("videos/{}", job.id))),
            _ => Ok(None),
        }
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .http
            .get(self.client.url(&format!("{}/content", location)))
            .bearer_auth(self.client.key()?)
            .send()
            .await?;
        let response = RestClient::check(response, "Video download").await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete(&self, location: &str) -> Result<()> {
        let response = self
            .client
            .http
            .delete(self.client.url(location))
            .bearer_auth(self.client.key()?)
            .send()
            .await?;
        RestClient::check(response, "Video deletion").await?;
        Ok(())
    }

    async fn cancel(&self, job_id: &str) -> Result<()> {
        self.delete(&format!("videos/{}", job_id)).await
    }

    /// Frame rate and seed are chosen by the service.
    fn applied(&self, request: &VideoRequest) -> AppliedParams {
        AppliedParams::exact(request.dimension.clone()).ignoring(&["fps", "seed"])
    }
}
