//! Media synthesis: provider boundaries and the long-running job lifecycle.

pub(crate) mod controller;
mod openai;

pub use controller::{JobController, JobOutcome, PollPolicy};
pub use openai::{OpenAIImageProvider, OpenAIVideoProvider};

use crate::error::{Result, ToolError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) for drawn seeds.
pub const SEED_RANGE: u64 = 2_147_483_647;

/// Draw a seed uniformly from `0..SEED_RANGE`.
pub fn random_seed() -> u64 {
    (uuid::Uuid::new_v4().as_u128() % SEED_RANGE as u128) as u64
}

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Submitted,
    InProgress,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::TimedOut)
    }
}

/// Status reported by a provider on poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Submitted,
    InProgress,
    Completed,
    Failed(String),
    /// Anything outside the protocol.
    Other(String),
}

/// A long-running generation job as tracked by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
    pub state: JobState,
    pub output_location: Option<String>,
    pub failure_reason: Option<String>,
}

impl GenerationJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_at: Utc::now(),
            state: JobState::Submitted,
            output_location: None,
            failure_reason: None,
        }
    }

    /// Apply a polled status.
    ///
    /// Returns `Ok(true)` once the job has completed, `Ok(false)` while it is
    /// still running, and the classified error for failed or unknown statuses.
    pub fn observe(&mut self, status: ProviderStatus) -> Result<bool> {
        if self.state.is_terminal() {
            return Err(ToolError::UnexpectedStatus(format!(
                "job {} is already {:?}",
                self.id, self.state
            )));
        }

        match status {
            ProviderStatus::Submitted | ProviderStatus::InProgress => {
                self.state = JobState::InProgress;
                Ok(false)
            }
            ProviderStatus::Completed => {
                self.state = JobState::Completed;
                Ok(true)
            }
            ProviderStatus::Failed(reason) => {
                self.fail(reason.clone());
                Err(ToolError::GenerationFailed(reason))
            }
            ProviderStatus::Other(status) => {
                self.fail(format!("unexpected status '{}'", status));
                Err(ToolError::UnexpectedStatus(status))
            }
        }
    }

    /// Mark the job failed.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.failure_reason = Some(reason.into());
    }

    /// Mark the job timed out. Terminal jobs are left alone.
    pub fn time_out(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::TimedOut;
        }
    }
}

/// Video synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_seconds: u32,
    pub fps: u32,
    /// `WIDTHxHEIGHT`.
    pub dimension: String,
    pub seed: u64,
}

/// Image quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Standard,
    Premium,
}

impl ImageQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Premium => "premium",
        }
    }
}

/// Image synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub quality: ImageQuality,
    pub cfg_scale: f64,
    pub seed: u64,
}

/// The parameters a provider actually uses for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedParams {
    /// `WIDTHxHEIGHT` as sent to the provider.
    pub dimensions: String,
    /// Requested parameters the provider has no way to honour.
    pub ignored: Vec<&'static str>,
}

impl AppliedParams {
    /// Everything applied as requested.
    pub fn exact(dimensions: impl Into<String>) -> Self {
        Self {
            dimensions: dimensions.into(),
            ignored: Vec::new(),
        }
    }

    pub fn ignoring(mut self, params: &[&'static str]) -> Self {
        self.ignored.extend_from_slice(params);
        self
    }

    pub fn applies(&self, param: &str) -> bool {
        !self.ignored.contains(&param)
    }

    /// `value`, marked when the provider ignores `param`.
    pub fn annotate(&self, param: &str, value: impl std::fmt::Display) -> String {
        if self.applies(param) {
            value.to_string()
        } else {
            format!("{} (not applied by the provider)", value)
        }
    }
}

/// Synchronous image synthesis.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one PNG image.
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<u8>>;

    fn applied(&self, request: &ImageRequest) -> AppliedParams {
        AppliedParams::exact(format!("{}x{}", request.width, request.height))
    }
}

/// Asynchronous video synthesis: submit, poll, then fetch from a staging area.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Start a job whose output lands under `output_location`.
    async fn submit(&self, request: &VideoRequest, output_location: &str) -> Result<String>;

    async fn poll(&self, job_id: &str) -> Result<ProviderStatus>;

    /// Find the job's output object under `output_location`.
    async fn locate_output(&self, output_location: &str, job_id: &str) -> Result<Option<String>>;

    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;

    /// Delete a staged output object.
    async fn delete(&self, location: &str) -> Result<()>;

    /// Ask the provider to stop a job.
    async fn cancel(&self, job_id: &str) -> Result<()>;

    fn applied(&self, request: &VideoRequest) -> AppliedParams {
        AppliedParams::exact(request.dimension.clone())
    }
}
