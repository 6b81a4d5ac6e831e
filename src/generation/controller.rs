//! Poll-until-terminal driver for video jobs.

use super::{AppliedParams, GenerationJob, VideoProvider, VideoRequest};
use crate::artifact::ArtifactStore;
use crate::config::VideoSettings;
use crate::error::{Result, ToolError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Category under which finished videos are stored.
pub const VIDEO_CATEGORY: &str = "generated_videos";

/// Poll cadence and wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_settings(settings: &VideoSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

/// A finished job and the caller-facing artifact.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: GenerationJob,
    pub filename: String,
    pub link: String,
    pub polls: u32,
}

/// Drives one video job from submission to a stored artifact.
pub struct JobController {
    provider: Arc<dyn VideoProvider>,
    store: Arc<dyn ArtifactStore>,
    policy: PollPolicy,
    staging: String,
}

impl JobController {
    pub fn new(provider: Arc<dyn VideoProvider>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            provider,
            store,
            policy: PollPolicy::default(),
            staging: "video_staging/".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Provider-side location where job output is staged.
    pub fn with_staging(mut self, staging: impl Into<String>) -> Self {
        self.staging = staging.into();
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// What the provider will actually use for `request`.
    pub fn applied(&self, request: &VideoRequest) -> AppliedParams {
        self.provider.applied(request)
    }

    /// Run a job until it completes, fails or exhausts the budget.
    pub async fn run(&self, request: &VideoRequest) -> Result<JobOutcome> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Like [`JobController::run`], but stops waiting when `cancel` fires.
    ///
    /// Cancellation is reported as [`ToolError::TimedOut`]. On cancellation
    /// and on timeout the provider-side job is cancelled in the background.
    #[instrument(skip(self, request, cancel), fields(seed = request.seed))]
    pub async fn run_with_cancel(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome> {
        let started = Instant::now();
        let job_id = self.provider.submit(request, &self.staging).await?;
        let mut job = GenerationJob::submitted(job_id.clone());
        info!("Started video job {}", job_id);

        let mut polls = 0u32;
        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.policy.timeout {
                return Err(self.abandon(&mut job, elapsed, "timed out"));
            }
            if cancel.is_cancelled() {
                return Err(self.abandon(&mut job, elapsed, "cancelled"));
            }

            polls += 1;
            let status = self.provider.poll(&job_id).await?;
            info!(
                "Video job {} status: {:?} (elapsed: {}s)",
                job_id,
                status,
                elapsed.as_secs()
            );

            if job.observe(status)? {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(self.abandon(&mut job, started.elapsed(), "cancelled"));
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }

        let location = match self.provider.locate_output(&self.staging, &job_id).await? {
            Some(location) => location,
            None => {
                let reason = format!("job {} completed but produced no output", job_id);
                job.fail(reason.clone());
                return Err(ToolError::GenerationFailed(reason));
            }
        };
        job.output_location = Some(location.clone());

        let bytes = self.provider.fetch(&location).await?;
        debug!("Fetched {} bytes from {}", bytes.len(), location);

        let filename = format!("generated_video_{}.mp4", Utc::now().format("%Y%m%d_%H%M%S"));
        let link = self
            .store
            .put(VIDEO_CATEGORY, &bytes, &filename, "video/mp4")
            .await?;

        if let Err(e) = self.provider.delete(&location).await {
            warn!("Failed to clean up temporary video {}: {}", location, e);
        }

        info!("Video job {} stored as {}", job_id, filename);
        Ok(JobOutcome {
            job,
            filename,
            link,
            polls,
        })
    }

    /// Give up on `job` and cancel it on the provider side in the background.
    fn abandon(&self, job: &mut GenerationJob, elapsed: Duration, why: &str) -> ToolError {
        job.time_out();
        warn!("Video job {} {} after {}s", job.id, why, elapsed.as_secs());

        let provider = self.provider.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            if let Err(e) = provider.cancel(&job_id).await {
                warn!("Failed to cancel video job {}: {}", job_id, e);
            }
        });

        ToolError::TimedOut {
            job_id: job.id.clone(),
            elapsed_secs: elapsed.as_secs(),
        }
    }
}
