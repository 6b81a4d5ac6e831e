//! Text-to-video generation.

use crate::contract::{
    CallerContext, FieldKind, FieldSpec, MediaKind, Tool, ToolResult, ToolSchema,
};
use crate::error::Result;
use crate::generation::{random_seed, JobController, VideoRequest, SEED_RANGE};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoArgs {
    pub prompt: String,
    pub duration_seconds: u32,
    pub fps: u32,
    pub dimension: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Text-to-video generation through the polling job controller.
pub struct VideoGeneratorTool {
    controller: Arc<JobController>,
}

impl VideoGeneratorTool {
    pub fn new(controller: Arc<JobController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Tool for VideoGeneratorTool {
    type Args = VideoArgs;

    fn name(&self) -> &'static str {
        "video_generator"
    }

    fn description(&self) -> &'static str {
        "Generate short videos from text prompts. Useful for video content, animations and \
         visual storytelling. Generation can take several minutes."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            FieldSpec::required(
                "prompt",
                FieldKind::String,
                "Text prompt describing the video to generate",
            )
            .non_empty(),
            FieldSpec::optional(
                "duration_seconds",
                FieldKind::Integer,
                "Duration of the video in seconds",
            )
            .with_default(json!(8))
            .one_of([4, 8, 12]),
            FieldSpec::optional("fps", FieldKind::Integer, "Frames per second")
                .with_default(json!(24))
                .one_of([24]),
            FieldSpec::optional("dimension", FieldKind::String, "Video dimensions")
                .with_default(json!("1280x720"))
                .one_of(["1280x720", "720x1280"]),
            FieldSpec::optional(
                "seed",
                FieldKind::Integer,
                "Random seed for reproducible results",
            )
            .range(0.0, (SEED_RANGE - 1) as f64),
        ])
    }

    async fn run(&self, args: VideoArgs, _caller: &CallerContext) -> Result<ToolResult> {
        let request = VideoRequest {
            prompt: args.prompt,
            duration_seconds: args.duration_seconds,
            fps: args.fps,
            dimension: args.dimension,
            seed: args.seed.unwrap_or_else(random_seed),
        };
        info!(
            "Generating video: {}...",
            request.prompt.chars().take(100).collect::<String>()
        );

        let outcome = self.controller.run(&request).await?;
        let applied = self.controller.applied(&request);

        let content = format!(
            "Video generated successfully with prompt: '{}'. Duration: {}s, Dimensions: {}, \
             FPS: {}, Seed: {}",
            request.prompt,
            request.duration_seconds,
            applied.dimensions,
            applied.annotate("fps", request.fps),
            applied.annotate("seed", request.seed)
        );
        Ok(ToolResult::artifact(
            content,
            outcome.filename,
            outcome.link,
            MediaKind::Video,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactStore, LinkSigner, MemoryArtifactStore};
    use crate::contract::ToolRequest;
    use crate::generation::controller::tests::ScriptedVideoProvider;
    use crate::generation::ProviderStatus;
    use crate::tools::tests::harness;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_video_runs_to_a_stored_link() {
        let h = harness();
        let result = h
            .registry
            .invoke(ToolRequest::new(
                "video_generator",
                json!({"prompt": "waves on a pier", "seed": 1234}),
            ))
            .await
            .unwrap();

        assert_eq!(result.media_kind, MediaKind::Video);
        assert!(result.inline_payload.is_none());
        assert!(result.source_name.ends_with(".mp4"));
        assert!(result
            .content
            .contains("Duration: 8s, Dimensions: 1280x720, FPS: 24, Seed: 1234"));

        let submitted = h.video.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].seed, 1234);
        assert_eq!(h.video.polls.load(Ordering::SeqCst), 2);

        let link = result.source_link.unwrap();
        assert!(link.contains("/generated_videos/"));
        assert!(!h.store.fetch(&link).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_parameters_are_marked() {
        let mut provider = ScriptedVideoProvider::new(vec![ProviderStatus::Completed]);
        provider.ignored = vec!["fps", "seed"];
        let store = Arc::new(MemoryArtifactStore::new(
            LinkSigner::new("https://cdn.test/artifacts", "k").unwrap(),
        ));
        let tool = VideoGeneratorTool::new(Arc::new(JobController::new(Arc::new(provider), store)));

        let args: VideoArgs = serde_json::from_value(json!({
            "prompt": "waves",
            "duration_seconds": 4,
            "fps": 24,
            "dimension": "720x1280",
            "seed": 8,
        }))
        .unwrap();
        let result = tool.run(args, &CallerContext::default()).await.unwrap();

        assert!(result.content.contains("Duration: 4s, Dimensions: 720x1280"));
        assert!(result.content.contains("FPS: 24 (not applied by the provider)"));
        assert!(result.content.contains("Seed: 8 (not applied by the provider)"));
    }

    #[tokio::test]
    async fn test_unsupported_fps_rejected() {
        let h = harness();
        let err = h
            .registry
            .invoke(ToolRequest::new(
                "video_generator",
                json!({"prompt": "waves", "fps": 30}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert_eq!(h.video.submits.load(Ordering::SeqCst), 0);
    }
}
