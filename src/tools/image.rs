//! Text-to-image generation.

use crate::artifact::ArtifactStore;
use crate::contract::{
    CallerContext, FieldKind, FieldSpec, MediaKind, Tool, ToolResult, ToolSchema,
};
use crate::error::Result;
use crate::generation::{random_seed, ImageProvider, ImageQuality, ImageRequest, SEED_RANGE};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Category under which generated images are stored.
pub const IMAGE_CATEGORY: &str = "generated_images";

const DIMENSIONS: [u32; 7] = [512, 768, 1024, 1152, 1216, 1344, 1536];

#[derive(Debug, Clone, Deserialize)]
pub struct ImageArgs {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub quality: ImageQuality,
    pub cfg_scale: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Text-to-image generation with the picture returned inline.
pub struct ImageGeneratorTool {
    provider: Arc<dyn ImageProvider>,
    store: Arc<dyn ArtifactStore>,
}

impl ImageGeneratorTool {
    pub fn new(provider: Arc<dyn ImageProvider>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { provider, store }
    }
}

#[async_trait]
impl Tool for ImageGeneratorTool {
    type Args = ImageArgs;

    fn name(&self) -> &'static str {
        "image_generator"
    }

    fn description(&self) -> &'static str {
        "Generate images from text prompts. Useful for illustrations, artwork and any other \
         image-based request."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            FieldSpec::required(
                "prompt",
                FieldKind::String,
                "Text prompt describing the image to generate",
            )
            .non_empty(),
            FieldSpec::optional("width", FieldKind::Integer, "Width of the generated image")
                .with_default(json!(1024))
                .one_of(DIMENSIONS),
            FieldSpec::optional("height", FieldKind::Integer, "Height of the generated image")
                .with_default(json!(1024))
                .one_of(DIMENSIONS),
            FieldSpec::optional(
                "quality",
                FieldKind::String,
                "Quality of the generated image ('standard' or 'premium')",
            )
            .with_default(json!("standard"))
            .one_of(["standard", "premium"]),
            FieldSpec::optional(
                "cfg_scale",
                FieldKind::Number,
                "How closely the image should follow the prompt (1.0 to 10.0)",
            )
            .with_default(json!(7.0))
            .range(1.0, 10.0),
            FieldSpec::optional(
                "seed",
                FieldKind::Integer,
                "Random seed for reproducible results",
            )
            .range(0.0, (SEED_RANGE - 1) as f64),
        ])
    }

    #[instrument(skip(self, args, _caller), fields(width = args.width, height = args.height))]
    async fn run(&self, args: ImageArgs, _caller: &CallerContext) -> Result<ToolResult> {
        let seed = args.seed.unwrap_or_else(random_seed);
        let request = ImageRequest {
            prompt: args.prompt,
            width: args.width,
            height: args.height,
            quality: args.quality,
            cfg_scale: args.cfg_scale,
            seed,
        };
        info!(
            "Generating image: {}...",
            request.prompt.chars().take(100).collect::<String>()
        );

        let png = self.provider.generate(&request).await?;
        let applied = self.provider.applied(&request);

        let filename = format!("generated_image_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));
        let link = self
            .store
            .put(IMAGE_CATEGORY, &png, &filename, "image/png")
            .await?;
        info!("Stored image {} ({} bytes)", filename, png.len());

        let content = format!(
            "Image generated successfully with prompt: '{}'. Dimensions: {}, Quality: {}, \
             CFG scale: {}, Seed: {}",
            request.prompt,
            applied.dimensions,
            request.quality.as_str(),
            applied.annotate("cfg_scale", request.cfg_scale),
            applied.annotate("seed", seed)
        );

        ToolResult::artifact(content, filename, link, MediaKind::Image).with_inline_payload(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ToolRequest;
    use crate::error::ToolError;
    use crate::generation::AppliedParams;
    use crate::tools::tests::harness;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_image_is_stored_and_inlined() {
        let h = harness();
        let result = h
            .registry
            .invoke(ToolRequest::new(
                "image_generator",
                json!({"prompt": "a red fox", "width": 768, "quality": "premium", "seed": 99}),
            ))
            .await
            .unwrap();

        assert_eq!(result.media_kind, MediaKind::Image);
        assert!(result.source_name.starts_with("generated_image_"));
        assert!(result.source_name.ends_with(".png"));
        assert!(result.content.contains("Dimensions: 768x1024"));
        assert!(result.content.contains("Quality: premium"));
        assert!(result.content.contains("Seed: 99"));

        let link = result.source_link.unwrap();
        assert!(link.contains("/generated_images/"));
        let stored = h.store.fetch(&link).await.unwrap();
        assert_eq!(Some(stored), result.inline_payload);
        assert_eq!(h.images.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_reports_what_the_provider_applied() {
        struct SnappingProvider;

        #[async_trait]
        impl ImageProvider for SnappingProvider {
            async fn generate(&self, _request: &ImageRequest) -> Result<Vec<u8>> {
                Ok(b"\x89PNG".to_vec())
            }

            fn applied(&self, _request: &ImageRequest) -> AppliedParams {
                AppliedParams::exact("1024x1024").ignoring(&["cfg_scale", "seed"])
            }
        }

        let h = harness();
        let tool = ImageGeneratorTool::new(Arc::new(SnappingProvider), h.store.clone());
        let args: ImageArgs = serde_json::from_value(json!({
            "prompt": "a red fox",
            "width": 1344,
            "height": 768,
            "quality": "standard",
            "cfg_scale": 4.5,
            "seed": 99,
        }))
        .unwrap();
        let result = tool.run(args, &CallerContext::default()).await.unwrap();

        assert!(result.content.contains("Dimensions: 1024x1024"));
        assert!(!result.content.contains("1344x768"));
        assert!(result.content.contains("CFG scale: 4.5 (not applied by the provider)"));
        assert!(result.content.contains("Seed: 99 (not applied by the provider)"));
    }

    #[tokio::test]
    async fn test_seed_is_drawn_when_missing() {
        let h = harness();
        let result = h
            .registry
            .invoke(ToolRequest::new("image_generator", json!({"prompt": "a red fox"})))
            .await
            .unwrap();
        assert!(result.content.contains("Seed: "));
        assert!(result.content.contains("Dimensions: 1024x1024"));
    }

    #[tokio::test]
    async fn test_bad_dimension_rejected_before_provider() {
        let h = harness();
        let err = h
            .registry
            .invoke(ToolRequest::new(
                "image_generator",
                json!({"prompt": "a red fox", "width": 1000}),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArgument { ref field, .. } if field == "width"));
        assert_eq!(h.images.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_outage_is_storage_error() {
        let h = harness();
        h.store.set_available(false);
        let err = h
            .registry
            .invoke(ToolRequest::new("image_generator", json!({"prompt": "a red fox"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage_error");
    }
}
