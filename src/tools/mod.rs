//! The shipped tool set and catalogue assembly.

mod documents;
mod image;
mod search;
mod video;

pub use documents::{
    CsvRenderer, DocumentArgs, DocumentGeneratorTool, DocumentRenderer, MarkdownRenderer,
    PresentationArgs, PresentationGeneratorTool, Rendered, SlideSpec, SpreadsheetArgs,
    SpreadsheetGeneratorTool, DOCUMENT_CATEGORY,
};
pub use image::{ImageArgs, ImageGeneratorTool, IMAGE_CATEGORY};
pub use search::{InternetSearchTool, SearchArgs};
pub use video::{VideoArgs, VideoGeneratorTool};

use crate::artifact::{ArtifactStore, LocalArtifactStore};
use crate::config::{Prompts, Settings};
use crate::contract::ToolRegistry;
use crate::error::Result;
use crate::generation::{
    ImageProvider, JobController, OpenAIImageProvider, OpenAIVideoProvider, PollPolicy,
};
use crate::search::SearchAdapter;
use crate::summarize::{OpenAICompletionModel, Summarizer, SummaryLimits};
use std::sync::Arc;
use tracing::info;

/// Components the tools are built from.
pub struct ToolDeps {
    pub store: Arc<dyn ArtifactStore>,
    pub search: Arc<SearchAdapter>,
    pub images: Arc<dyn ImageProvider>,
    pub videos: Arc<JobController>,
}

/// Register every tool against `deps`.
pub fn catalogue(deps: ToolDeps, enable_for_plain_chat: bool) -> ToolRegistry {
    let mut registry = ToolRegistry::new().with_plain_chat(enable_for_plain_chat);

    registry.register(InternetSearchTool::new(deps.search));
    registry.register(ImageGeneratorTool::new(deps.images, deps.store.clone()));
    registry.register(VideoGeneratorTool::new(deps.videos));
    registry.register(SpreadsheetGeneratorTool::new(
        Arc::new(CsvRenderer),
        deps.store.clone(),
    ));
    registry.register(DocumentGeneratorTool::new(
        Arc::new(MarkdownRenderer),
        deps.store.clone(),
    ));
    registry.register(PresentationGeneratorTool::new(
        Arc::new(MarkdownRenderer),
        deps.store,
    ));

    registry
}

/// Build the production catalogue: local artifact store and OpenAI providers.
pub fn build_catalogue(settings: &Settings) -> Result<ToolRegistry> {
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::from_settings(settings)?);

    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let completion = Arc::new(OpenAICompletionModel::new(
        &settings.openai,
        &settings.summarizer.model,
    ));
    let summarizer = Arc::new(
        Summarizer::new(completion)
            .with_limits(SummaryLimits::from(&settings.summarizer))
            .with_prompts(&prompts),
    );

    let search = Arc::new(SearchAdapter::from_settings(&settings.search, summarizer));
    let images = Arc::new(OpenAIImageProvider::new(&settings.openai, &settings.image.model));
    let videos = Arc::new(
        JobController::new(
            Arc::new(OpenAIVideoProvider::new(&settings.openai, &settings.video.model)),
            store.clone(),
        )
        .with_policy(PollPolicy::from_settings(&settings.video))
        .with_staging(settings.video.staging_prefix.clone()),
    );

    let registry = catalogue(
        ToolDeps {
            store,
            search,
            images,
            videos,
        },
        settings.catalogue.enable_for_plain_chat,
    );
    info!("Assembled catalogue with {} tools", registry.specs().len());
    Ok(registry)
}
