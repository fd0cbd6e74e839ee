pub mod check;
pub mod gate;
pub mod plan;
pub mod probe;
pub mod render;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use clipforge_clip_model::JsonClipStore;
use clipforge_common::config::AppConfig;
use clipforge_render_engine::{
    ClipRenderService, Collaborators, FfmpegFrameSampler, FfmpegRunner, FfprobeProber,
    OrchestratorSettings, RenderOrchestrator,
};

/// Open a store file with a readable error.
pub fn open_store(path: &std::path::Path) -> anyhow::Result<Arc<JsonClipStore>> {
    let store = JsonClipStore::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open store {}: {e}", path.display()))?;
    Ok(Arc::new(store))
}

/// Wire the render service to ffmpeg, ffprobe, and the store.
pub fn build_service(
    config: &AppConfig,
    store: Arc<JsonClipStore>,
    output: Option<PathBuf>,
    resolution: Option<u32>,
    tracking: bool,
) -> ClipRenderService {
    let runner = FfmpegRunner::from_config(&config.transcoder);
    let mut orchestrator =
        RenderOrchestrator::new(Arc::new(runner), OrchestratorSettings::from_config(config));
    if tracking {
        orchestrator = orchestrator.with_sampler(Arc::new(FfmpegFrameSampler::from_config(config)));
    }

    ClipRenderService::new(
        Collaborators::shared(store),
        orchestrator,
        output.unwrap_or_else(|| config.output_dir.clone()),
        resolution.unwrap_or(config.render.default_resolution),
    )
    .with_prober(Arc::new(FfprobeProber::new(
        config.transcoder.ffprobe_path.clone(),
    )))
}
