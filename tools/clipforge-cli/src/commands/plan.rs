//! Print the commands a render would run.

use std::path::PathBuf;

use clipforge_clip_model::RenderRequest;
use clipforge_common::config::AppConfig;
use clipforge_processing_core::{CropGeometry, CropPathEngine};
use clipforge_render_engine::{FfmpegFrameSampler, FrameSampler, VideoGraphBuilder};

use super::{build_service, open_store};

pub async fn run(
    config: &AppConfig,
    store_path: PathBuf,
    clip_id: String,
    output: Option<PathBuf>,
    resolution: Option<u32>,
    track: bool,
) -> anyhow::Result<()> {
    let store = open_store(&store_path)?;
    let service = build_service(config, store, output, resolution, false);

    let request = service
        .prepare(&clip_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to resolve clip {clip_id}: {e}"))?;
    if let Err(e) = request.validate() {
        println!("Warning: render would be rejected: {e}");
    }

    println!("Clip: {} (project {})", request.clip_id, request.project_id);
    println!(
        "  Range: {:.3}s - {:.3}s ({:.3}s)",
        request.range.start_secs,
        request.range.end_secs,
        request.duration()
    );
    println!(
        "  Output: {}x{} {} via {}",
        request.config.width,
        request.config.height,
        request.config.reframe,
        request.config.encoder.encoder
    );

    let crop = if track && request.config.reframe.is_tracking() {
        plan_crop(config, &request).await?
    } else {
        None
    };

    // Placeholder caption path; the real file is written at render time.
    let caption_file = request
        .captions
        .has_segments_in(&request.range)
        .then(|| service.orchestrator().settings().temp_dir.join(format!("{clip_id}.srt")));

    let plan = service
        .orchestrator()
        .plan(&request, crop.as_ref(), caption_file.as_deref());
    for command in plan.commands() {
        println!();
        println!(
            "[{}] -> {}",
            command.tier,
            command.output.display()
        );
        println!("  {} {}", config.transcoder.ffmpeg_path.display(), shell_join(&command.args));
    }

    Ok(())
}

async fn plan_crop(
    config: &AppConfig,
    request: &RenderRequest,
) -> anyhow::Result<Option<clipforge_clip_model::CropSpec>> {
    let sampler = FfmpegFrameSampler::from_config(config);
    let frames = sampler
        .sample(request)
        .await
        .map_err(|e| anyhow::anyhow!("Frame sampling failed: {e}"))?;

    let (target_width, target_height) = VideoGraphBuilder::tracking_target(request);
    let geometry = CropGeometry {
        source_width: request.source.width,
        source_height: request.source.height,
        target_width,
        target_height,
        clip_duration_secs: request.duration(),
    };
    let crop = CropPathEngine::with_defaults().plan(&frames, &geometry);

    println!("  Frames sampled: {}", frames.len());
    match &crop {
        Some(spec) => {
            println!("  Crop window: {}x{}", spec.width, spec.height);
            println!("  Crop x: {}", spec.x.to_expr());
            println!("  Crop y: {}", spec.y.to_expr());
        }
        None => println!("  Crop path: none (center crop)"),
    }
    Ok(crop)
}

/// Quote arguments that a POSIX shell would split or expand.
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@".contains(c));
            if plain {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
