//! Render one clip from a store file.

use std::io::Write;
use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_render_engine::{ProgressEvent, ProgressSink, RenderReport};

use super::{build_service, open_store};

/// Prints progress on a single updating line.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn progress(&self, event: ProgressEvent) {
        print!("\r  Progress: {:>3}% {:<48}", event.percent, event.message);
        std::io::stdout().flush().ok();
    }

    fn log(&self, clip_id: &str, line: &str) {
        tracing::debug!(clip_id, "{line}");
    }
}

pub async fn run(
    config: &AppConfig,
    store_path: PathBuf,
    clip_id: String,
    output: Option<PathBuf>,
    resolution: Option<u32>,
    tracking: bool,
) -> anyhow::Result<()> {
    println!("Rendering clip {clip_id} from: {}", store_path.display());

    let store = open_store(&store_path)?;
    let service = build_service(config, store, output, resolution, tracking);

    match service.render_clip(&clip_id, &ConsoleSink).await {
        Ok(rendered) => {
            println!();
            println!("Render complete: {}", rendered.output_path.display());
            println!("  Size: {} bytes", rendered.size_bytes);

            let report_path = RenderReport::path_for(&rendered.output_path);
            if let Ok(json) = std::fs::read_to_string(&report_path) {
                if let Ok(report) = serde_json::from_str::<RenderReport>(&json) {
                    println!("  Attempt used: {} ({})", report.tier.number(), report.tier);
                    if report.overlays_dropped {
                        println!("  Note: captions and hook title could not be added");
                    }
                }
            }
            println!("  Report: {}", report_path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Render failed: {e}"))
        }
    }
}
