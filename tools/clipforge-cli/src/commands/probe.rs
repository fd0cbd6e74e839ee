//! Show source media information.

use std::path::PathBuf;

use clipforge_common::config::AppConfig;
use clipforge_render_engine::probe_source;

pub async fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let probe = probe_source(config.transcoder.ffprobe_path.clone(), &path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", path.display()))?;

    println!("Source: {}", path.display());
    println!("  Container: {}", probe.format_name);
    println!("  Duration: {:.3}s", probe.duration_secs);
    println!("  Resolution: {}x{}", probe.width, probe.height);
    println!(
        "  Video codec: {}",
        probe.video_codec.as_deref().unwrap_or("unknown")
    );
    println!("  Audio: {}", if probe.has_audio { "yes" } else { "no" });

    Ok(())
}
