//! Check transcoder availability.

use clipforge_common::config::AppConfig;
use clipforge_render_engine::FfmpegRunner;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ClipForge System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for (label, binary) in [
        ("ffmpeg", &config.transcoder.ffmpeg_path),
        ("ffprobe", &config.transcoder.ffprobe_path),
    ] {
        if FfmpegRunner::new(binary.clone()).is_available().await {
            println!("[OK] {label}: {}", binary.display());
        } else {
            println!(
                "[MISSING] {label}: {} (install FFmpeg or set transcoder.{label}_path)",
                binary.display()
            );
            all_ok = false;
        }
    }

    println!();
    println!("Output directory: {}", config.output_dir.display());
    println!("Temp directory: {}", config.temp_dir.display());
    println!("Transcoder timeout: {}s", config.transcoder.timeout_secs);

    println!();
    if all_ok {
        println!("All required tools are available. ClipForge is ready.");
    } else {
        println!("Some required tools are missing. Renders will fail until they are installed.");
    }

    Ok(())
}
