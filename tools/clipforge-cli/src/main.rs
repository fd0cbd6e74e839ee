//! ClipForge CLI: Command-line interface for rendering short-form clips.
//!
//! Usage:
//!   clipforge render <STORE> <CLIP_ID>   Render a clip from a store file
//!   clipforge plan <STORE> <CLIP_ID>     Print every attempt's ffmpeg command
//!   clipforge gate                       Show what a license tier allows
//!   clipforge probe <PATH>               Show source media information
//!   clipforge status <STORE>             Show clip statuses
//!   clipforge check                      Check transcoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clipforge_clip_model::{LicenseTier, QualityPreset, ReframeMode, VideoEncoder};
use clipforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Render short vertical clips from long-form video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/clipforge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one clip and record its status in the store
    Render {
        /// Path to store.json
        store: PathBuf,

        /// Clip id
        clip_id: String,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Short-side output resolution
        #[arg(long)]
        resolution: Option<u32>,

        /// Skip frame sampling; tracking modes use a static center crop
        #[arg(long)]
        no_tracking: bool,
    },

    /// Print the commands a render would run, without running them
    Plan {
        /// Path to store.json
        store: PathBuf,

        /// Clip id
        clip_id: String,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Short-side output resolution
        #[arg(long)]
        resolution: Option<u32>,

        /// Sample frames and plan the tracking crop path (runs ffmpeg)
        #[arg(long)]
        track: bool,
    },

    /// Show the effective render config for a license tier
    Gate {
        /// License tier: free|pro|studio
        #[arg(long, default_value = "free")]
        tier: LicenseTier,

        /// Requested output width
        #[arg(long, default_value = "1080")]
        width: u32,

        /// Requested output height
        #[arg(long, default_value = "1920")]
        height: u32,

        /// Requested reframing mode
        #[arg(long, default_value = "face-tracking")]
        reframe: ReframeMode,

        /// Requested video encoder
        #[arg(long, default_value = "libx264")]
        encoder: VideoEncoder,

        /// Requested quality preset: fast|balanced|high
        #[arg(long, default_value = "balanced")]
        preset: QualityPreset,
    },

    /// Show source media information
    Probe {
        /// Path to a media file
        path: PathBuf,
    },

    /// Show clip statuses in a store
    Status {
        /// Path to store.json
        store: PathBuf,

        /// Only show this clip
        clip_id: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check transcoder availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    let _log_guard = clipforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Render {
            store,
            clip_id,
            output,
            resolution,
            no_tracking,
        } => {
            commands::render::run(&config, store, clip_id, output, resolution, !no_tracking).await
        }
        Commands::Plan {
            store,
            clip_id,
            output,
            resolution,
            track,
        } => commands::plan::run(&config, store, clip_id, output, resolution, track).await,
        Commands::Gate {
            tier,
            width,
            height,
            reframe,
            encoder,
            preset,
        } => commands::gate::run(tier, width, height, reframe, encoder, preset),
        Commands::Probe { path } => commands::probe::run(&config, path).await,
        Commands::Status {
            store,
            clip_id,
            json,
        } => commands::status::run(store, clip_id, json),
        Commands::Check => commands::check::run(&config).await,
    }
}
