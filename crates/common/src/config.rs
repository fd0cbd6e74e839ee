//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where rendered clips are written.
    pub output_dir: PathBuf,

    /// Scratch directory for caption files and analysis artifacts.
    pub temp_dir: PathBuf,

    /// External transcoder settings.
    pub transcoder: TranscoderConfig,

    /// Render pipeline tunables.
    pub render: RenderDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// External transcoder (ffmpeg) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: PathBuf,

    /// Path or name of the ffprobe binary.
    pub ffprobe_path: PathBuf,

    /// Hard wall-clock limit for one transcoder invocation.
    pub timeout_secs: u64,

    /// Minimum spacing between progress reports.
    pub progress_interval_ms: u64,
}

/// Tunables for the render pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Outputs smaller than this are treated as failed renders.
    pub min_output_bytes: u64,

    /// How far before the clip start the simplified attempt seeks.
    pub pre_seek_buffer_secs: f64,

    /// Frame sampling cadence for subject tracking.
    pub sample_interval_secs: f64,

    /// Analysis frame width used by the region detector.
    pub analysis_width: u32,

    /// Analysis frame height used by the region detector.
    pub analysis_height: u32,

    /// Short-side output resolution when none is requested.
    pub default_resolution: u32,

    /// Integrated loudness target (LUFS).
    pub loudness_target_lufs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs_default_output(),
            temp_dir: std::env::temp_dir().join("clipforge"),
            transcoder: TranscoderConfig::default(),
            render: RenderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            timeout_secs: 20 * 60,
            progress_interval_ms: 500,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            min_output_bytes: 1024,
            pre_seek_buffer_secs: 3.0,
            sample_interval_secs: 2.0,
            analysis_width: 160,
            analysis_height: 90,
            default_resolution: 1080,
            loudness_target_lufs: -14.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipforge").join("config.json")
}

/// Default output directory.
fn dirs_default_output() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("clipforge").join("clips")
}
