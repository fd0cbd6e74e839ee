//! Contracts consumed from collaborators, and the records they exchange.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use clipforge_common::error::ClipResult;

use crate::audio::ResolvedTrack;
use crate::encoding::SettingsMap;
use crate::license::RenderLimits;
use crate::overlay::{CaptionSegment, CaptionStyle, HookTitleConfig, ProgressBarConfig};
use crate::request::{AspectRatio, ReframeMode};
use crate::status::ClipStatus;

/// Long-form source project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub source_path: PathBuf,
    pub duration_secs: f64,
    /// Probed source width; 0 when unknown.
    #[serde(default)]
    pub width: u32,
    /// Probed source height; 0 when unknown.
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_aspect")]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub reframe: ReframeMode,
    /// Transcript on the source timeline.
    #[serde(default)]
    pub transcript: Vec<CaptionSegment>,
}

/// A library sound effect placed on a clip, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEffectRef {
    pub track_id: String,
    pub offset_secs: f64,
    #[serde(default = "default_volume")]
    pub volume: u8,
}

/// One clip cut from a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub id: String,
    pub project_id: String,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Overrides the project reframing default.
    #[serde(default)]
    pub reframe: Option<ReframeMode>,
    /// Overrides the project aspect ratio.
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub hook: Option<HookTitleConfig>,
    #[serde(default = "default_true")]
    pub captions_enabled: bool,
    #[serde(default)]
    pub caption_style: Option<CaptionStyle>,
    #[serde(default)]
    pub progress_bar: ProgressBarConfig,
    #[serde(default)]
    pub music_track_id: Option<String>,
    #[serde(default = "default_music_volume")]
    pub music_volume: u8,
    #[serde(default)]
    pub sound_effects: Vec<SoundEffectRef>,
    #[serde(default)]
    pub status: ClipStatus,
}

/// Project and clip storage.
pub trait ClipStore: Send + Sync {
    fn load_clip(&self, clip_id: &str) -> ClipResult<ClipRecord>;

    fn load_project(&self, project_id: &str) -> ClipResult<ProjectRecord>;

    /// Persist a status change. Implementations reject illegal transitions.
    fn set_status(&self, clip_id: &str, status: ClipStatus) -> ClipResult<()>;
}

/// Entitlement lookup. Pure query.
pub trait LicenseService: Send + Sync {
    fn render_limits(&self) -> ClipResult<RenderLimits>;
}

/// Read-only key/value settings.
pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> ClipResult<SettingsMap>;
}

/// Music and sound-effect library.
pub trait MediaLibrary: Send + Sync {
    fn resolve(&self, track_id: &str) -> ClipResult<ResolvedTrack>;
}

fn default_aspect() -> AspectRatio {
    AspectRatio::PORTRAIT
}

fn default_true() -> bool {
    true
}

fn default_volume() -> u8 {
    100
}

fn default_music_volume() -> u8 {
    20
}
