//! Render request types.
//!
//! A [`RenderRequest`] is built once per render from the project store,
//! settings, and license service, gated, and then passed down the pipeline
//! by reference. Nothing downstream mutates it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use clipforge_common::error::{ClipError, ClipResult};

use crate::audio::{AudioEnhancement, MusicBed, SoundEffectPlacement};
use crate::encoding::EncoderSettings;
use crate::license::RenderLimits;
use crate::overlay::{CaptionConfig, HookTitleConfig, ProgressBarConfig, WatermarkConfig};

/// Slack allowed when a clip end lands just past the probed source duration.
pub const SOURCE_DURATION_TOLERANCE_SECS: f64 = 0.05;

/// Target aspect ratio, e.g. `9:16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub w: u32,
    pub h: u32,
}

impl AspectRatio {
    pub const PORTRAIT: AspectRatio = AspectRatio { w: 9, h: 16 };
    pub const LANDSCAPE: AspectRatio = AspectRatio { w: 16, h: 9 };
    pub const SQUARE: AspectRatio = AspectRatio { w: 1, h: 1 };

    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w: w.max(1),
            h: h.max(1),
        }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }

    /// Even output dimensions whose short side equals `resolution`.
    pub fn output_dimensions(&self, resolution: u32) -> (u32, u32) {
        let short = even_floor(resolution);
        if self.w <= self.h {
            let height = even_round(short as f64 * self.h as f64 / self.w as f64);
            (short, height)
        } else {
            let width = even_round(short as f64 * self.w as f64 / self.h as f64);
            (width, short)
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl FromStr for AspectRatio {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ClipError::invalid_input(format!("Invalid aspect ratio: {s}")))?;
        let w = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ClipError::invalid_input(format!("Invalid aspect ratio: {s}")))?;
        let h = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ClipError::invalid_input(format!("Invalid aspect ratio: {s}")))?;
        if w == 0 || h == 0 {
            return Err(ClipError::invalid_input(format!(
                "Aspect ratio must be non-zero: {s}"
            )));
        }
        Ok(Self { w, h })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = ClipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(value: AspectRatio) -> Self {
        value.to_string()
    }
}

/// Strategy for mapping a source frame onto the target aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReframeMode {
    /// Static crop around the frame center.
    #[default]
    Center,
    /// Whole frame letterboxed over a blurred, zoomed copy of itself.
    Fit,
    /// Left and right halves stacked as two vertical panes.
    Split,
    /// Crop window that follows the detected subject.
    FaceTracking,
    /// Subject-following panel over a blurred full-frame background.
    FaceTrackingWithBlur,
}

impl ReframeMode {
    /// Whether this mode needs the crop-path engine.
    pub fn is_tracking(self) -> bool {
        matches!(self, Self::FaceTracking | Self::FaceTrackingWithBlur)
    }

    /// Whether this mode duplicates the source into two derived streams.
    pub fn requires_multi_stream(self) -> bool {
        matches!(self, Self::Fit | Self::Split | Self::FaceTrackingWithBlur)
    }

    /// Mode substituted when subject tracking is not available.
    pub fn untracked_fallback(self) -> Self {
        match self {
            Self::FaceTracking => Self::Center,
            Self::FaceTrackingWithBlur => Self::Fit,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Fit => "fit",
            Self::Split => "split",
            Self::FaceTracking => "face-tracking",
            Self::FaceTrackingWithBlur => "face-tracking-with-blur",
        }
    }
}

impl fmt::Display for ReframeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReframeMode {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(Self::Center),
            "fit" => Ok(Self::Fit),
            "split" => Ok(Self::Split),
            "face-tracking" | "face_tracking" | "face" => Ok(Self::FaceTracking),
            "face-tracking-with-blur" | "face_tracking_with_blur" | "face-blur" => {
                Ok(Self::FaceTrackingWithBlur)
            }
            other => Err(ClipError::invalid_input(format!(
                "Unknown reframing mode: {other}. Use: center, fit, split, face-tracking, face-tracking-with-blur"
            ))),
        }
    }
}

/// Half-open clip range `[start, end)` on the source timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimeRange {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Check `0 <= start < end <= source_duration`.
    pub fn validate(&self, source_duration_secs: f64) -> ClipResult<()> {
        if !self.start_secs.is_finite() || !self.end_secs.is_finite() {
            return Err(ClipError::invalid_input("Clip range must be finite"));
        }
        if self.start_secs < 0.0 {
            return Err(ClipError::invalid_input(format!(
                "Clip start {:.3}s is negative",
                self.start_secs
            )));
        }
        if self.end_secs <= self.start_secs {
            return Err(ClipError::invalid_input(format!(
                "Clip end {:.3}s must be after start {:.3}s",
                self.end_secs, self.start_secs
            )));
        }
        if source_duration_secs > 0.0
            && self.end_secs > source_duration_secs + SOURCE_DURATION_TOLERANCE_SECS
        {
            return Err(ClipError::invalid_input(format!(
                "Clip end {:.3}s exceeds source duration {:.3}s",
                self.end_secs, source_duration_secs
            )));
        }
        Ok(())
    }
}

/// The long-form source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

impl SourceMedia {
    /// Container extension of the source, used for stream-copy outputs.
    pub fn container_extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("mp4")
    }
}

/// The capability-gated part of a render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Reframing strategy.
    pub reframe: ReframeMode,
    /// Encoder selection.
    pub encoder: EncoderSettings,
    /// Watermark overlay.
    #[serde(default)]
    pub watermark: WatermarkConfig,
    /// Speech enhancement filters.
    #[serde(default)]
    pub audio: AudioEnhancement,
}

/// Everything needed to render one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub clip_id: String,
    pub project_id: String,
    pub source: SourceMedia,
    pub range: TimeRange,
    pub aspect: AspectRatio,
    pub config: RenderConfig,
    #[serde(default)]
    pub captions: CaptionConfig,
    #[serde(default)]
    pub hook: Option<HookTitleConfig>,
    #[serde(default)]
    pub progress_bar: ProgressBarConfig,
    #[serde(default)]
    pub music: Option<MusicBed>,
    #[serde(default)]
    pub sound_effects: Vec<SoundEffectPlacement>,
    pub output_dir: PathBuf,
    /// Limits the config was gated against.
    pub limits: RenderLimits,
}

impl RenderRequest {
    /// Clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.range.duration()
    }

    /// Final MP4 output path; the clip id keeps outputs from colliding.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.mp4", sanitize_file_stem(&self.clip_id)))
    }

    /// Output path for a stream-copy render, matching the source container.
    pub fn stream_copy_output_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}.{}",
            sanitize_file_stem(&self.clip_id),
            self.source.container_extension()
        ))
    }

    /// Intermediate file for the first pass of a two-pass render.
    pub fn first_pass_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.pass1.mp4", sanitize_file_stem(&self.clip_id)))
    }

    /// Whether any caption segment or hook title would be drawn.
    pub fn has_text_overlays(&self) -> bool {
        self.captions.has_segments_in(&self.range)
            || self.hook.as_ref().is_some_and(HookTitleConfig::is_visible)
    }

    /// Validate the request invariants before any attempt is made.
    pub fn validate(&self) -> ClipResult<()> {
        if self.clip_id.trim().is_empty() {
            return Err(ClipError::invalid_input("Clip id must not be empty"));
        }
        if !self.source.path.exists() {
            return Err(ClipError::SourceNotFound {
                path: self.source.path.clone(),
            });
        }
        self.range.validate(self.source.duration_secs)?;

        let RenderConfig { width, height, .. } = self.config;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ClipError::invalid_input(format!(
                "Output dimensions must be even and non-zero, got {width}x{height}"
            )));
        }

        if let Some(music) = &self.music {
            music.validate()?;
        }
        for effect in &self.sound_effects {
            effect.validate()?;
        }
        Ok(())
    }
}

/// Round down to an even number, never below 2.
pub fn even_floor(value: u32) -> u32 {
    (value - value % 2).max(2)
}

/// Round to the nearest even number, never below 2.
pub fn even_round(value: f64) -> u32 {
    let rounded = (value / 2.0).round() * 2.0;
    (rounded.max(2.0)) as u32
}

fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_parse_and_display() {
        let aspect: AspectRatio = "9:16".parse().unwrap();
        assert_eq!(aspect, AspectRatio::PORTRAIT);
        assert_eq!(aspect.to_string(), "9:16");
        assert!("9x16".parse::<AspectRatio>().is_err());
        assert!("0:16".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_output_dimensions_portrait_and_landscape() {
        assert_eq!(AspectRatio::PORTRAIT.output_dimensions(1080), (1080, 1920));
        assert_eq!(AspectRatio::LANDSCAPE.output_dimensions(720), (1280, 720));
        assert_eq!(AspectRatio::SQUARE.output_dimensions(1080), (1080, 1080));
        assert_eq!(AspectRatio::new(4, 5).output_dimensions(1080), (1080, 1350));
    }

    #[test]
    fn test_reframe_mode_wire_names() {
        let json = serde_json::to_string(&ReframeMode::FaceTrackingWithBlur).unwrap();
        assert_eq!(json, "\"face-tracking-with-blur\"");
        let mode: ReframeMode = serde_json::from_str("\"face-tracking\"").unwrap();
        assert_eq!(mode, ReframeMode::FaceTracking);
    }

    #[test]
    fn test_reframe_mode_fallbacks() {
        assert_eq!(ReframeMode::FaceTracking.untracked_fallback(), ReframeMode::Center);
        assert_eq!(
            ReframeMode::FaceTrackingWithBlur.untracked_fallback(),
            ReframeMode::Fit
        );
        assert_eq!(ReframeMode::Split.untracked_fallback(), ReframeMode::Split);
        assert!(ReframeMode::Fit.requires_multi_stream());
        assert!(!ReframeMode::FaceTracking.requires_multi_stream());
    }

    #[test]
    fn test_time_range_validation() {
        assert!(TimeRange::new(10.0, 40.0).validate(60.0).is_ok());
        assert!(TimeRange::new(-1.0, 4.0).validate(60.0).is_err());
        assert!(TimeRange::new(5.0, 5.0).validate(60.0).is_err());
        assert!(TimeRange::new(50.0, 61.0).validate(60.0).is_err());
        assert!(TimeRange::new(50.0, 60.02).validate(60.0).is_ok());
    }

    #[test]
    fn test_even_helpers() {
        assert_eq!(even_floor(405), 404);
        assert_eq!(even_floor(1), 2);
        assert_eq!(even_round(405.0), 406);
        assert_eq!(even_round(404.9), 404);
    }

    #[test]
    fn test_sanitized_output_names() {
        assert_eq!(sanitize_file_stem("clip 7/a"), "clip_7_a");
    }
}
