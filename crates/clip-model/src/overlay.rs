//! Caption, hook-title, watermark, and progress-bar configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::request::TimeRange;

/// One timed caption line on the source timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start time in seconds (source timeline).
    pub start_secs: f64,
    /// End time in seconds (source timeline).
    pub end_secs: f64,
    /// Caption text.
    pub text: String,
}

/// Vertical placement for burned-in captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Caption styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    pub font_name: String,
    pub font_size: u32,
    /// Primary text colour as `#rrggbb`.
    pub primary_color: String,
    /// Outline colour as `#rrggbb`.
    pub outline_color: String,
    pub outline_width: u32,
    pub bold: bool,
    pub position: CaptionPosition,
    /// Distance from the anchored edge in pixels.
    pub margin_v: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 18,
            primary_color: "#ffffff".to_string(),
            outline_color: "#000000".to_string(),
            outline_width: 2,
            bold: true,
            position: CaptionPosition::Bottom,
            margin_v: 60,
        }
    }
}

/// Burned-in captions for a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptionConfig {
    pub segments: Vec<CaptionSegment>,
    pub style: CaptionStyle,
}

impl CaptionConfig {
    /// Segments overlapping the clip, shifted to clip-relative time and
    /// trimmed to the clip bounds.
    pub fn clip_segments(&self, range: &TimeRange) -> Vec<CaptionSegment> {
        let duration = range.duration();
        self.segments
            .iter()
            .filter(|seg| !seg.text.trim().is_empty())
            .filter(|seg| seg.end_secs > range.start_secs && seg.start_secs < range.end_secs)
            .map(|seg| CaptionSegment {
                start_secs: (seg.start_secs - range.start_secs).clamp(0.0, duration),
                end_secs: (seg.end_secs - range.start_secs).clamp(0.0, duration),
                text: seg.text.trim().to_string(),
            })
            .filter(|seg| seg.end_secs > seg.start_secs)
            .collect()
    }

    /// Whether at least one caption falls inside the clip.
    pub fn has_segments_in(&self, range: &TimeRange) -> bool {
        !self.clip_segments(range).is_empty()
    }
}

/// Title card drawn over the first seconds of the clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookTitleConfig {
    pub text: String,
    /// How long the title stays on screen, from clip start.
    pub duration_secs: f64,
    pub font_size: u32,
    pub text_color: String,
    pub box_color: String,
    /// Box opacity in `[0.0, 1.0]`.
    pub box_opacity: f64,
    /// Vertical center of the title as a fraction of output height.
    pub y_ratio: f64,
    /// Optional font file for drawtext.
    pub font_file: Option<PathBuf>,
}

impl Default for HookTitleConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            duration_secs: 3.0,
            font_size: 64,
            text_color: "#ffffff".to_string(),
            box_color: "#000000".to_string(),
            box_opacity: 0.6,
            y_ratio: 0.18,
            font_file: None,
        }
    }
}

impl HookTitleConfig {
    pub fn is_visible(&self) -> bool {
        !self.text.trim().is_empty() && self.duration_secs > 0.0
    }
}

/// Corner placement for the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Watermark overlay (image or text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub enabled: bool,
    /// Custom watermark image; takes precedence over text.
    pub image: Option<PathBuf>,
    /// Watermark text when no image is set.
    pub text: Option<String>,
    /// Opacity in `[0.0, 1.0]`.
    pub opacity: f64,
    pub corner: WatermarkCorner,
    /// Drift the text watermark slowly across the frame.
    pub animated: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            text: None,
            opacity: 0.7,
            corner: WatermarkCorner::BottomRight,
            animated: false,
        }
    }
}

impl WatermarkConfig {
    /// Whether a custom image asset is configured.
    pub fn has_custom_asset(&self) -> bool {
        self.image.is_some()
    }

    /// Whether anything would be drawn.
    pub fn is_visible(&self) -> bool {
        self.enabled
            && (self.image.is_some() || self.text.as_ref().is_some_and(|t| !t.trim().is_empty()))
    }
}

/// Thin bar along the bottom edge that fills over the clip duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressBarConfig {
    pub enabled: bool,
    pub color: String,
    pub height_px: u32,
}

impl Default for ProgressBarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#ff3b30".to_string(),
            height_px: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> CaptionSegment {
        CaptionSegment {
            start_secs: start,
            end_secs: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_clip_segments_shift_and_trim() {
        let captions = CaptionConfig {
            segments: vec![
                segment(2.0, 9.0, "before"),
                segment(9.0, 12.0, "straddles start"),
                segment(20.0, 22.5, "inside"),
                segment(39.0, 45.0, "straddles end"),
                segment(50.0, 52.0, "after"),
            ],
            style: CaptionStyle::default(),
        };

        let clip = captions.clip_segments(&TimeRange::new(10.0, 40.0));
        assert_eq!(clip.len(), 3);
        assert_eq!(clip[0].start_secs, 0.0);
        assert_eq!(clip[0].end_secs, 2.0);
        assert_eq!(clip[1].start_secs, 10.0);
        assert_eq!(clip[2].end_secs, 30.0);
    }

    #[test]
    fn test_blank_captions_are_ignored() {
        let captions = CaptionConfig {
            segments: vec![segment(0.0, 1.0, "   ")],
            style: CaptionStyle::default(),
        };
        assert!(!captions.has_segments_in(&TimeRange::new(0.0, 5.0)));
    }

    #[test]
    fn test_watermark_visibility() {
        let mut watermark = WatermarkConfig::default();
        assert!(!watermark.is_visible());
        watermark.enabled = true;
        assert!(!watermark.is_visible());
        watermark.text = Some("@channel".to_string());
        assert!(watermark.is_visible());
    }
}
