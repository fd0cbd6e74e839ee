//! Encoder selection and the key/value settings map it is resolved from.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use clipforge_common::error::ClipError;

/// Video encoder passed to `-c:v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoEncoder {
    #[default]
    Libx264,
    Libx265,
    H264Nvenc,
    HevcNvenc,
    H264Videotoolbox,
    H264Qsv,
}

impl VideoEncoder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Libx265 => "libx265",
            Self::H264Nvenc => "h264_nvenc",
            Self::HevcNvenc => "hevc_nvenc",
            Self::H264Videotoolbox => "h264_videotoolbox",
            Self::H264Qsv => "h264_qsv",
        }
    }

    pub fn is_hardware(self) -> bool {
        !matches!(self, Self::Libx264 | Self::Libx265)
    }

    pub fn is_hevc(self) -> bool {
        matches!(self, Self::Libx265 | Self::HevcNvenc)
    }

    /// Software encoder producing the same codec family.
    pub fn software_equivalent(self) -> Self {
        if self.is_hevc() {
            Self::Libx265
        } else {
            Self::Libx264
        }
    }
}

impl fmt::Display for VideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoEncoder {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "libx264" | "x264" | "h264" => Ok(Self::Libx264),
            "libx265" | "x265" | "hevc" | "h265" => Ok(Self::Libx265),
            "h264_nvenc" | "nvenc" => Ok(Self::H264Nvenc),
            "hevc_nvenc" => Ok(Self::HevcNvenc),
            "h264_videotoolbox" | "videotoolbox" => Ok(Self::H264Videotoolbox),
            "h264_qsv" | "qsv" => Ok(Self::H264Qsv),
            other => Err(ClipError::invalid_input(format!(
                "Unknown encoder: {other}"
            ))),
        }
    }
}

/// Speed/quality trade-off. Ordered from fastest to highest quality.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Fast,
    #[default]
    Balanced,
    High,
}

impl QualityPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::High => "high",
        }
    }

    /// x264/x265 `-preset` name.
    pub fn x264_name(self) -> &'static str {
        match self {
            Self::Fast => "veryfast",
            Self::Balanced => "medium",
            Self::High => "slow",
        }
    }

    /// Default constant rate factor for the preset.
    pub fn default_crf(self) -> u8 {
        match self {
            Self::Fast => 26,
            Self::Balanced => 23,
            Self::High => 20,
        }
    }

    /// `-preset` value understood by `encoder`, if it takes one.
    pub fn preset_for(self, encoder: VideoEncoder) -> Option<&'static str> {
        match encoder {
            VideoEncoder::Libx264 | VideoEncoder::Libx265 | VideoEncoder::H264Qsv => {
                Some(self.x264_name())
            }
            VideoEncoder::H264Nvenc | VideoEncoder::HevcNvenc => Some(match self {
                Self::Fast => "p2",
                Self::Balanced => "p4",
                Self::High => "p6",
            }),
            VideoEncoder::H264Videotoolbox => None,
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "speed" => Ok(Self::Fast),
            "balanced" | "medium" => Ok(Self::Balanced),
            "high" | "quality" => Ok(Self::High),
            other => Err(ClipError::invalid_input(format!(
                "Unknown quality preset: {other}. Use: fast, balanced, high"
            ))),
        }
    }
}

/// Resolved encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub encoder: VideoEncoder,
    pub preset: QualityPreset,
    pub crf: u8,
    pub hw_accel: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            encoder: VideoEncoder::Libx264,
            preset: QualityPreset::Balanced,
            crf: QualityPreset::Balanced.default_crf(),
            hw_accel: false,
        }
    }
}

/// Flat key/value settings as kept by the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsMap(pub BTreeMap<String, String>);

impl SettingsMap {
    pub const ENCODER: &'static str = "encoder";
    pub const QUALITY_PRESET: &'static str = "quality_preset";
    pub const CRF: &'static str = "crf";
    pub const HW_ACCEL: &'static str = "hw_accel";
    pub const WATERMARK_ENABLED: &'static str = "watermark_enabled";
    pub const WATERMARK_TEXT: &'static str = "watermark_text";
    pub const WATERMARK_IMAGE: &'static str = "watermark_image";
    pub const WATERMARK_ANIMATED: &'static str = "watermark_animated";
    pub const NOISE_REDUCTION: &'static str = "noise_reduction";
    pub const VOICE_CLARITY: &'static str = "voice_clarity";

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }

    /// Resolve the encoder settings. Unknown values fall back to defaults
    /// with a warning so a bad settings entry never blocks a render.
    pub fn encoder_settings(&self) -> EncoderSettings {
        let mut settings = EncoderSettings::default();

        if let Some(raw) = self.get(Self::ENCODER) {
            match raw.parse() {
                Ok(encoder) => settings.encoder = encoder,
                Err(e) => tracing::warn!(value = raw, "Ignoring encoder setting: {e}"),
            }
        }
        if let Some(raw) = self.get(Self::QUALITY_PRESET) {
            match raw.parse() {
                Ok(preset) => settings.preset = preset,
                Err(e) => tracing::warn!(value = raw, "Ignoring quality preset: {e}"),
            }
        }
        settings.crf = self
            .get(Self::CRF)
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .filter(|crf| *crf <= 51)
            .unwrap_or_else(|| settings.preset.default_crf());
        settings.hw_accel = self.flag(Self::HW_ACCEL) && settings.encoder.is_hardware();

        settings
    }
}
