//! License tiers and the render limits they grant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use clipforge_common::error::ClipError;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    #[default]
    Free,
    Pro,
    Studio,
}

impl LicenseTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Studio => "studio",
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseTier {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "studio" => Ok(Self::Studio),
            other => Err(ClipError::invalid_input(format!(
                "Unknown license tier: {other}. Use: free, pro, studio"
            ))),
        }
    }
}

/// What the license service allows for a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderLimits {
    /// Ceiling on output height in pixels.
    pub max_resolution: u32,
    pub watermark_required: bool,
    pub gpu_allowed: bool,
    pub face_track_allowed: bool,
    pub audio_enhancement_allowed: bool,
}

impl RenderLimits {
    pub fn for_tier(tier: LicenseTier) -> Self {
        match tier {
            LicenseTier::Free => Self {
                max_resolution: 720,
                watermark_required: true,
                gpu_allowed: false,
                face_track_allowed: false,
                audio_enhancement_allowed: false,
            },
            LicenseTier::Pro => Self {
                max_resolution: 1080,
                watermark_required: false,
                gpu_allowed: true,
                face_track_allowed: true,
                audio_enhancement_allowed: true,
            },
            LicenseTier::Studio => Self::unrestricted(),
        }
    }

    pub fn unrestricted() -> Self {
        Self {
            max_resolution: 2160,
            watermark_required: false,
            gpu_allowed: true,
            face_track_allowed: true,
            audio_enhancement_allowed: true,
        }
    }
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self::for_tier(LicenseTier::Free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_limits() {
        let limits = RenderLimits::for_tier(LicenseTier::Free);
        assert_eq!(limits.max_resolution, 720);
        assert!(limits.watermark_required);
        assert!(!limits.gpu_allowed);
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("Studio".parse::<LicenseTier>().unwrap(), LicenseTier::Studio);
        assert!("enterprise".parse::<LicenseTier>().is_err());
    }
}
