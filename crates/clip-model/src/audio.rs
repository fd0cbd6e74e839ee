//! Audio layer configuration: music bed, sound effects, speech enhancement.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use clipforge_common::error::{ClipError, ClipResult};

/// A library track resolved to a playable file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Background music looped under the whole clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicBed {
    pub track: ResolvedTrack,
    /// Volume in `0..=100`.
    pub volume: u8,
}

impl MusicBed {
    /// Linear gain for the volume filter.
    pub fn gain(&self) -> f64 {
        volume_gain(self.volume)
    }

    pub fn validate(&self) -> ClipResult<()> {
        validate_volume(self.volume, "music")
    }
}

/// A one-shot sound effect placed at a clip-relative offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEffectPlacement {
    pub track: ResolvedTrack,
    /// Offset from clip start in seconds.
    pub offset_secs: f64,
    /// Volume in `0..=100`.
    pub volume: u8,
}

impl SoundEffectPlacement {
    /// Offset as whole milliseconds, as adelay expects.
    pub fn delay_ms(&self) -> u64 {
        (self.offset_secs.max(0.0) * 1000.0).round() as u64
    }

    /// Linear gain for the volume filter.
    pub fn gain(&self) -> f64 {
        volume_gain(self.volume)
    }

    pub fn validate(&self) -> ClipResult<()> {
        if !self.offset_secs.is_finite() || self.offset_secs < 0.0 {
            return Err(ClipError::invalid_input(format!(
                "Sound effect offset must be >= 0, got {}",
                self.offset_secs
            )));
        }
        validate_volume(self.volume, "sound effect")
    }
}

/// Speech enhancement toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioEnhancement {
    /// Band-limited denoise with high/low pass.
    pub noise_reduction: bool,
    /// Presence EQ plus gentle compression.
    pub voice_clarity: bool,
}

impl AudioEnhancement {
    pub fn any(&self) -> bool {
        self.noise_reduction || self.voice_clarity
    }
}

fn volume_gain(volume: u8) -> f64 {
    volume.min(100) as f64 / 100.0
}

fn validate_volume(volume: u8, label: &str) -> ClipResult<()> {
    if volume > 100 {
        return Err(ClipError::invalid_input(format!(
            "{label} volume must be within 0..=100, got {volume}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> ResolvedTrack {
        ResolvedTrack {
            path: PathBuf::from("/library/whoosh.wav"),
            duration_secs: 1.2,
        }
    }

    #[test]
    fn test_delay_ms_rounds() {
        let effect = SoundEffectPlacement {
            track: track(),
            offset_secs: 2.0004,
            volume: 80,
        };
        assert_eq!(effect.delay_ms(), 2000);
        assert!((effect.gain() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_negative_offset_rejected() {
        let effect = SoundEffectPlacement {
            track: track(),
            offset_secs: -0.5,
            volume: 80,
        };
        assert!(effect.validate().is_err());
    }

    #[test]
    fn test_volume_out_of_range_rejected() {
        let bed = MusicBed {
            track: track(),
            volume: 120,
        };
        assert!(bed.validate().is_err());
    }
}
