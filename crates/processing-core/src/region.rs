//! Region-of-interest detection on analysis frames.
//!
//! [`SkinToneDetector`] classifies pixels with two fixed colour-space rules
//! and reports the centroid and bounding box of the qualifying pixels. It
//! sits behind [`RegionDetector`] so a learned detector can replace it
//! without touching smoothing or interpolation.

use clipforge_clip_model::FaceSample;

use crate::frame::AnalysisFrame;

/// Produces one [`FaceSample`] per analysed frame.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, frame: &AnalysisFrame) -> FaceSample;
}

/// Empirical skin-tone classifier.
#[derive(Debug, Clone, Copy)]
pub struct SkinToneDetector {
    /// Fewer qualifying pixels than this yields a centred fallback sample.
    pub min_pixels: usize,
    /// Confidence is `density * density_gain`, capped at 1.0.
    pub density_gain: f64,
    /// Confidence of the centred fallback sample.
    pub fallback_confidence: f64,
}

impl Default for SkinToneDetector {
    fn default() -> Self {
        Self {
            min_pixels: 40,
            density_gain: 5.0,
            fallback_confidence: 0.05,
        }
    }
}

impl SkinToneDetector {
    /// Both the RGB and the YCbCr rule must hold.
    pub fn is_skin(rgb: [u8; 3]) -> bool {
        rgb_rule(rgb) && ycbcr_rule(rgb)
    }
}

impl RegionDetector for SkinToneDetector {
    fn detect(&self, frame: &AnalysisFrame) -> FaceSample {
        let mut count = 0usize;
        let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);

        for (x, y, px) in frame.pixels() {
            if !Self::is_skin(px) {
                continue;
            }
            count += 1;
            sum_x += x as f64 + 0.5;
            sum_y += y as f64 + 0.5;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if count < self.min_pixels {
            return FaceSample::centered(frame.time_secs, self.fallback_confidence);
        }

        let w = frame.width as f64;
        let h = frame.height as f64;
        let density = count as f64 / frame.pixel_count().max(1) as f64;

        FaceSample {
            time_secs: frame.time_secs,
            center_x: (sum_x / count as f64 / w).clamp(0.0, 1.0),
            center_y: (sum_y / count as f64 / h).clamp(0.0, 1.0),
            width: ((max_x - min_x + 1) as f64 / w).clamp(0.0, 1.0),
            height: ((max_y - min_y + 1) as f64 / h).clamp(0.0, 1.0),
            confidence: (density * self.density_gain).min(1.0),
        }
    }
}

fn rgb_rule([r, g, b]: [u8; 3]) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95 && g > 40 && b > 20 && max - min > 15 && r.abs_diff(g) > 15 && r > g && r > b
}

fn ycbcr_rule([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
    (77.0..=127.0).contains(&cb) && (133.0..=173.0).contains(&cr)
}
