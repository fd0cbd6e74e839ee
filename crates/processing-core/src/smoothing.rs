//! Temporal smoothing of subject samples.
//!
//! Each sample's position becomes a weighted average over its neighbours,
//! where weight = `confidence / (1 + |i - j|)`. Confident, nearby samples
//! dominate; low-confidence fallbacks barely move the path.

use clipforge_clip_model::FaceSample;

/// Neighbours considered on each side by default.
pub const DEFAULT_RADIUS: usize = 1;

/// Sample smoothing engine.
#[derive(Debug, Clone, Copy)]
pub struct SampleSmoother {
    radius: usize,
}

impl Default for SampleSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS)
    }
}

impl SampleSmoother {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn smooth(&self, samples: &[FaceSample]) -> Vec<FaceSample> {
        smooth_samples(samples, self.radius)
    }
}

/// Confidence- and distance-weighted smoothing over `±radius` neighbours.
///
/// Times, box sizes, and confidences are kept; only centers move. A window
/// whose weights sum to zero keeps the raw sample.
pub fn smooth_samples(samples: &[FaceSample], radius: usize) -> Vec<FaceSample> {
    if radius == 0 || samples.len() < 2 {
        return samples.to_vec();
    }

    let mut result = Vec::with_capacity(samples.len());
    for i in 0..samples.len() {
        let start = i.saturating_sub(radius);
        let end = (i + radius + 1).min(samples.len());

        let (mut sum_w, mut sum_x, mut sum_y) = (0.0, 0.0, 0.0);
        for (j, neighbour) in samples.iter().enumerate().take(end).skip(start) {
            let weight = neighbour.confidence.max(0.0) / (1.0 + i.abs_diff(j) as f64);
            sum_w += weight;
            sum_x += neighbour.center_x * weight;
            sum_y += neighbour.center_y * weight;
        }

        let mut smoothed = samples[i];
        if sum_w > f64::EPSILON {
            smoothed.center_x = sum_x / sum_w;
            smoothed.center_y = sum_y / sum_w;
        }
        result.push(smoothed);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, x: f64, confidence: f64) -> FaceSample {
        FaceSample {
            time_secs: t,
            center_x: x,
            center_y: 0.5,
            width: 0.1,
            height: 0.1,
            confidence,
        }
    }

    #[test]
    fn test_smoothing_reduces_jitter() {
        let raw: Vec<FaceSample> = (0..10)
            .map(|i| sample(i as f64 * 2.0, if i % 2 == 0 { 0.4 } else { 0.6 }, 1.0))
            .collect();

        let smoothed = SampleSmoother::default().smooth(&raw);
        let jitter = |s: &[FaceSample]| -> f64 {
            s.windows(2)
                .map(|w| (w[1].center_x - w[0].center_x).abs())
                .sum()
        };
        assert_eq!(smoothed.len(), raw.len());
        assert!(jitter(&smoothed) < jitter(&raw));
    }

    #[test]
    fn test_weights_follow_confidence_and_distance() {
        let raw = vec![sample(0.0, 0.2, 1.0), sample(2.0, 0.8, 0.5), sample(4.0, 0.2, 0.0)];
        let smoothed = smooth_samples(&raw, 1);

        // index 1: weights 1.0/2, 0.5/1, 0.0/2
        let expected = (0.2 * 0.5 + 0.8 * 0.5) / 1.0;
        assert!((smoothed[1].center_x - expected).abs() < 1e-12);
        assert_eq!(smoothed[1].time_secs, 2.0);
        assert_eq!(smoothed[1].confidence, 0.5);
    }

    #[test]
    fn test_zero_weight_window_keeps_raw() {
        let raw = vec![sample(0.0, 0.3, 0.0), sample(2.0, 0.7, 0.0)];
        assert_eq!(smooth_samples(&raw, 1), raw);
    }

    #[test]
    fn test_zero_radius_passes_through() {
        let raw = vec![sample(0.0, 0.3, 1.0), sample(2.0, 0.7, 1.0)];
        assert_eq!(SampleSmoother::new(0).smooth(&raw), raw);
    }
}
