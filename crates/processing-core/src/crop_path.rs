//! Crop-path engine: subject samples to a time-varying crop window.
//!
//! Pipeline: detect one sample per frame, smooth, size the largest window of
//! the target aspect that fits the source, then turn sample centers into
//! clamped crop origins. Zero samples or unusable geometry yield `None`,
//! which callers treat as "use a static center crop".

use clipforge_clip_model::{even_floor, AxisPath, CropSpec, FaceSample};

use crate::frame::AnalysisFrame;
use crate::region::{RegionDetector, SkinToneDetector};
use crate::smoothing::{smooth_samples, DEFAULT_RADIUS};

/// Source and target sizes for one plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropGeometry {
    pub source_width: u32,
    pub source_height: u32,
    pub target_width: u32,
    pub target_height: u32,
    /// Clip duration; samples past it are ignored.
    pub clip_duration_secs: f64,
}

impl CropGeometry {
    fn is_usable(&self) -> bool {
        self.source_width >= 2
            && self.source_height >= 2
            && self.target_width > 0
            && self.target_height > 0
            && self.clip_duration_secs.is_finite()
            && self.clip_duration_secs > 0.0
    }
}

/// Largest even `(width, height)` box with the target aspect ratio that fits
/// inside the source.
pub fn crop_window(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let target_ratio = target_width.max(1) as f64 / target_height.max(1) as f64;
    let source_ratio = source_width.max(1) as f64 / source_height.max(1) as f64;

    let (w, h) = if source_ratio > target_ratio {
        let h = source_height as f64;
        ((h * target_ratio).floor(), h)
    } else {
        let w = source_width as f64;
        (w, (w / target_ratio).floor())
    };

    let w = even_floor(w as u32).min(source_width.max(2));
    let h = even_floor(h as u32).min(source_height.max(2));
    (w, h)
}

/// Static crop centered in the source.
pub fn center_crop(geometry: &CropGeometry) -> CropSpec {
    let (cw, ch) = crop_window(
        geometry.source_width,
        geometry.source_height,
        geometry.target_width,
        geometry.target_height,
    );
    CropSpec {
        width: cw,
        height: ch,
        x: AxisPath::Constant(((geometry.source_width - cw) / 2) as f64),
        y: AxisPath::Constant(((geometry.source_height - ch) / 2) as f64),
    }
}

/// Crop-path engine.
#[derive(Debug, Clone)]
pub struct CropPathEngine<D = SkinToneDetector> {
    detector: D,
    smoothing_radius: usize,
}

impl CropPathEngine<SkinToneDetector> {
    pub fn with_defaults() -> Self {
        Self::new(SkinToneDetector::default())
    }
}

impl<D: RegionDetector> CropPathEngine<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            smoothing_radius: DEFAULT_RADIUS,
        }
    }

    pub fn with_smoothing_radius(mut self, radius: usize) -> Self {
        self.smoothing_radius = radius;
        self
    }

    /// One sample per frame.
    pub fn detect_samples(&self, frames: &[AnalysisFrame]) -> Vec<FaceSample> {
        frames.iter().map(|f| self.detector.detect(f)).collect()
    }

    /// Detect, smooth, and interpolate a crop path from sampled frames.
    pub fn plan(&self, frames: &[AnalysisFrame], geometry: &CropGeometry) -> Option<CropSpec> {
        let samples = self.detect_samples(frames);
        tracing::debug!(
            frames = frames.len(),
            samples = samples.len(),
            "Detected subject samples"
        );
        self.plan_from_samples(&samples, geometry)
    }

    /// Build a crop path from already-detected samples.
    pub fn plan_from_samples(
        &self,
        samples: &[FaceSample],
        geometry: &CropGeometry,
    ) -> Option<CropSpec> {
        if !geometry.is_usable() {
            tracing::debug!(?geometry, "Unusable crop geometry");
            return None;
        }

        let mut samples: Vec<FaceSample> = samples
            .iter()
            .copied()
            .filter(|s| {
                s.time_secs.is_finite()
                    && s.center_x.is_finite()
                    && s.center_y.is_finite()
                    && s.time_secs >= 0.0
                    && s.time_secs <= geometry.clip_duration_secs
            })
            .collect();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));

        let smoothed = smooth_samples(&samples, self.smoothing_radius);

        let (cw, ch) = crop_window(
            geometry.source_width,
            geometry.source_height,
            geometry.target_width,
            geometry.target_height,
        );
        let src_w = geometry.source_width as f64;
        let src_h = geometry.source_height as f64;
        let max_x = (src_w - cw as f64).max(0.0);
        let max_y = (src_h - ch as f64).max(0.0);

        let origins: Vec<(f64, f64, f64)> = smoothed
            .iter()
            .map(|s| {
                let x = (s.center_x * src_w - cw as f64 / 2.0).clamp(0.0, max_x);
                let y = (s.center_y * src_h - ch as f64 / 2.0).clamp(0.0, max_y);
                (s.time_secs, x.round(), y.round())
            })
            .collect();

        let (x, y) = if origins.len() < 3 {
            let n = origins.len() as f64;
            let avg_x = origins.iter().map(|o| o.1).sum::<f64>() / n;
            let avg_y = origins.iter().map(|o| o.2).sum::<f64>() / n;
            (
                AxisPath::Constant(avg_x.round().clamp(0.0, max_x)),
                AxisPath::Constant(avg_y.round().clamp(0.0, max_y)),
            )
        } else {
            (
                axis_path(origins.iter().map(|o| (o.0, o.1)).collect()),
                axis_path(origins.iter().map(|o| (o.0, o.2)).collect()),
            )
        };

        tracing::debug!(
            crop_w = cw,
            crop_h = ch,
            static_x = x.is_constant(),
            static_y = y.is_constant(),
            "Planned crop path"
        );

        Some(CropSpec {
            width: cw,
            height: ch,
            x,
            y,
        })
    }
}

/// Collapse an axis that never moves to a constant.
fn axis_path(points: Vec<(f64, f64)>) -> AxisPath {
    let first = points.first().map(|p| p.1).unwrap_or(0.0);
    if points.iter().all(|p| (p.1 - first).abs() < 0.5) {
        return AxisPath::Constant(first);
    }
    AxisPath::piecewise(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> CropGeometry {
        CropGeometry {
            source_width: 1920,
            source_height: 1080,
            target_width: 1080,
            target_height: 1920,
            clip_duration_secs: 30.0,
        }
    }

    fn sample(t: f64, x: f64) -> FaceSample {
        FaceSample {
            time_secs: t,
            center_x: x,
            center_y: 0.5,
            width: 0.1,
            height: 0.2,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_crop_window_portrait_from_landscape() {
        // 1080 * 9/16 = 607.5 -> 607 -> 606
        assert_eq!(crop_window(1920, 1080, 1080, 1920), (606, 1080));
        assert_eq!(crop_window(1920, 1080, 1920, 1080), (1920, 1080));
        assert_eq!(crop_window(1080, 1920, 1920, 1080), (1080, 606));
        assert_eq!(crop_window(1920, 1080, 1080, 1080), (1080, 1080));
    }

    #[test]
    fn test_center_crop_is_centered() {
        let spec = center_crop(&geometry());
        assert_eq!(spec.origin_at(0.0), (657.0, 0.0));
        assert!(spec.is_static());
    }

    #[test]
    fn test_no_samples_yields_none() {
        let engine = CropPathEngine::with_defaults();
        assert!(engine.plan_from_samples(&[], &geometry()).is_none());
    }

    #[test]
    fn test_zero_duration_yields_none() {
        let engine = CropPathEngine::with_defaults();
        let mut geometry = geometry();
        geometry.clip_duration_secs = 0.0;
        assert!(engine
            .plan_from_samples(&[sample(0.0, 0.5)], &geometry)
            .is_none());
    }

    #[test]
    fn test_two_samples_give_static_average() {
        let engine = CropPathEngine::with_defaults();
        let spec = engine
            .plan_from_samples(&[sample(0.0, 0.25), sample(2.0, 0.25)], &geometry())
            .unwrap();
        assert!(spec.is_static());
        // 0.25 * 1920 - 303 = 177
        assert_eq!(spec.x, AxisPath::Constant(177.0));
    }

    #[test]
    fn test_three_samples_interpolate_with_clamping() {
        let engine = CropPathEngine::with_defaults().with_smoothing_radius(0);
        let spec = engine
            .plan_from_samples(
                &[sample(0.0, 0.0), sample(2.0, 0.5), sample(4.0, 1.0)],
                &geometry(),
            )
            .unwrap();

        let AxisPath::Piecewise(points) = &spec.x else {
            panic!("expected moving x axis");
        };
        assert_eq!(points.first().map(|p| p.1), Some(0.0));
        assert_eq!(points.last().map(|p| p.1), Some(1314.0));
        assert_eq!(spec.x.value_at(100.0), 1314.0);
        assert!(spec.y.is_constant());
    }

    #[test]
    fn test_plan_from_frames_follows_subject() {
        let wall = [40, 60, 90];
        let skin = [200, 140, 110];
        let frames: Vec<AnalysisFrame> = (0..5)
            .map(|i| {
                let mut frame = AnalysisFrame::filled(i as f64 * 2.0, 160, 90, wall);
                frame.fill_rect(10 + i * 30, 30, 16, 24, skin);
                frame
            })
            .collect();

        let spec = CropPathEngine::with_defaults()
            .plan(&frames, &geometry())
            .unwrap();
        let (x0, _) = spec.origin_at(0.0);
        let (x1, _) = spec.origin_at(8.0);
        assert!(x1 > x0);
    }
}
