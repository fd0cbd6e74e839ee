use clipforge_clip_model::FaceSample;
use clipforge_processing_core::{
    crop_window, AnalysisFrame, CropGeometry, CropPathEngine, RegionDetector,
};
use proptest::prelude::*;

fn sample_strategy() -> impl Strategy<Value = (f64, f64, f64)> {
    (-0.2f64..1.2, -0.2f64..1.2, 0.0f64..1.0)
}

proptest! {
    #[test]
    fn crop_origin_never_leaves_source(
        src_w in 64u32..3840,
        src_h in 64u32..2160,
        target in prop_oneof![
            Just((1080u32, 1920u32)),
            Just((1920, 1080)),
            Just((1080, 1080)),
            Just((1080, 1350)),
        ],
        raw in proptest::collection::vec(sample_strategy(), 3..60),
        probes in proptest::collection::vec(-5.0f64..200.0, 1..40),
    ) {
        let duration = raw.len() as f64 * 2.0;
        let samples: Vec<FaceSample> = raw
            .iter()
            .enumerate()
            .map(|(i, (x, y, c))| FaceSample {
                time_secs: i as f64 * 2.0,
                center_x: *x,
                center_y: *y,
                width: 0.1,
                height: 0.1,
                confidence: *c,
            })
            .collect();
        let geometry = CropGeometry {
            source_width: src_w,
            source_height: src_h,
            target_width: target.0,
            target_height: target.1,
            clip_duration_secs: duration,
        };

        let spec = CropPathEngine::with_defaults()
            .plan_from_samples(&samples, &geometry)
            .expect("three or more samples always plan");

        prop_assert!(spec.width <= src_w && spec.height <= src_h);
        prop_assert_eq!(spec.width % 2, 0);
        prop_assert_eq!(spec.height % 2, 0);

        let max_x = (src_w - spec.width) as f64;
        let max_y = (src_h - spec.height) as f64;
        let times = samples.iter().map(|s| s.time_secs).chain(probes.iter().copied());
        for t in times {
            let (x, y) = spec.origin_at(t);
            prop_assert!(x >= 0.0 && x <= max_x + 1e-9, "x={} max={} t={}", x, max_x, t);
            prop_assert!(y >= 0.0 && y <= max_y + 1e-9, "y={} max={} t={}", y, max_y, t);
        }
    }

    #[test]
    fn crop_window_matches_target_aspect(
        src_w in 2u32..4000,
        src_h in 2u32..4000,
        tw in 1u32..20,
        th in 1u32..20,
    ) {
        let (w, h) = crop_window(src_w, src_h, tw, th);
        prop_assert!(w >= 2 && h >= 2);
        prop_assert_eq!(w % 2, 0);
        prop_assert_eq!(h % 2, 0);
        prop_assert!(w <= src_w.max(2) && h <= src_h.max(2));
    }
}

struct FixedDetector(f64);

impl RegionDetector for FixedDetector {
    fn detect(&self, frame: &AnalysisFrame) -> FaceSample {
        FaceSample {
            time_secs: frame.time_secs,
            center_x: self.0,
            center_y: 0.5,
            width: 0.2,
            height: 0.3,
            confidence: 1.0,
        }
    }
}

#[test]
fn custom_detector_plugs_into_engine() {
    let frames: Vec<AnalysisFrame> = (0..4)
        .map(|i| AnalysisFrame::filled(i as f64 * 2.0, 16, 9, [0, 0, 0]))
        .collect();
    let geometry = CropGeometry {
        source_width: 1920,
        source_height: 1080,
        target_width: 1080,
        target_height: 1920,
        clip_duration_secs: 8.0,
    };

    let spec = CropPathEngine::new(FixedDetector(0.0))
        .plan(&frames, &geometry)
        .unwrap();

    // Subject pinned to the left edge: constant, clamped origin.
    assert!(spec.is_static());
    assert_eq!(spec.origin_at(3.0), (0.0, 0.0));
}
