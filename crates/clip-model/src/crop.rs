//! Subject samples and time-varying crop specifications.
//!
//! Sample coordinates are normalized to `[0.0, 1.0]` of the analysed frame.
//! Crop origins are in source pixels.

use serde::{Deserialize, Serialize};

/// Maximum number of interpolation points kept per axis expression.
pub const MAX_PATH_POINTS: usize = 48;

/// Region of interest detected in one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSample {
    /// Clip-relative time in seconds.
    pub time_secs: f64,
    /// Center X (normalized).
    pub center_x: f64,
    /// Center Y (normalized).
    pub center_y: f64,
    /// Bounding box width (normalized).
    pub width: f64,
    /// Bounding box height (normalized).
    pub height: f64,
    /// Detection confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

impl FaceSample {
    /// Low-confidence sample at the frame center.
    pub fn centered(time_secs: f64, confidence: f64) -> Self {
        Self {
            time_secs,
            center_x: 0.5,
            center_y: 0.5,
            width: 0.0,
            height: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Crop origin along one axis over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AxisPath {
    Constant(f64),
    /// `(time, value)` points, strictly increasing in time.
    Piecewise(Vec<(f64, f64)>),
}

impl AxisPath {
    /// Build a piecewise path, sorting, deduplicating near-equal timestamps,
    /// and downsampling to [`MAX_PATH_POINTS`].
    pub fn piecewise(points: Vec<(f64, f64)>) -> Self {
        let points = downsample_timed_points(sanitize_points(points), MAX_PATH_POINTS);
        match points.len() {
            0 => Self::Constant(0.0),
            1 => Self::Constant(points[0].1),
            _ => Self::Piecewise(points),
        }
    }

    /// Position at clip time `t`, holding the endpoints outside the range.
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Piecewise(points) => {
                let Some(&(first_t, first_v)) = points.first() else {
                    return 0.0;
                };
                if t <= first_t {
                    return first_v;
                }
                for pair in points.windows(2) {
                    let (t0, v0) = pair[0];
                    let (t1, v1) = pair[1];
                    if t < t1 {
                        let span = (t1 - t0).max(1e-4);
                        return v0 + (v1 - v0) * (t - t0) / span;
                    }
                }
                points.last().map(|p| p.1).unwrap_or(first_v)
            }
        }
    }

    /// Smallest and largest value the path can take.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Constant(v) => (*v, *v),
            Self::Piecewise(points) => points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| {
                    (lo.min(v), hi.max(v))
                }),
        }
    }

    /// Expression over `t` for ffmpeg's expression evaluator.
    pub fn to_expr(&self) -> String {
        match self {
            Self::Constant(v) => format!("{v:.6}"),
            Self::Piecewise(points) => build_piecewise_expr(points),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

/// Fixed-size crop window with a per-axis origin path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSpec {
    pub width: u32,
    pub height: u32,
    pub x: AxisPath,
    pub y: AxisPath,
}

impl CropSpec {
    pub fn is_static(&self) -> bool {
        self.x.is_constant() && self.y.is_constant()
    }

    /// Crop origin at clip time `t`.
    pub fn origin_at(&self, t: f64) -> (f64, f64) {
        (self.x.value_at(t), self.y.value_at(t))
    }
}

fn sanitize_points(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.retain(|(t, v)| t.is_finite() && v.is_finite());
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut sanitized: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for (t, v) in points {
        if let Some((last_t, last_v)) = sanitized.last_mut() {
            if (t - *last_t).abs() < 1e-4 {
                *last_t = t;
                *last_v = v;
                continue;
            }
        }
        sanitized.push((t, v));
    }
    sanitized
}

fn downsample_timed_points(points: Vec<(f64, f64)>, max_points: usize) -> Vec<(f64, f64)> {
    if points.len() <= max_points {
        return points;
    }

    let target = max_points.max(2);
    let last_idx = points.len() - 1;
    let mut selected: Vec<(f64, f64)> = Vec::with_capacity(target);
    for i in 0..target {
        let idx = ((i as f64 / (target - 1) as f64) * last_idx as f64).round() as usize;
        if selected.last().map(|p| p.0) != Some(points[idx].0) {
            selected.push(points[idx]);
        }
    }
    selected
}

fn build_piecewise_expr(points: &[(f64, f64)]) -> String {
    let Some(&(first_t, first_v)) = points.first() else {
        return "0".to_string();
    };
    let Some(&(_, last_v)) = points.last() else {
        return "0".to_string();
    };
    if points.len() == 1 {
        return format!("{first_v:.6}");
    }

    let mut expr = format!("{last_v:.6}");
    for pair in points.windows(2).rev() {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        let interp = format!(
            "{v0:.6}+({delta:.6})*(t-{t0:.6})/{dur:.6}",
            delta = v1 - v0,
            dur = (t1 - t0).max(1e-4)
        );
        expr = format!("if(lt(t,{t1:.6}),{interp},{expr})");
    }

    format!("if(lt(t,{first_t:.6}),{first_v:.6},{expr})")
}
