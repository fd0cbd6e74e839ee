//! ClipForge Processing Core: the Crop-Path Engine
//!
//! Turns sampled frames into a time-varying crop window for subject
//! tracking:
//! - **Region detection:** Classify subject pixels per frame behind [`RegionDetector`]
//! - **Smoothing:** Confidence- and distance-weighted neighbour averaging
//! - **Crop paths:** Largest-fit crop window plus clamped piecewise origins
//!
//! This crate is pure computation: no I/O, no process spawning.
//! All inputs are data; all outputs are data.

pub mod crop_path;
pub mod frame;
pub mod region;
pub mod smoothing;

pub use crop_path::{center_crop, crop_window, CropGeometry, CropPathEngine};
pub use frame::{frames_from_rawvideo, AnalysisFrame, FrameError};
pub use region::{RegionDetector, SkinToneDetector};
pub use smoothing::{smooth_samples, SampleSmoother};
