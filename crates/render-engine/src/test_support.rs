//! Request fixtures shared by unit tests.

use std::path::PathBuf;

use clipforge_clip_model::{
    AspectRatio, AudioEnhancement, CaptionConfig, EncoderSettings, ProgressBarConfig,
    ReframeMode, RenderConfig, RenderLimits, RenderRequest, ResolvedTrack, SourceMedia,
    TimeRange, WatermarkConfig,
};

/// 30 second clip from a 1920x1080 source, rendered to 1080x1920.
pub fn request(reframe: ReframeMode) -> RenderRequest {
    RenderRequest {
        clip_id: "c1".to_string(),
        project_id: "p1".to_string(),
        source: SourceMedia {
            path: PathBuf::from("/videos/talk.mp4"),
            duration_secs: 600.0,
            width: 1920,
            height: 1080,
        },
        range: TimeRange::new(10.0, 40.0),
        aspect: AspectRatio::PORTRAIT,
        config: RenderConfig {
            width: 1080,
            height: 1920,
            reframe,
            encoder: EncoderSettings::default(),
            watermark: WatermarkConfig::default(),
            audio: AudioEnhancement::default(),
        },
        captions: CaptionConfig::default(),
        hook: None,
        progress_bar: ProgressBarConfig::default(),
        music: None,
        sound_effects: Vec::new(),
        output_dir: PathBuf::from("/tmp/clipforge-out"),
        limits: RenderLimits::unrestricted(),
    }
}

pub fn track(path: &str, duration_secs: f64) -> ResolvedTrack {
    ResolvedTrack {
        path: PathBuf::from(path),
        duration_secs,
    }
}
