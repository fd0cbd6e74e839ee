//! Capability gate: restrict a requested render config to what the license
//! allows.
//!
//! [`gate`] is pure and idempotent, and it only ever narrows: resolution,
//! encoder, preset, reframing, and audio filters never come out above what
//! was requested.

use clipforge_clip_model::{even_floor, QualityPreset, RenderConfig, RenderLimits};

/// Text used when a watermark is required but none is configured.
pub const DEFAULT_WATERMARK_TEXT: &str = "Made with ClipForge";

pub fn gate(requested: &RenderConfig, limits: &RenderLimits) -> RenderConfig {
    let mut config = requested.clone();

    let (width, height) = cap_resolution(config.width, config.height, limits.max_resolution);
    config.width = width;
    config.height = height;

    if !limits.gpu_allowed {
        config.encoder.encoder = config.encoder.encoder.software_equivalent();
        config.encoder.hw_accel = false;
        config.encoder.preset = config.encoder.preset.min(QualityPreset::Fast);
        config.encoder.crf = config.encoder.crf.max(QualityPreset::Fast.default_crf());
    }

    if !limits.face_track_allowed {
        config.reframe = config.reframe.untracked_fallback();
    }

    if limits.watermark_required && !config.watermark.has_custom_asset() {
        config.watermark.enabled = true;
        let has_text = config
            .watermark
            .text
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_text {
            config.watermark.text = Some(DEFAULT_WATERMARK_TEXT.to_string());
        }
    }

    if !limits.audio_enhancement_allowed {
        config.audio.noise_reduction = false;
        config.audio.voice_clarity = false;
    }

    if config != *requested {
        tracing::debug!(
            requested_w = requested.width,
            requested_h = requested.height,
            width = config.width,
            height = config.height,
            encoder = %config.encoder.encoder,
            reframe = %config.reframe,
            "Capability gate narrowed render config"
        );
    }
    config
}

/// Cap the output height at `max_height`, scaling width by the same factor.
/// Both sides come out even and never grow.
fn cap_resolution(width: u32, height: u32, max_height: u32) -> (u32, u32) {
    let width = even_floor(width);
    let height = even_floor(height);
    if max_height == 0 || height <= max_height {
        return (width, height);
    }
    let capped_h = even_floor(max_height);
    let scaled_w = (width as f64 * capped_h as f64 / height as f64).floor() as u32;
    (even_floor(scaled_w).min(width), capped_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_clip_model::{
        AudioEnhancement, EncoderSettings, LicenseTier, ReframeMode, VideoEncoder,
        WatermarkConfig,
    };

    fn requested() -> RenderConfig {
        RenderConfig {
            width: 1080,
            height: 1920,
            reframe: ReframeMode::FaceTracking,
            encoder: EncoderSettings {
                encoder: VideoEncoder::H264Nvenc,
                preset: QualityPreset::High,
                crf: 20,
                hw_accel: true,
            },
            watermark: WatermarkConfig::default(),
            audio: AudioEnhancement {
                noise_reduction: true,
                voice_clarity: true,
            },
        }
    }

    #[test]
    fn test_free_tier_narrows_everything() {
        let gated = gate(&requested(), &RenderLimits::for_tier(LicenseTier::Free));
        assert_eq!((gated.width, gated.height), (404, 720));
        assert_eq!(gated.encoder.encoder, VideoEncoder::Libx264);
        assert!(!gated.encoder.hw_accel);
        assert_eq!(gated.encoder.preset, QualityPreset::Fast);
        assert_eq!(gated.encoder.crf, QualityPreset::Fast.default_crf());
        assert_eq!(gated.reframe, ReframeMode::Center);
        assert!(gated.watermark.enabled);
        assert_eq!(gated.watermark.text.as_deref(), Some(DEFAULT_WATERMARK_TEXT));
        assert!(!gated.audio.noise_reduction && !gated.audio.voice_clarity);
    }

    #[test]
    fn test_studio_tier_is_identity() {
        let cfg = requested();
        assert_eq!(gate(&cfg, &RenderLimits::for_tier(LicenseTier::Studio)), cfg);
    }

    #[test]
    fn test_custom_watermark_asset_is_kept() {
        let mut cfg = requested();
        cfg.watermark.image = Some("/brand/logo.png".into());
        let gated = gate(&cfg, &RenderLimits::for_tier(LicenseTier::Free));
        assert!(!gated.watermark.enabled);
        assert_eq!(gated.watermark.image, cfg.watermark.image);
    }

    #[test]
    fn test_software_fallback_keeps_lower_quality_crf() {
        let mut cfg = requested();
        cfg.encoder.crf = 30;
        let gated = gate(&cfg, &RenderLimits::for_tier(LicenseTier::Free));
        assert_eq!(gated.encoder.crf, 30);
    }

    #[test]
    fn test_landscape_cap() {
        assert_eq!(cap_resolution(1920, 1080, 720), (1280, 720));
        assert_eq!(cap_resolution(1280, 720, 1080), (1280, 720));
    }
}
