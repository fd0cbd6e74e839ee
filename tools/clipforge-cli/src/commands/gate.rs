//! Show what a license tier does to a requested render config.

use clipforge_clip_model::{
    AudioEnhancement, EncoderSettings, LicenseTier, QualityPreset, ReframeMode, RenderConfig,
    RenderLimits, VideoEncoder, WatermarkConfig,
};
use clipforge_render_engine::gate;

pub fn run(
    tier: LicenseTier,
    width: u32,
    height: u32,
    reframe: ReframeMode,
    encoder: VideoEncoder,
    preset: QualityPreset,
) -> anyhow::Result<()> {
    let requested = RenderConfig {
        width,
        height,
        reframe,
        encoder: EncoderSettings {
            encoder,
            preset,
            crf: preset.default_crf(),
            hw_accel: encoder.is_hardware(),
        },
        watermark: WatermarkConfig::default(),
        audio: AudioEnhancement {
            noise_reduction: true,
            voice_clarity: true,
        },
    };
    let limits = RenderLimits::for_tier(tier);
    let gated = gate(&requested, &limits);

    println!("License tier: {tier}");
    println!("  Max resolution: {}p", limits.max_resolution);
    println!("  GPU encoders: {}", allowed(limits.gpu_allowed));
    println!("  Face tracking: {}", allowed(limits.face_track_allowed));
    println!("  Audio enhancement: {}", allowed(limits.audio_enhancement_allowed));
    println!("  Watermark required: {}", limits.watermark_required);
    println!();

    println!("Requested -> effective:");
    row("Resolution", format!("{width}x{height}"), format!("{}x{}", gated.width, gated.height));
    row("Reframe", requested.reframe, gated.reframe);
    row("Encoder", requested.encoder.encoder, gated.encoder.encoder);
    row("Preset", requested.encoder.preset, gated.encoder.preset);
    row("HW decode", requested.encoder.hw_accel, gated.encoder.hw_accel);
    row(
        "Noise reduction",
        requested.audio.noise_reduction,
        gated.audio.noise_reduction,
    );
    row("Voice clarity", requested.audio.voice_clarity, gated.audio.voice_clarity);
    row(
        "Watermark",
        watermark_label(&requested.watermark),
        watermark_label(&gated.watermark),
    );

    Ok(())
}

fn allowed(flag: bool) -> &'static str {
    if flag {
        "allowed"
    } else {
        "not allowed"
    }
}

fn row(label: &str, requested: impl std::fmt::Display, effective: impl std::fmt::Display) {
    let requested = requested.to_string();
    let effective = effective.to_string();
    let marker = if requested == effective { "" } else { "  *" };
    println!("  {label:<16} {requested:<24} {effective}{marker}");
}

fn watermark_label(watermark: &WatermarkConfig) -> String {
    if !watermark.is_visible() {
        return "none".to_string();
    }
    match (&watermark.image, &watermark.text) {
        (Some(image), _) => format!("image {}", image.display()),
        (None, Some(text)) => format!("text \"{text}\""),
        (None, None) => "none".to_string(),
    }
}
