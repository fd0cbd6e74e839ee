//! ffmpeg argument lists for each attempt tier and the overlay pass.
//!
//! Builders are pure; they only assemble argv vectors. Paths are passed as
//! separate arguments, never through a shell.

use std::path::{Path, PathBuf};

use clipforge_clip_model::{EncoderSettings, RenderRequest, VideoEncoder};

use crate::attempt::AttemptTier;
use crate::audio_graph::AudioGraph;
use crate::graph::{chain_to_string, secs, Filter, FilterGraph};
use crate::inputs::InputPlan;
use crate::video_graph::VideoGraph;

const FULL_AUDIO_BITRATE: &str = "192k";
const SIMPLIFIED_AUDIO_BITRATE: &str = "128k";
const SIMPLIFIED_CRF: u8 = 23;

/// Containers where `+faststart` applies.
const FASTSTART_CONTAINERS: &[&str] = &["mp4", "m4v", "mov"];

/// A ready-to-run transcoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPlan {
    pub tier: AttemptTier,
    pub args: Vec<String>,
    pub output: PathBuf,
    pub expected_duration_secs: f64,
}

/// Flags every invocation starts with: non-interactive, overwrite, quiet,
/// machine-readable progress on stdout.
pub fn base_args() -> Vec<String> {
    to_args(&[
        "-nostdin",
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
    ])
}

/// Attempt 1: requested reframing, overlays, audio graph, and encoder.
pub fn full_render_command(
    request: &RenderRequest,
    inputs: &InputPlan,
    video: &VideoGraph,
    audio: &AudioGraph,
    output: &Path,
) -> CommandPlan {
    let mut args = base_args();
    args.extend(inputs.to_args());
    args.extend(["-t".to_string(), secs(request.duration())]);

    let mut graph = video.graph.clone();
    if let AudioGraph::Mixed(audio_graph) = audio {
        graph.extend(audio_graph.clone());
    }
    args.extend(["-filter_complex".to_string(), graph.to_string()]);
    args.extend(["-map".to_string(), video.output.map_arg()]);

    match audio {
        AudioGraph::Mixed(_) => {
            args.extend(["-map".to_string(), AudioGraph::output_label().map_arg()]);
        }
        AudioGraph::Simple(filters) => {
            args.extend(to_args(&["-map", "0:a?"]));
            if !filters.is_empty() {
                args.extend(["-af".to_string(), chain_to_string(filters)]);
            }
        }
    }

    args.extend(video_encoder_args(&request.config.encoder));
    args.extend(to_args(&["-c:a", "aac", "-b:a", FULL_AUDIO_BITRATE]));
    args.extend(container_args(output));
    args.push(output.display().to_string());

    CommandPlan {
        tier: AttemptTier::Full,
        args,
        output: output.to_path_buf(),
        expected_duration_secs: request.duration(),
    }
}

/// Attempt 2: coarse seek `buffer` seconds early, accurate seek the rest of
/// the way, then a plain scale+crop software encode.
pub fn simplified_command(request: &RenderRequest, buffer_secs: f64, output: &Path) -> CommandPlan {
    let start = request.range.start_secs;
    let buffer = buffer_secs.max(0.0).min(start);
    let (w, h) = (request.config.width, request.config.height);

    let mut args = base_args();
    args.extend(["-ss".to_string(), secs(start - buffer)]);
    args.extend(["-i".to_string(), request.source.path.display().to_string()]);
    args.extend(["-ss".to_string(), secs(buffer)]);
    args.extend(["-t".to_string(), secs(request.duration())]);
    args.extend([
        "-vf".to_string(),
        chain_to_string(&[
            Filter::new("scale")
                .kv("w", w)
                .kv("h", h)
                .kv("force_original_aspect_ratio", "increase"),
            Filter::new("crop").arg(w).arg(h),
            Filter::new("setsar").arg(1),
        ]),
    ]);
    args.extend(to_args(&["-map", "0:v:0", "-map", "0:a?"]));
    args.extend(to_args(&["-c:v", VideoEncoder::Libx264.as_str(), "-preset", "veryfast"]));
    args.extend(["-crf".to_string(), SIMPLIFIED_CRF.to_string()]);
    args.extend(to_args(&["-pix_fmt", "yuv420p"]));
    args.extend(to_args(&["-c:a", "aac", "-b:a", SIMPLIFIED_AUDIO_BITRATE]));
    args.extend(container_args(output));
    args.push(output.display().to_string());

    CommandPlan {
        tier: AttemptTier::Simplified,
        args,
        output: output.to_path_buf(),
        expected_duration_secs: request.duration(),
    }
}

/// Attempt 3: trim with stream copy. Output stays in the source container.
pub fn stream_copy_command(request: &RenderRequest, output: &Path) -> CommandPlan {
    let mut args = base_args();
    args.extend(["-ss".to_string(), secs(request.range.start_secs)]);
    args.extend(["-i".to_string(), request.source.path.display().to_string()]);
    args.extend(["-t".to_string(), secs(request.duration())]);
    args.extend(to_args(&[
        "-map",
        "0:v:0",
        "-map",
        "0:a?",
        "-c",
        "copy",
        "-avoid_negative_ts",
        "make_zero",
    ]));
    args.extend(container_args(output));
    args.push(output.display().to_string());

    CommandPlan {
        tier: AttemptTier::StreamCopy,
        args,
        output: output.to_path_buf(),
        expected_duration_secs: request.duration(),
    }
}

/// Second pass of a two-pass render: burn text overlays onto the reframed
/// first-pass file, copying its audio.
pub fn overlay_pass_command(
    request: &RenderRequest,
    graph: &FilterGraph,
    input: &Path,
    output: &Path,
) -> CommandPlan {
    let mut args = base_args();
    args.extend(["-i".to_string(), input.display().to_string()]);
    args.extend(["-filter_complex".to_string(), graph.to_string()]);
    args.extend(to_args(&["-map", "[vout]", "-map", "0:a?"]));
    args.extend(video_encoder_args(&request.config.encoder));
    args.extend(to_args(&["-c:a", "copy"]));
    args.extend(container_args(output));
    args.push(output.display().to_string());

    CommandPlan {
        tier: AttemptTier::Full,
        args,
        output: output.to_path_buf(),
        expected_duration_secs: request.duration(),
    }
}

/// Codec, preset, and rate-control flags for the configured encoder.
pub fn video_encoder_args(settings: &EncoderSettings) -> Vec<String> {
    let encoder = settings.encoder;
    let mut args = to_args(&["-c:v", encoder.as_str()]);
    if let Some(preset) = settings.preset.preset_for(encoder) {
        args.extend(["-preset".to_string(), preset.to_string()]);
    }

    let quality = settings.crf.to_string();
    match encoder {
        VideoEncoder::Libx264 | VideoEncoder::Libx265 => {
            args.extend(["-crf".to_string(), quality]);
        }
        VideoEncoder::H264Nvenc | VideoEncoder::HevcNvenc => {
            args.extend(to_args(&["-rc", "vbr", "-cq"]));
            args.push(quality);
        }
        VideoEncoder::H264Qsv => {
            args.extend(["-global_quality".to_string(), quality]);
        }
        VideoEncoder::H264Videotoolbox => {
            args.extend(to_args(&["-b:v", "8M"]));
        }
    }
    if encoder.is_hevc() {
        args.extend(to_args(&["-tag:v", "hvc1"]));
    }
    args.extend(to_args(&["-pix_fmt", "yuv420p"]));
    args
}

fn container_args(output: &Path) -> Vec<String> {
    let is_faststart = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FASTSTART_CONTAINERS.contains(&ext.to_ascii_lowercase().as_str()));
    if is_faststart {
        to_args(&["-movflags", "+faststart"])
    } else {
        Vec::new()
    }
}

fn to_args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_graph::AudioGraphBuilder;
    use crate::test_support::request;
    use crate::video_graph::VideoGraphBuilder;
    use clipforge_clip_model::{QualityPreset, ReframeMode};

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_full_command_layout() {
        let req = request(ReframeMode::Center);
        let inputs = InputPlan::for_full_render(&req, false);
        let video = VideoGraphBuilder::new(&req, &inputs).build();
        let audio = AudioGraphBuilder::new(&req, &inputs).build();
        let out = req.output_path();
        let plan = full_render_command(&req, &inputs, &video, &audio, &out);
        let args = &plan.args;

        assert_eq!(&args[..8], &base_args()[..]);
        assert!(position(args, "-ss") < position(args, "-i"));
        assert_eq!(args[position(args, "-t") + 1], "30");
        assert_eq!(args[position(args, "-map") + 1], "[vout]");
        assert_eq!(args[position(args, "-af") + 1], "loudnorm=I=-14:TP=-1.5:LRA=11");
        assert_eq!(args[position(args, "-c:v") + 1], "libx264");
        assert_eq!(args[position(args, "-b:a") + 1], "192k");
        assert_eq!(args.last().unwrap(), &out.display().to_string());
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_simplified_uses_pre_seek_buffer() {
        let req = request(ReframeMode::FaceTracking);
        let plan = simplified_command(&req, 3.0, &req.output_path());
        let args = &plan.args;

        let seeks: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-ss")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(seeks, vec!["7", "3"]);
        assert!(position(args, "-i") < args.iter().rposition(|a| a == "-ss").unwrap());
        assert_eq!(
            args[position(args, "-vf") + 1],
            "scale=w=1080:h=1920:force_original_aspect_ratio=increase,crop=1080:1920,setsar=1"
        );
        assert_eq!(args[position(args, "-preset") + 1], "veryfast");
        assert_eq!(args[position(args, "-crf") + 1], "23");
        assert_eq!(args[position(args, "-b:a") + 1], "128k");
    }

    #[test]
    fn test_simplified_buffer_never_seeks_before_zero() {
        let mut req = request(ReframeMode::Center);
        req.range.start_secs = 1.5;
        let plan = simplified_command(&req, 3.0, &req.output_path());
        let first = position(&plan.args, "-ss");
        assert_eq!(plan.args[first + 1], "0");
        assert_eq!(plan.args[first + 4], "-ss");
        assert_eq!(plan.args[first + 5], "1.5");
    }

    #[test]
    fn test_stream_copy_keeps_container() {
        let mut req = request(ReframeMode::Center);
        req.source.path = "/videos/talk.mkv".into();
        let out = req.stream_copy_output_path();
        assert!(out.ends_with("c1.mkv"));

        let plan = stream_copy_command(&req, &out);
        assert!(plan.args.contains(&"copy".to_string()));
        assert!(plan.args.contains(&"make_zero".to_string()));
        assert!(!plan.args.contains(&"+faststart".to_string()));
        assert_eq!(plan.tier, AttemptTier::StreamCopy);
    }

    #[test]
    fn test_encoder_flags() {
        let nvenc = EncoderSettings {
            encoder: VideoEncoder::HevcNvenc,
            preset: QualityPreset::High,
            crf: 21,
            hw_accel: true,
        };
        let args = video_encoder_args(&nvenc);
        assert_eq!(
            args,
            vec![
                "-c:v", "hevc_nvenc", "-preset", "p6", "-rc", "vbr", "-cq", "21", "-tag:v",
                "hvc1", "-pix_fmt", "yuv420p"
            ]
        );

        let x264 = video_encoder_args(&EncoderSettings::default());
        assert_eq!(
            x264,
            vec!["-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
        );
    }
}
