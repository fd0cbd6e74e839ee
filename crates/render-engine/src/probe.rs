//! Source media probing via ffprobe.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use clipforge_common::error::{ClipError, ClipResult};

/// What the pipeline needs to know about a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub video_codec: Option<String>,
    pub format_name: String,
}

#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> ClipResult<MediaProbe>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: PathBuf,
}

impl FfprobeProber {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> ClipResult<MediaProbe> {
        if !path.exists() {
            return Err(ClipError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipError::TranscoderMissing {
                        binary: self.binary.display().to_string(),
                    }
                } else {
                    ClipError::transcode(format!("Failed to start ffprobe: {e}"))
                }
            })?;

        if !output.status.success() {
            return Err(ClipError::transcode(format!(
                "ffprobe failed for {} (status {})",
                path.display(),
                output.status
            )));
        }
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Probe `path` with the given ffprobe binary.
pub async fn probe_source(ffprobe: impl Into<PathBuf>, path: &Path) -> ClipResult<MediaProbe> {
    FfprobeProber::new(ffprobe).probe(path).await
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    format_name: Option<String>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &str) -> ClipResult<MediaProbe> {
    let parsed: ProbeOutput = serde_json::from_str(json)?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ClipError::invalid_input("Source has no video stream"))?;
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let parse_secs = |raw: Option<&String>| raw.and_then(|d| d.trim().parse::<f64>().ok());
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| parse_secs(f.duration.as_ref()))
        .or_else(|| parse_secs(video.duration.as_ref()))
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(MediaProbe {
        duration_secs,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio,
        video_codec: video.codec_name.clone(),
        format_name: parsed
            .format
            .and_then(|f| f.format_name)
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "612.480000"}
        }"#;
        let probe = parse_probe_output(json).unwrap();
        assert_eq!((probe.width, probe.height), (1920, 1080));
        assert!(probe.has_audio);
        assert!((probe.duration_secs - 612.48).abs() < 1e-6);
        assert_eq!(probe.video_codec.as_deref(), Some("h264"));
    }

    #[test]
    fn test_stream_duration_fallback_and_no_audio() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 1280, "height": 720, "duration": "10.0"}], "format": {"duration": "N/A"}}"#;
        let probe = parse_probe_output(json).unwrap();
        assert!((probe.duration_secs - 10.0).abs() < 1e-9);
        assert!(!probe.has_audio);
        assert_eq!(probe.format_name, "unknown");
    }

    #[test]
    fn test_audio_only_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(ClipError::InvalidInput { .. })
        ));
    }
}
