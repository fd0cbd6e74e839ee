//! Low-resolution frame sampling for subject tracking.
//!
//! ffmpeg decodes the clip range at a fixed cadence, scales to a small
//! analysis size, and writes packed RGB24 to stdout, which is split into
//! [`AnalysisFrame`]s.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use clipforge_clip_model::RenderRequest;
use clipforge_common::config::AppConfig;
use clipforge_common::error::{ClipError, ClipResult};
use clipforge_processing_core::{frames_from_rawvideo, AnalysisFrame};

use crate::graph::secs;
use crate::runner::diagnostic_tail;

#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Frames covering the request's clip range, clip-relative timestamps.
    async fn sample(&self, request: &RenderRequest) -> ClipResult<Vec<AnalysisFrame>>;
}

#[derive(Debug, Clone)]
pub struct FfmpegFrameSampler {
    binary: PathBuf,
    interval_secs: f64,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl FfmpegFrameSampler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::from_config(&AppConfig::default()).with_binary(binary)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            binary: config.transcoder.ffmpeg_path.clone(),
            interval_secs: config.render.sample_interval_secs.max(0.1),
            width: config.render.analysis_width.max(2),
            height: config.render.analysis_height.max(2),
            timeout: Duration::from_secs(config.transcoder.timeout_secs.max(1)),
        }
    }

    fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn args(&self, request: &RenderRequest) -> Vec<String> {
        vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            secs(request.range.start_secs),
            "-i".into(),
            request.source.path.display().to_string(),
            "-t".into(),
            secs(request.duration()),
            "-an".into(),
            "-vf".into(),
            format!(
                "fps=1/{},scale={}:{}",
                secs(self.interval_secs),
                self.width,
                self.height
            ),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "pipe:1".into(),
        ]
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample(&self, request: &RenderRequest) -> ClipResult<Vec<AnalysisFrame>> {
        let output = Command::new(&self.binary)
            .args(self.args(request))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ClipError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipError::TranscoderMissing {
                        binary: self.binary.display().to_string(),
                    }
                } else {
                    ClipError::transcode(format!("Failed to start frame sampler: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            return Err(ClipError::transcode(format!(
                "Frame sampling failed: {}",
                diagnostic_tail(&lines)
            )));
        }

        let frames =
            frames_from_rawvideo(&output.stdout, self.width, self.height, self.interval_secs)
                .map_err(|e| ClipError::transcode(e.to_string()))?;
        tracing::debug!(
            clip_id = %request.clip_id,
            frames = frames.len(),
            bytes = output.stdout.len(),
            "Sampled analysis frames"
        );
        Ok(frames)
    }
}
