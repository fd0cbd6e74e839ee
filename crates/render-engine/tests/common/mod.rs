#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use clipforge_clip_model::{
    AspectRatio, AudioEnhancement, CaptionConfig, EncoderSettings, ProgressBarConfig,
    ReframeMode, RenderConfig, RenderLimits, RenderRequest, ResolvedTrack, SourceMedia,
    TimeRange, WatermarkConfig,
};
use clipforge_common::error::{ClipError, ClipResult};
use clipforge_render_engine::{
    OrchestratorSettings, ProgressEvent, ProgressSink, RenderOrchestrator, SinkMessage,
    TranscodeJob, Transcoder,
};

/// What the scripted transcoder does for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Exit 0 with a plausible output file.
    Succeed,
    /// Exit non-zero after writing a partial file.
    Fail,
    /// Exit 0 but leave a zero-byte file.
    Empty,
    /// The binary is not installed.
    Missing,
    /// Killed at the wall-clock limit after writing a partial file.
    Timeout,
}

/// Transcoder stub that follows a script and records every job.
#[derive(Default)]
pub struct ScriptedTranscoder {
    steps: Mutex<VecDeque<Step>>,
    jobs: Mutex<Vec<TranscodeJob>>,
}

impl ScriptedTranscoder {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            jobs: Mutex::new(Vec::new()),
        })
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> ClipResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Succeed);
        match step {
            Step::Succeed => {
                sink.log(&job.clip_id, "scripted: encoding");
                report(job, sink, 10);
                std::fs::write(&job.output, vec![0u8; 4096])?;
                report(job, sink, 95);
                Ok(())
            }
            Step::Fail => {
                report(job, sink, 95);
                std::fs::write(&job.output, b"partial")?;
                sink.log(&job.clip_id, "Error: scripted failure");
                Err(ClipError::transcode("scripted failure: Invalid argument"))
            }
            Step::Empty => {
                std::fs::write(&job.output, b"")?;
                Ok(())
            }
            Step::Missing => Err(ClipError::TranscoderMissing {
                binary: "ffmpeg".to_string(),
            }),
            Step::Timeout => {
                report(job, sink, 40);
                std::fs::write(&job.output, b"partial")?;
                Err(ClipError::Timeout { secs: 1200 })
            }
        }
    }
}

fn report(job: &TranscodeJob, sink: &dyn ProgressSink, percent: u8) {
    sink.progress(ProgressEvent {
        clip_id: job.clip_id.clone(),
        project_id: job.project_id.clone(),
        percent,
        message: job.label.clone(),
    });
}

pub struct Fixture {
    pub dir: TempDir,
    pub source: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        std::fs::write(&source, vec![1u8; 2048]).unwrap();
        Self { dir, source }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn asset(&self, name: &str) -> ResolvedTrack {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"audio").unwrap();
        ResolvedTrack {
            path,
            duration_secs: 60.0,
        }
    }

    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            temp_dir: self.dir.path().join("tmp"),
            min_output_bytes: 1024,
            pre_seek_buffer_secs: 3.0,
            loudness_target_lufs: -14.0,
        }
    }

    pub fn orchestrator(&self, transcoder: Arc<ScriptedTranscoder>) -> RenderOrchestrator {
        RenderOrchestrator::new(transcoder, self.settings())
    }

    /// 30 second clip at 10s of a 1920x1080, 600s source, rendered 1080x1920.
    pub fn request(&self, reframe: ReframeMode) -> RenderRequest {
        RenderRequest {
            clip_id: "clip-1".to_string(),
            project_id: "proj-1".to_string(),
            source: SourceMedia {
                path: self.source.clone(),
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
            output_dir: self.output_dir(),
            limits: RenderLimits::unrestricted(),
        }
    }
}

pub fn progress_events(rx: &mut UnboundedReceiver<SinkMessage>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let SinkMessage::Progress(event) = message {
            events.push(event);
        }
    }
    events
}

/// Value following `flag` in an argv.
pub fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
