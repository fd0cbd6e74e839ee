//! Transcoder process execution.
//!
//! [`FfmpegRunner`] spawns ffmpeg with `-progress pipe:1`, turns the
//! key=value progress stream into throttled [`ProgressEvent`]s, forwards
//! stderr lines to the sink, and enforces a wall-clock timeout. On failure
//! the error carries a short tail of the most relevant stderr lines.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use clipforge_common::clock::ProgressThrottle;
use clipforge_common::config::TranscoderConfig;
use clipforge_common::error::{ClipError, ClipResult};

use crate::command::CommandPlan;
use crate::sink::{ProgressEvent, ProgressSink};

/// Percent reported when the transcoder starts.
pub const PROGRESS_FLOOR: u8 = 10;
/// Highest percent the runner reports; completion is reported by the caller.
pub const PROGRESS_CEILING: u8 = 95;

const TAIL_CAPACITY: usize = 40;
const TAIL_REPORTED: usize = 5;
const DIAGNOSTIC_KEYWORDS: &[&str] = &[
    "error",
    "invalid",
    "failed",
    "no such",
    "unable",
    "not found",
    "cannot",
    "could not",
    "unknown",
    "mismatch",
    "denied",
];

/// One transcoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    /// Progress message shown while this job runs.
    pub label: String,
    pub clip_id: String,
    pub project_id: String,
    pub args: Vec<String>,
    pub output: PathBuf,
    pub expected_duration_secs: f64,
}

impl TranscodeJob {
    pub fn from_plan(
        plan: CommandPlan,
        clip_id: impl Into<String>,
        project_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            clip_id: clip_id.into(),
            project_id: project_id.into(),
            args: plan.args,
            output: plan.output,
            expected_duration_secs: plan.expected_duration_secs,
        }
    }
}

/// Runs transcoder jobs. Implemented by [`FfmpegRunner`]; tests substitute
/// scripted fakes.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> ClipResult<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
    timeout: Duration,
    progress_interval: Duration,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let defaults = TranscoderConfig::default();
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(defaults.timeout_secs),
            progress_interval: Duration::from_millis(defaults.progress_interval_ms),
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self {
            binary: config.ffmpeg_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            progress_interval: Duration::from_millis(config.progress_interval_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the binary can be executed at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Transcoder for FfmpegRunner {
    async fn run(&self, job: &TranscodeJob, sink: &dyn ProgressSink) -> ClipResult<()> {
        tracing::debug!(clip_id = %job.clip_id, args = ?job.args, "Running ffmpeg");
        let started = Instant::now();

        let mut child = Command::new(&self.binary)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        tracing::info!(
            pid = child.id(),
            clip_id = %job.clip_id,
            label = %job.label,
            expected_secs = job.expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipError::transcode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipError::transcode("Failed to capture ffmpeg stderr"))?;

        let mut tail = DiagnosticTail::new(TAIL_CAPACITY);
        let mut reporter = ProgressReporter::new(job, self.progress_interval);
        let mut log_lines = LogForwarder::new(self.progress_interval);

        let outcome = tokio::time::timeout(self.timeout, async {
            let read_progress = async {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    reporter.line(&line, sink);
                }
                Ok::<_, std::io::Error>(())
            };
            let read_stderr = async {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    tracing::debug!(clip_id = %job.clip_id, "ffmpeg: {line}");
                    log_lines.forward(&job.clip_id, &line, Instant::now(), sink);
                    tail.push(line);
                }
                Ok::<_, std::io::Error>(())
            };
            let (progress_res, stderr_res) = tokio::join!(read_progress, read_stderr);
            progress_res?;
            stderr_res?;
            child.wait().await
        })
        .await;

        let status = match outcome {
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(clip_id = %job.clip_id, "Failed to kill timed out ffmpeg: {e}");
                }
                tracing::warn!(
                    clip_id = %job.clip_id,
                    timeout_secs = self.timeout.as_secs(),
                    "ffmpeg timed out"
                );
                return Err(ClipError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                return Err(ClipError::transcode(format!("ffmpeg I/O failed: {e}")));
            }
            Ok(Ok(status)) => status,
        };

        tracing::info!(
            clip_id = %job.clip_id,
            success = status.success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg process finished"
        );

        if !status.success() {
            return Err(ClipError::transcode(format!(
                "{} (status {status}): {}",
                job.label,
                tail.summary()
            )));
        }
        Ok(())
    }
}

fn spawn_error(binary: &Path, err: std::io::Error) -> ClipError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ClipError::TranscoderMissing {
            binary: binary.display().to_string(),
        }
    } else {
        ClipError::transcode(format!("Failed to start ffmpeg: {err}"))
    }
}

/// Latest position parsed from `-progress` output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    if us >= 0.0 {
                        self.out_time_secs = us / 1_000_000.0;
                    }
                }
            }
            "out_time" => {
                if let Some(secs) = parse_clock(value) {
                    self.out_time_secs = secs;
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }

    /// Map the position onto `PROGRESS_FLOOR..=PROGRESS_CEILING`.
    pub fn percent(&self, expected_duration_secs: f64) -> u8 {
        let fraction = if self.complete {
            1.0
        } else if expected_duration_secs > 0.0 {
            (self.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let span = (PROGRESS_CEILING - PROGRESS_FLOOR) as f64;
        let percent = PROGRESS_FLOOR as f64 + (fraction * span).round();
        (percent as u8).min(PROGRESS_CEILING)
    }
}

/// `HH:MM:SS.micro` to seconds.
fn parse_clock(raw: &str) -> Option<f64> {
    let mut parts = raw.trim().split(':');
    let h = parts.next()?.parse::<f64>().ok()?;
    let m = parts.next()?.parse::<f64>().ok()?;
    let s = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || h < 0.0 {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + s)
}

struct ProgressReporter<'a> {
    job: &'a TranscodeJob,
    state: ProgressState,
    throttle: ProgressThrottle,
    last_percent: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    fn new(job: &'a TranscodeJob, interval: Duration) -> Self {
        Self {
            job,
            state: ProgressState::default(),
            throttle: ProgressThrottle::new(interval),
            last_percent: None,
        }
    }

    fn line(&mut self, line: &str, sink: &dyn ProgressSink) {
        let Some((key, value)) = line.trim().split_once('=') else {
            return;
        };
        self.state.update(key, value);
        if key != "progress" {
            return;
        }

        let percent = self.state.percent(self.job.expected_duration_secs);
        let advanced = self.last_percent.map_or(true, |last| percent > last);
        if advanced && self.throttle.should_emit(Instant::now()) {
            self.last_percent = Some(percent);
            sink.progress(ProgressEvent {
                clip_id: self.job.clip_id.clone(),
                project_id: self.job.project_id.clone(),
                percent,
                message: self.job.label.clone(),
            });
        }
    }
}

/// Throttles stderr lines on their way to the sink. Lines that look like
/// errors always pass.
struct LogForwarder {
    throttle: ProgressThrottle,
}

impl LogForwarder {
    fn new(interval: Duration) -> Self {
        Self {
            throttle: ProgressThrottle::new(interval),
        }
    }

    fn forward(&mut self, clip_id: &str, line: &str, now: Instant, sink: &dyn ProgressSink) {
        if line.trim().is_empty() {
            return;
        }
        if is_diagnostic(line) || self.throttle.should_emit(now) {
            sink.log(clip_id, line);
        }
    }
}

fn is_diagnostic(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    DIAGNOSTIC_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Ring buffer of the last stderr lines.
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: String) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    pub fn summary(&self) -> String {
        let lines: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        diagnostic_tail(&lines)
    }
}

/// Pick the lines worth showing: the last few that look like errors, or
/// just the last few when none do.
pub fn diagnostic_tail(lines: &[&str]) -> String {
    let relevant: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| is_diagnostic(line))
        .collect();
    let picked = if relevant.is_empty() {
        lines
    } else {
        &relevant[..]
    };
    let start = picked.len().saturating_sub(TAIL_REPORTED);
    if picked.is_empty() {
        return "no diagnostic output".to_string();
    }
    picked[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, SinkMessage};

    fn job(expected: f64) -> TranscodeJob {
        TranscodeJob {
            label: "Rendering clip".into(),
            clip_id: "c1".into(),
            project_id: "p1".into(),
            args: Vec::new(),
            output: PathBuf::from("/tmp/c1.mp4"),
            expected_duration_secs: expected,
        }
    }

    #[test]
    fn test_progress_state_parsing() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "15000000");
        assert!((state.out_time_secs - 15.0).abs() < 1e-9);
        state.update("out_time", "00:00:20.500000");
        assert!((state.out_time_secs - 20.5).abs() < 1e-9);
        state.update("out_time_ms", "N/A");
        assert!((state.out_time_secs - 20.5).abs() < 1e-9);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_percent_mapping() {
        let mut state = ProgressState::default();
        assert_eq!(state.percent(30.0), 10);
        state.out_time_secs = 15.0;
        assert_eq!(state.percent(30.0), 53);
        state.out_time_secs = 90.0;
        assert_eq!(state.percent(30.0), 95);
        assert_eq!(state.percent(0.0), 10);
    }

    #[test]
    fn test_reporter_emits_monotonic_events() {
        let job = job(30.0);
        let (sink, mut rx) = ChannelSink::new();
        let mut reporter = ProgressReporter::new(&job, Duration::ZERO);
        for line in [
            "out_time_us=3000000",
            "progress=continue",
            "out_time_us=3000000",
            "progress=continue",
            "out_time_us=30000000",
            "progress=end",
        ] {
            reporter.line(line, &sink);
        }

        let mut percents = Vec::new();
        while let Ok(SinkMessage::Progress(event)) = rx.try_recv() {
            percents.push(event.percent);
        }
        assert_eq!(percents, vec![19, 95]);
    }

    #[test]
    fn test_diagnostic_tail_prefers_error_lines() {
        let lines = [
            "Input #0, mov,mp4",
            "Stream #0:0: Video: h264",
            "[Parsed_crop_0] Invalid too big or non positive size",
            "Error reinitializing filters!",
            "Last message repeated 1 times",
        ];
        assert_eq!(
            diagnostic_tail(&lines),
            "[Parsed_crop_0] Invalid too big or non positive size | Error reinitializing filters!"
        );
    }

    #[test]
    fn test_diagnostic_tail_falls_back_to_last_lines() {
        let lines: Vec<String> = (0..8).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        assert_eq!(
            diagnostic_tail(&refs),
            "line 3 | line 4 | line 5 | line 6 | line 7"
        );
        assert_eq!(diagnostic_tail(&[]), "no diagnostic output");
    }

    #[test]
    fn test_tail_ring_buffer_caps_lines() {
        let mut tail = DiagnosticTail::new(3);
        for i in 0..10 {
            tail.push(format!("line {i}"));
        }
        tail.push("   ".into());
        assert_eq!(tail.summary(), "line 7 | line 8 | line 9");
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runner = FfmpegRunner::new("/nonexistent/clipforge-ffmpeg");
        let err = runner.run(&job(1.0), &crate::sink::TracingSink).await.unwrap_err();
        assert!(matches!(err, ClipError::TranscoderMissing { .. }));
        assert!(!runner.is_available().await);
    }

    #[test]
    fn test_log_lines_are_throttled_but_errors_pass() {
        let (sink, mut rx) = ChannelSink::new();
        let mut forwarder = LogForwarder::new(Duration::from_millis(500));
        let t0 = Instant::now();
        forwarder.forward("c1", "frame=  10 fps=30", t0, &sink);
        forwarder.forward("c1", "frame=  20 fps=30", t0 + Duration::from_millis(100), &sink);
        forwarder.forward("c1", "Error while filtering", t0 + Duration::from_millis(200), &sink);
        forwarder.forward("c1", "frame=  30 fps=30", t0 + Duration::from_millis(600), &sink);

        let mut lines = Vec::new();
        while let Ok(SinkMessage::Log { line, .. }) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec!["frame=  10 fps=30", "Error while filtering", "frame=  30 fps=30"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_is_killed_at_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("hung-ffmpeg");
        std::fs::write(&binary, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = FfmpegRunner::new(&binary).with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = runner.run(&job(30.0), &crate::sink::TracingSink).await.unwrap_err();

        assert!(matches!(err, ClipError::Timeout { secs: 0 }), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
