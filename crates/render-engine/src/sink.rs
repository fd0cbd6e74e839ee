//! Progress and log delivery to whoever is watching a render.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Progress report for one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub clip_id: String,
    pub project_id: String,
    /// Percent complete in `0..=100`.
    pub percent: u8,
    pub message: String,
}

/// Receives progress events and raw transcoder log lines.
///
/// Implementations must not block; they are called from the runner's
/// output readers.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, event: ProgressEvent);

    fn log(&self, clip_id: &str, line: &str);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn progress(&self, event: ProgressEvent) {
        tracing::info!(
            clip_id = %event.clip_id,
            project_id = %event.project_id,
            percent = event.percent,
            "{}",
            event.message
        );
    }

    fn log(&self, clip_id: &str, line: &str) {
        tracing::trace!(clip_id, "{line}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    Progress(ProgressEvent),
    Log { clip_id: String, line: String },
}

/// Sink backed by an unbounded channel, for UIs and tests.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn progress(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(SinkMessage::Progress(event));
    }

    fn log(&self, clip_id: &str, line: &str) {
        let _ = self.tx.send(SinkMessage::Log {
            clip_id: clip_id.to_string(),
            line: line.to_string(),
        });
    }
}

/// Overall progress of one render across several transcoder jobs.
///
/// A job reports its own `0..=100`; [`RenderProgress::band`] maps that onto
/// the slice of the render the job covers. The forwarded percent never goes
/// down, so escalating to a cheaper attempt does not rewind a progress bar.
pub struct RenderProgress<'a> {
    inner: &'a dyn ProgressSink,
    clip_id: String,
    project_id: String,
    high_water: AtomicU8,
}

impl<'a> RenderProgress<'a> {
    pub fn new(
        inner: &'a dyn ProgressSink,
        clip_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            clip_id: clip_id.into(),
            project_id: project_id.into(),
            high_water: AtomicU8::new(0),
        }
    }

    /// Report an overall percent with `message`.
    pub fn emit(&self, percent: u8, message: &str) {
        self.forward(percent, message.to_string());
    }

    /// Sink for one job covering `start..=end` of the render.
    pub fn band(&self, start: u8, end: u8) -> BandSink<'_> {
        let start = start.min(100);
        BandSink {
            progress: self,
            start,
            end: end.clamp(start, 100),
        }
    }

    /// Highest percent forwarded so far.
    pub fn percent(&self) -> u8 {
        self.high_water.load(Ordering::SeqCst)
    }

    fn forward(&self, percent: u8, message: String) {
        let percent = percent.min(100);
        let percent = self.high_water.fetch_max(percent, Ordering::SeqCst).max(percent);
        self.inner.progress(ProgressEvent {
            clip_id: self.clip_id.clone(),
            project_id: self.project_id.clone(),
            percent,
            message,
        });
    }
}

/// [`ProgressSink`] handed to one job; see [`RenderProgress::band`].
pub struct BandSink<'a> {
    progress: &'a RenderProgress<'a>,
    start: u8,
    end: u8,
}

impl BandSink<'_> {
    fn scale(&self, percent: u8) -> u8 {
        let span = (self.end - self.start) as u32;
        self.start + (percent.min(100) as u32 * span / 100) as u8
    }
}

impl ProgressSink for BandSink<'_> {
    fn progress(&self, event: ProgressEvent) {
        self.progress.forward(self.scale(event.percent), event.message);
    }

    fn log(&self, clip_id: &str, line: &str) {
        self.progress.inner.log(clip_id, line);
    }
}
