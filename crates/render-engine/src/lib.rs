//! ClipForge Render Engine
//!
//! Turns a [`RenderRequest`](clipforge_clip_model::RenderRequest) into a
//! finished clip by driving ffmpeg through up to three attempts.
//!
//! # Pipeline Architecture
//!
//! ```text
//! RenderRequest ──┐
//!                 ├── Capability gate (license limits)
//! frames ─────────┘         │
//!                           ├── Crop path (tracking modes)
//!                           │
//!                           ├── Video graph ──┐
//!                           ├── Audio graph ──┤
//!                           │                 ▼
//!                           │          Attempt 1: full fidelity (+ overlay pass)
//!                           │          Attempt 2: scale+crop re-encode
//!                           │          Attempt 3: stream copy
//!                           ▼
//!                      <clip>.mp4 + <clip>.render.json
//! ```

pub mod attempt;
pub mod audio_graph;
pub mod capability;
pub mod captions;
pub mod command;
pub mod frames;
pub mod graph;
pub mod inputs;
pub mod orchestrator;
pub mod probe;
pub mod runner;
pub mod service;
pub mod sink;
pub mod video_graph;

#[cfg(test)]
mod test_support;

pub use attempt::{next_state, AttemptOutcome, AttemptState, AttemptTier};
pub use audio_graph::{AudioGraph, AudioGraphBuilder};
pub use capability::gate;
pub use command::CommandPlan;
pub use frames::{FfmpegFrameSampler, FrameSampler};
pub use graph::{Filter, FilterChain, FilterGraph, StreamLabel};
pub use inputs::InputPlan;
pub use orchestrator::{
    OrchestratorSettings, RenderOrchestrator, RenderOutput, RenderPlan, RenderReport,
};
pub use probe::{probe_source, FfprobeProber, MediaProbe, MediaProber};
pub use runner::{FfmpegRunner, TranscodeJob, Transcoder};
pub use service::{build_request, ClipRenderService, Collaborators, RenderedClip, ResolvedAudio};
pub use sink::{
    BandSink, ChannelSink, ProgressEvent, ProgressSink, RenderProgress, SinkMessage, TracingSink,
};
pub use video_graph::{VideoGraph, VideoGraphBuilder};
