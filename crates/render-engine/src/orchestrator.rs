//! Render orchestration: attempts, escalation, validation, cleanup.
//!
//! One [`RenderOrchestrator::render`] call walks the attempt state machine
//! until an attempt produces a valid file or all tiers are exhausted. An
//! attempt only counts as successful when the transcoder exits cleanly and
//! the output is at least `min_output_bytes` long.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use clipforge_clip_model::{CropSpec, RenderRequest};
use clipforge_common::clock::RenderClock;
use clipforge_common::config::AppConfig;
use clipforge_common::error::{ClipError, ClipResult};
use clipforge_processing_core::{CropGeometry, CropPathEngine};

use crate::attempt::{next_state, AttemptOutcome, AttemptState, AttemptTier};
use crate::audio_graph::AudioGraphBuilder;
use crate::captions::write_caption_file;
use crate::command::{
    full_render_command, overlay_pass_command, simplified_command, stream_copy_command,
    CommandPlan,
};
use crate::frames::FrameSampler;
use crate::inputs::InputPlan;
use crate::runner::{TranscodeJob, Transcoder};
use crate::sink::{ProgressSink, RenderProgress};
use crate::video_graph::{build_overlay_pass, VideoGraphBuilder};

/// Share of overall progress each attempt covers. The full attempt's band is
/// split between the two passes when overlays are burned in separately.
fn tier_band(tier: AttemptTier) -> (u8, u8) {
    match tier {
        AttemptTier::Full => (5, 70),
        AttemptTier::Simplified => (70, 85),
        AttemptTier::StreamCopy => (85, 95),
    }
}

const FIRST_PASS_END: u8 = 50;

/// Tunables for one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Scratch directory for caption files.
    pub temp_dir: PathBuf,
    pub min_output_bytes: u64,
    pub pre_seek_buffer_secs: f64,
    pub loudness_target_lufs: f64,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            min_output_bytes: config.render.min_output_bytes,
            pre_seek_buffer_secs: config.render.pre_seek_buffer_secs,
            loudness_target_lufs: config.render.loudness_target_lufs,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Every command a render could run, without running anything.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub full: CommandPlan,
    /// Second pass over `full`'s output, when overlays were held back.
    pub overlay_pass: Option<CommandPlan>,
    pub simplified: CommandPlan,
    pub stream_copy: CommandPlan,
}

impl RenderPlan {
    pub fn commands(&self) -> Vec<&CommandPlan> {
        let mut commands = vec![&self.full];
        commands.extend(self.overlay_pass.as_ref());
        commands.push(&self.simplified);
        commands.push(&self.stream_copy);
        commands
    }
}

/// Outcome of one attempt, as recorded in the render report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub tier: AttemptTier,
    pub succeeded: bool,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Written next to the output as `<clip>.render.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub clip_id: String,
    pub project_id: String,
    pub started_at: String,
    pub elapsed_ms: u64,
    pub tier: AttemptTier,
    pub attempts: Vec<AttemptRecord>,
    pub overlays_dropped: bool,
    pub crop_path_used: bool,
    pub output_path: PathBuf,
    pub size_bytes: u64,
}

impl RenderReport {
    pub fn path_for(output: &Path) -> PathBuf {
        output.with_extension("render.json")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub report: RenderReport,
}

/// What a successful tier produced.
struct TierOutput {
    path: PathBuf,
    size_bytes: u64,
    overlays_dropped: bool,
}

pub struct RenderOrchestrator {
    transcoder: Arc<dyn Transcoder>,
    sampler: Option<Arc<dyn FrameSampler>>,
    engine: CropPathEngine,
    settings: OrchestratorSettings,
}

impl RenderOrchestrator {
    pub fn new(transcoder: Arc<dyn Transcoder>, settings: OrchestratorSettings) -> Self {
        Self {
            transcoder,
            sampler: None,
            engine: CropPathEngine::with_defaults(),
            settings,
        }
    }

    /// Frame source for tracking modes. Without one, tracking renders use a
    /// static centered crop.
    pub fn with_sampler(mut self, sampler: Arc<dyn FrameSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Render one clip, escalating through the attempt tiers.
    pub async fn render(
        &self,
        request: &RenderRequest,
        sink: &dyn ProgressSink,
    ) -> ClipResult<RenderOutput> {
        request.validate()?;
        let clock = RenderClock::start();
        tokio::fs::create_dir_all(&request.output_dir).await?;

        tracing::info!(
            clip_id = %request.clip_id,
            source = %request.source.path.display(),
            start = request.range.start_secs,
            end = request.range.end_secs,
            reframe = %request.config.reframe,
            width = request.config.width,
            height = request.config.height,
            "Starting clip render"
        );
        let progress = RenderProgress::new(sink, &request.clip_id, &request.project_id);
        progress.emit(0, "Preparing clip");

        let crop = if request.config.reframe.is_tracking() {
            self.plan_crop(request).await
        } else {
            None
        };
        let caption_file = match write_caption_file(request, &self.settings.temp_dir) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(clip_id = %request.clip_id, "Skipping captions: {e}");
                None
            }
        };

        let mut state = AttemptState::initial();
        let mut attempts = Vec::new();
        let mut produced = None;
        let mut last_error = None;

        while let AttemptState::Attempt(tier) = state {
            progress.emit(tier_band(tier).0, tier.start_message());
            let started = Instant::now();
            let result = self
                .run_tier(tier, request, crop.as_ref(), caption_file.as_deref(), &progress)
                .await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(output) => {
                    attempts.push(AttemptRecord {
                        tier,
                        succeeded: true,
                        elapsed_ms,
                        diagnostic: None,
                    });
                    produced = Some(output);
                    AttemptOutcome::Succeeded
                }
                Err(e @ ClipError::TranscoderMissing { .. }) => {
                    cleanup_partials(request).await;
                    remove_quietly(caption_file.as_deref()).await;
                    tracing::error!(clip_id = %request.clip_id, "{e}");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        clip_id = %request.clip_id,
                        tier = %tier,
                        attempt = tier.number(),
                        elapsed_ms,
                        "Render attempt failed: {e}"
                    );
                    attempts.push(AttemptRecord {
                        tier,
                        succeeded: false,
                        elapsed_ms,
                        diagnostic: Some(e.to_string()),
                    });
                    cleanup_partials(request).await;
                    last_error = Some(e);
                    AttemptOutcome::Failed
                }
            };
            state = next_state(state, outcome);
        }

        remove_quietly(caption_file.as_deref()).await;

        let (tier, output) = match (state, produced) {
            (AttemptState::Done(tier), Some(output)) => (tier, output),
            _ => {
                cleanup_partials(request).await;
                let diagnostic = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no attempt produced output".to_string());
                tracing::error!(
                    clip_id = %request.clip_id,
                    %diagnostic,
                    "All render attempts failed"
                );
                return Err(ClipError::RenderFailed {
                    clip_id: request.clip_id.clone(),
                    diagnostic,
                });
            }
        };

        let report = RenderReport {
            clip_id: request.clip_id.clone(),
            project_id: request.project_id.clone(),
            started_at: clock.started_at().to_string(),
            elapsed_ms: clock.elapsed_ms() as u64,
            tier,
            attempts,
            overlays_dropped: output.overlays_dropped,
            crop_path_used: crop.is_some(),
            output_path: output.path.clone(),
            size_bytes: output.size_bytes,
        };
        if let Err(e) = write_report(&report).await {
            tracing::warn!(clip_id = %request.clip_id, "Failed to write render report: {e}");
        }

        tracing::info!(
            clip_id = %request.clip_id,
            tier = %tier,
            size_bytes = output.size_bytes,
            elapsed_ms = report.elapsed_ms,
            output = %output.path.display(),
            "Clip rendered"
        );
        let message = if output.overlays_dropped {
            "Clip rendered without captions"
        } else {
            "Clip rendered"
        };
        progress.emit(100, message);

        Ok(RenderOutput {
            output_path: output.path,
            size_bytes: output.size_bytes,
            report,
        })
    }

    /// Build every attempt's command for `request` without running them.
    pub fn plan(
        &self,
        request: &RenderRequest,
        crop: Option<&CropSpec>,
        caption_file: Option<&Path>,
    ) -> RenderPlan {
        let inputs = InputPlan::for_full_render(request, request.config.encoder.hw_accel);
        let video = VideoGraphBuilder::new(request, &inputs)
            .crop_path(crop)
            .caption_file(caption_file)
            .build();
        let audio = AudioGraphBuilder::new(request, &inputs)
            .loudness_target(self.settings.loudness_target_lufs)
            .build();

        let final_path = request.output_path();
        let (full, overlay_pass) = if video.needs_second_pass {
            let first_pass = request.first_pass_path();
            let full = full_render_command(request, &inputs, &video, &audio, &first_pass);
            let graph = build_overlay_pass(request, caption_file);
            let pass2 = overlay_pass_command(request, &graph, &first_pass, &final_path);
            (full, Some(pass2))
        } else {
            (
                full_render_command(request, &inputs, &video, &audio, &final_path),
                None,
            )
        };

        RenderPlan {
            full,
            overlay_pass,
            simplified: simplified_command(
                request,
                self.settings.pre_seek_buffer_secs,
                &final_path,
            ),
            stream_copy: stream_copy_command(request, &request.stream_copy_output_path()),
        }
    }

    async fn plan_crop(&self, request: &RenderRequest) -> Option<CropSpec> {
        let Some(sampler) = &self.sampler else {
            tracing::debug!(clip_id = %request.clip_id, "No frame sampler; using center crop");
            return None;
        };
        let (target_width, target_height) = VideoGraphBuilder::tracking_target(request);
        let geometry = CropGeometry {
            source_width: request.source.width,
            source_height: request.source.height,
            target_width,
            target_height,
            clip_duration_secs: request.duration(),
        };
        match sampler.sample(request).await {
            Ok(frames) => {
                let crop = self.engine.plan(&frames, &geometry);
                if crop.is_none() {
                    tracing::info!(clip_id = %request.clip_id, "No crop path; using center crop");
                }
                crop
            }
            Err(e) => {
                tracing::warn!(
                    clip_id = %request.clip_id,
                    "Frame sampling failed, using center crop: {e}"
                );
                None
            }
        }
    }

    async fn run_tier(
        &self,
        tier: AttemptTier,
        request: &RenderRequest,
        crop: Option<&CropSpec>,
        caption_file: Option<&Path>,
        progress: &RenderProgress<'_>,
    ) -> ClipResult<TierOutput> {
        let plan = self.plan(request, crop, caption_file);
        let (start, end) = tier_band(tier);
        let (command, overlay_pass) = match tier {
            AttemptTier::Full => (plan.full, plan.overlay_pass),
            AttemptTier::Simplified => (plan.simplified, None),
            AttemptTier::StreamCopy => (plan.stream_copy, None),
        };
        let path = command.output.clone();

        let Some(pass2) = overlay_pass else {
            let band = progress.band(start, end);
            let size = self.run_command(command, request, tier.start_message(), &band).await?;
            return Ok(TierOutput {
                path,
                size_bytes: size,
                overlays_dropped: false,
            });
        };

        let first_band = progress.band(start, FIRST_PASS_END);
        self.run_command(command, request, tier.start_message(), &first_band)
            .await?;
        let second_band = progress.band(FIRST_PASS_END, end);
        self.finish_two_pass(request, &path, pass2, &second_band).await
    }

    /// Run pass 2. On failure keep the pass-1 file as the final output.
    async fn finish_two_pass(
        &self,
        request: &RenderRequest,
        first_pass: &Path,
        pass2: CommandPlan,
        sink: &dyn ProgressSink,
    ) -> ClipResult<TierOutput> {
        let final_path = pass2.output.clone();
        let pass2_result = self
            .run_command(pass2, request, "Adding captions", sink)
            .await
            .map_err(|e| ClipError::overlay(e.to_string()));

        match pass2_result {
            Ok(size) => {
                remove_quietly(Some(first_pass)).await;
                Ok(TierOutput {
                    path: final_path,
                    size_bytes: size,
                    overlays_dropped: false,
                })
            }
            Err(e) => {
                tracing::warn!(
                    clip_id = %request.clip_id,
                    "Keeping render without captions: {e}"
                );
                remove_quietly(Some(&final_path)).await;
                tokio::fs::rename(first_pass, &final_path).await?;
                let size = self.check_output(&final_path).await?;
                Ok(TierOutput {
                    path: final_path,
                    size_bytes: size,
                    overlays_dropped: true,
                })
            }
        }
    }

    async fn run_command(
        &self,
        command: CommandPlan,
        request: &RenderRequest,
        label: &str,
        sink: &dyn ProgressSink,
    ) -> ClipResult<u64> {
        let job = TranscodeJob::from_plan(
            command,
            request.clip_id.clone(),
            request.project_id.clone(),
            label,
        );
        self.transcoder.run(&job, sink).await?;
        self.check_output(&job.output).await
    }

    /// Exit code 0 is not enough: the file must exist and clear the floor.
    async fn check_output(&self, path: &Path) -> ClipResult<u64> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                return Err(ClipError::transcode(format!(
                    "Transcoder reported success but {} was not written",
                    path.display()
                )))
            }
        };
        if size < self.settings.min_output_bytes {
            return Err(ClipError::transcode(format!(
                "Output {} is too small ({size} bytes)",
                path.display()
            )));
        }
        Ok(size)
    }
}

async fn write_report(report: &RenderReport) -> ClipResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(RenderReport::path_for(&report.output_path), json).await?;
    Ok(())
}

/// Remove every file an attempt for `request` may have left behind.
async fn cleanup_partials(request: &RenderRequest) {
    for path in [
        request.output_path(),
        request.stream_copy_output_path(),
        request.first_pass_path(),
    ] {
        remove_quietly(Some(&path)).await;
    }
}

async fn remove_quietly(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove file: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::request;
    use clipforge_clip_model::{CaptionSegment, ReframeMode};

    struct NeverRuns;

    #[async_trait::async_trait]
    impl Transcoder for NeverRuns {
        async fn run(&self, _job: &TranscodeJob, _sink: &dyn ProgressSink) -> ClipResult<()> {
            Err(ClipError::unsupported("planning only"))
        }
    }

    fn orchestrator() -> RenderOrchestrator {
        RenderOrchestrator::new(Arc::new(NeverRuns), OrchestratorSettings::default())
    }

    #[test]
    fn test_single_pass_plan() {
        let req = request(ReframeMode::Center);
        let plan = orchestrator().plan(&req, None, None);
        assert!(plan.overlay_pass.is_none());
        assert_eq!(plan.full.output, req.output_path());
        assert_eq!(plan.commands().len(), 3);
        assert_eq!(
            plan.commands().iter().map(|c| c.tier).collect::<Vec<_>>(),
            AttemptTier::ALL.to_vec()
        );
    }

    #[test]
    fn test_two_pass_plan_writes_intermediate() {
        let mut req = request(ReframeMode::Split);
        req.captions.segments.push(CaptionSegment {
            start_secs: 11.0,
            end_secs: 13.0,
            text: "hi".into(),
        });
        let srt = PathBuf::from("/tmp/c1.srt");
        let plan = orchestrator().plan(&req, None, Some(&srt));

        assert_eq!(plan.full.output, req.first_pass_path());
        let pass2 = plan.overlay_pass.as_ref().unwrap();
        assert_eq!(pass2.output, req.output_path());
        assert!(pass2.args.contains(&req.first_pass_path().display().to_string()));
        assert!(pass2.args.iter().any(|a| a.starts_with("[0:v]subtitles=")));
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            RenderReport::path_for(Path::new("/out/c1.mp4")),
            PathBuf::from("/out/c1.render.json")
        );
    }
}
