//! `render_clip`: the entry point collaborators call.
//!
//! Reads the clip, its project, the license limits, settings, and library
//! tracks once, resolves them into a gated [`RenderRequest`], and drives the
//! clip status around the orchestrator run. Input errors leave the status
//! untouched; everything after `rendering` ends in `rendered` or `failed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use clipforge_clip_model::{
    AudioEnhancement, CaptionConfig, ClipRecord, ClipStatus, ClipStore, LicenseService,
    MediaLibrary, MusicBed, ProjectRecord, RenderConfig, RenderLimits, RenderRequest,
    SettingsMap, SettingsStore, SoundEffectPlacement, SourceMedia, TimeRange, WatermarkConfig,
};
use clipforge_common::error::ClipResult;

use crate::capability::gate;
use crate::orchestrator::RenderOrchestrator;
use crate::probe::MediaProber;
use crate::sink::ProgressSink;

/// What `render_clip` hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedClip {
    pub output_path: PathBuf,
    pub size_bytes: u64,
}

/// The four collaborator contracts.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ClipStore>,
    pub license: Arc<dyn LicenseService>,
    pub settings: Arc<dyn SettingsStore>,
    pub library: Arc<dyn MediaLibrary>,
}

impl Collaborators {
    /// Use one object for every contract, e.g. a `JsonClipStore`.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: ClipStore + LicenseService + SettingsStore + MediaLibrary + 'static,
    {
        Self {
            store: backend.clone(),
            license: backend.clone(),
            settings: backend.clone(),
            library: backend,
        }
    }
}

/// Music bed and effects resolved against the library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAudio {
    pub music: Option<MusicBed>,
    pub sound_effects: Vec<SoundEffectPlacement>,
}

pub struct ClipRenderService {
    collaborators: Collaborators,
    orchestrator: RenderOrchestrator,
    prober: Option<Arc<dyn MediaProber>>,
    output_dir: PathBuf,
    default_resolution: u32,
}

impl ClipRenderService {
    pub fn new(
        collaborators: Collaborators,
        orchestrator: RenderOrchestrator,
        output_dir: impl Into<PathBuf>,
        default_resolution: u32,
    ) -> Self {
        Self {
            collaborators,
            orchestrator,
            prober: None,
            output_dir: output_dir.into(),
            default_resolution,
        }
    }

    /// Probe sources whose project record lacks dimensions or duration.
    pub fn with_prober(mut self, prober: Arc<dyn MediaProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn orchestrator(&self) -> &RenderOrchestrator {
        &self.orchestrator
    }

    /// Resolve and gate the request for `clip_id` without rendering.
    pub async fn prepare(&self, clip_id: &str) -> ClipResult<RenderRequest> {
        let store = &self.collaborators.store;
        let clip = store.load_clip(clip_id)?;
        let mut project = store.load_project(&clip.project_id)?;
        self.fill_source_metadata(&mut project).await;

        let limits = self.collaborators.license.render_limits()?;
        let settings = self.collaborators.settings.settings()?;
        let audio = resolve_audio(&clip, self.collaborators.library.as_ref())?;

        Ok(build_request(
            &clip,
            &project,
            &settings,
            limits,
            audio,
            &self.output_dir,
            self.default_resolution,
        ))
    }

    pub async fn render_clip(
        &self,
        clip_id: &str,
        sink: &dyn ProgressSink,
    ) -> ClipResult<RenderedClip> {
        let request = self.prepare(clip_id).await?;
        request.validate()?;

        let store = &self.collaborators.store;
        store.set_status(clip_id, ClipStatus::Rendering)?;

        match self.orchestrator.render(&request, sink).await {
            Ok(output) => {
                store.set_status(
                    clip_id,
                    ClipStatus::Rendered {
                        output_path: output.output_path.clone(),
                    },
                )?;
                Ok(RenderedClip {
                    output_path: output.output_path,
                    size_bytes: output.size_bytes,
                })
            }
            Err(e) => {
                if let Err(status_err) = store.set_status(
                    clip_id,
                    ClipStatus::Failed {
                        error: e.to_string(),
                    },
                ) {
                    tracing::error!(clip_id, "Failed to record clip failure: {status_err}");
                }
                Err(e)
            }
        }
    }

    async fn fill_source_metadata(&self, project: &mut ProjectRecord) {
        let complete = project.width > 0 && project.height > 0 && project.duration_secs > 0.0;
        let Some(prober) = self.prober.as_ref().filter(|_| !complete) else {
            return;
        };
        match prober.probe(&project.source_path).await {
            Ok(probe) => {
                tracing::debug!(
                    project_id = %project.id,
                    width = probe.width,
                    height = probe.height,
                    duration_secs = probe.duration_secs,
                    "Probed source"
                );
                if project.width == 0 || project.height == 0 {
                    project.width = probe.width;
                    project.height = probe.height;
                }
                if project.duration_secs <= 0.0 {
                    project.duration_secs = probe.duration_secs;
                }
            }
            Err(e) => tracing::warn!(project_id = %project.id, "Source probe failed: {e}"),
        }
    }
}

/// Look up the clip's music bed and sound effects in the library.
pub fn resolve_audio(clip: &ClipRecord, library: &dyn MediaLibrary) -> ClipResult<ResolvedAudio> {
    let music = clip
        .music_track_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(|id| {
            library.resolve(id).map(|track| MusicBed {
                track,
                volume: clip.music_volume,
            })
        })
        .transpose()?;

    let sound_effects = clip
        .sound_effects
        .iter()
        .map(|effect| {
            library
                .resolve(&effect.track_id)
                .map(|track| SoundEffectPlacement {
                    track,
                    offset_secs: effect.offset_secs,
                    volume: effect.volume,
                })
        })
        .collect::<ClipResult<Vec<_>>>()?;

    Ok(ResolvedAudio {
        music,
        sound_effects,
    })
}

/// Assemble the gated request. Pure: everything it needs is passed in.
pub fn build_request(
    clip: &ClipRecord,
    project: &ProjectRecord,
    settings: &SettingsMap,
    limits: RenderLimits,
    audio: ResolvedAudio,
    output_dir: &Path,
    resolution: u32,
) -> RenderRequest {
    let aspect = clip.aspect_ratio.unwrap_or(project.aspect_ratio);
    let (width, height) = aspect.output_dimensions(resolution);

    let requested = RenderConfig {
        width,
        height,
        reframe: clip.reframe.unwrap_or(project.reframe),
        encoder: settings.encoder_settings(),
        watermark: watermark_from_settings(settings),
        audio: AudioEnhancement {
            noise_reduction: settings.flag(SettingsMap::NOISE_REDUCTION),
            voice_clarity: settings.flag(SettingsMap::VOICE_CLARITY),
        },
    };
    let config = gate(&requested, &limits);

    let captions = if clip.captions_enabled {
        CaptionConfig {
            segments: project.transcript.clone(),
            style: clip.caption_style.clone().unwrap_or_default(),
        }
    } else {
        CaptionConfig::default()
    };

    RenderRequest {
        clip_id: clip.id.clone(),
        project_id: project.id.clone(),
        source: SourceMedia {
            path: project.source_path.clone(),
            duration_secs: project.duration_secs,
            width: project.width,
            height: project.height,
        },
        range: TimeRange::new(clip.start_secs, clip.end_secs),
        aspect,
        config,
        captions,
        hook: clip.hook.clone().filter(|hook| hook.is_visible()),
        progress_bar: clip.progress_bar.clone(),
        music: audio.music,
        sound_effects: audio.sound_effects,
        output_dir: output_dir.to_path_buf(),
        limits,
    }
}

fn watermark_from_settings(settings: &SettingsMap) -> WatermarkConfig {
    let non_empty = |key: &str| {
        settings
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    WatermarkConfig {
        enabled: settings.flag(SettingsMap::WATERMARK_ENABLED),
        image: non_empty(SettingsMap::WATERMARK_IMAGE).map(PathBuf::from),
        text: non_empty(SettingsMap::WATERMARK_TEXT),
        animated: settings.flag(SettingsMap::WATERMARK_ANIMATED),
        ..WatermarkConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_clip_model::{
        AspectRatio, CaptionSegment, LicenseTier, ReframeMode, VideoEncoder,
    };

    fn project() -> ProjectRecord {
        ProjectRecord {
            id: "p1".into(),
            source_path: "/videos/talk.mp4".into(),
            duration_secs: 600.0,
            width: 1920,
            height: 1080,
            aspect_ratio: AspectRatio::PORTRAIT,
            reframe: ReframeMode::FaceTracking,
            transcript: vec![CaptionSegment {
                start_secs: 12.0,
                end_secs: 14.0,
                text: "hello".into(),
            }],
        }
    }

    fn clip() -> ClipRecord {
        serde_json::from_value(serde_json::json!({
            "id": "c1",
            "project_id": "p1",
            "start_secs": 10.0,
            "end_secs": 40.0
        }))
        .unwrap()
    }

    #[test]
    fn test_build_request_for_pro_tier() {
        let mut settings = SettingsMap::default();
        settings.set(SettingsMap::ENCODER, "h264_nvenc");
        settings.set(SettingsMap::NOISE_REDUCTION, "true");

        let req = build_request(
            &clip(),
            &project(),
            &settings,
            RenderLimits::for_tier(LicenseTier::Pro),
            ResolvedAudio::default(),
            Path::new("/out"),
            1080,
        );
        assert_eq!((req.config.width, req.config.height), (1080, 1920));
        assert_eq!(req.config.reframe, ReframeMode::FaceTracking);
        assert_eq!(req.config.encoder.encoder, VideoEncoder::H264Nvenc);
        assert!(req.config.audio.noise_reduction);
        assert!(!req.config.watermark.enabled);
        assert_eq!(req.captions.segments.len(), 1);
        assert_eq!(req.output_path(), PathBuf::from("/out/c1.mp4"));
    }

    #[test]
    fn test_build_request_gates_free_tier() {
        let mut clip = clip();
        clip.captions_enabled = false;
        clip.aspect_ratio = Some(AspectRatio::SQUARE);

        let req = build_request(
            &clip,
            &project(),
            &SettingsMap::default(),
            RenderLimits::for_tier(LicenseTier::Free),
            ResolvedAudio::default(),
            Path::new("/out"),
            1080,
        );
        assert_eq!((req.config.width, req.config.height), (720, 720));
        assert_eq!(req.config.reframe, ReframeMode::Center);
        assert!(req.config.watermark.is_visible());
        assert!(req.captions.segments.is_empty());
    }
}
