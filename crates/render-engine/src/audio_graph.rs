//! Audio processing for the full-fidelity attempt.
//!
//! Speech always gets loudness normalization, optionally preceded by
//! denoise and clarity filters. With no music or effects the chain is
//! applied with `-af`; otherwise every layer becomes a labelled branch and
//! the branches are mixed with the speech track as the duration master.

use clipforge_clip_model::{AudioEnhancement, RenderRequest};

use crate::graph::{chain_to_string, secs, Filter, FilterChain, FilterGraph, StreamLabel};
use crate::inputs::InputPlan;

/// Terminal audio pad for mixed graphs.
pub const AUDIO_OUTPUT: &str = "aout";

/// Integrated loudness target for short-form platforms.
pub const LOUDNESS_TARGET_LUFS: f64 = -14.0;
const TRUE_PEAK_DB: f64 = -1.5;
const LOUDNESS_RANGE: f64 = 11.0;

const MUSIC_FADE_IN_SECS: f64 = 1.0;
const MUSIC_FADE_OUT_SECS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioGraph {
    /// Linear chain over the source audio, used with `-af`.
    Simple(Vec<Filter>),
    /// Multi-input graph ending at `[aout]`, merged into `-filter_complex`.
    Mixed(FilterGraph),
}

impl AudioGraph {
    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed(_))
    }

    /// `-af` text for simple graphs.
    pub fn simple_chain(&self) -> Option<String> {
        match self {
            Self::Simple(filters) => Some(chain_to_string(filters)),
            Self::Mixed(_) => None,
        }
    }

    pub fn output_label() -> StreamLabel {
        StreamLabel::new(AUDIO_OUTPUT)
    }
}

pub struct AudioGraphBuilder<'a> {
    request: &'a RenderRequest,
    inputs: &'a InputPlan,
    loudness_target: f64,
}

impl<'a> AudioGraphBuilder<'a> {
    pub fn new(request: &'a RenderRequest, inputs: &'a InputPlan) -> Self {
        Self {
            request,
            inputs,
            loudness_target: LOUDNESS_TARGET_LUFS,
        }
    }

    /// Override the integrated loudness target (LUFS).
    pub fn loudness_target(mut self, lufs: f64) -> Self {
        if lufs.is_finite() && lufs < 0.0 {
            self.loudness_target = lufs;
        }
        self
    }

    pub fn build(&self) -> AudioGraph {
        let speech = speech_filters(&self.request.config.audio, self.loudness_target);
        let music = self.request.music.as_ref().zip(self.inputs.music);
        if music.is_none() && self.inputs.effects.is_empty() {
            return AudioGraph::Simple(speech);
        }

        let duration = self.request.duration();
        let mut graph = FilterGraph::new();
        let mut mix_inputs = Vec::new();

        let speech_label = StreamLabel::new("speech");
        graph.push(
            FilterChain::new()
                .input(StreamLabel::audio_input(0))
                .filters(speech)
                .output(speech_label.clone()),
        );
        mix_inputs.push(speech_label);

        if let Some((bed, index)) = music {
            let fade_in = MUSIC_FADE_IN_SECS.min(duration / 2.0);
            let fade_out = MUSIC_FADE_OUT_SECS.min(duration / 2.0);
            let label = StreamLabel::new("music");
            graph.push(
                FilterChain::new()
                    .input(StreamLabel::audio_input(index))
                    .filter(Filter::new("atrim").kv("start", 0).kv("end", secs(duration)))
                    .filter(Filter::new("asetpts").arg("PTS-STARTPTS"))
                    .filter(Filter::new("volume").arg(format!("{:.2}", bed.gain())))
                    .filter(
                        Filter::new("afade")
                            .kv("t", "in")
                            .kv("st", 0)
                            .kv("d", secs(fade_in)),
                    )
                    .filter(
                        Filter::new("afade")
                            .kv("t", "out")
                            .kv("st", secs((duration - fade_out).max(0.0)))
                            .kv("d", secs(fade_out)),
                    )
                    .output(label.clone()),
            );
            mix_inputs.push(label);
        }

        for (n, (effect, index)) in self
            .request
            .sound_effects
            .iter()
            .zip(self.inputs.effects.iter().copied())
            .enumerate()
        {
            let delay = effect.delay_ms();
            let label = StreamLabel::new(format!("sfx{n}"));
            graph.push(
                FilterChain::new()
                    .input(StreamLabel::audio_input(index))
                    .filter(Filter::new("adelay").kv("delays", delay).kv("all", 1))
                    .filter(Filter::new("volume").arg(format!("{:.2}", effect.gain())))
                    .output(label.clone()),
            );
            mix_inputs.push(label);
        }

        let mut mix = FilterChain::new();
        let count = mix_inputs.len();
        for label in mix_inputs {
            mix = mix.input(label);
        }
        graph.push(
            mix.filter(
                Filter::new("amix")
                    .kv("inputs", count)
                    .kv("duration", "first")
                    .kv("dropout_transition", 0)
                    .kv("normalize", 0),
            )
            .filter(Filter::new("alimiter"))
            .output(AudioGraph::output_label()),
        );

        AudioGraph::Mixed(graph)
    }
}

/// Speech chain: optional denoise, optional clarity, then loudness.
pub fn speech_filters(enhancement: &AudioEnhancement, loudness_target: f64) -> Vec<Filter> {
    let mut filters = Vec::new();
    if enhancement.noise_reduction {
        filters.push(Filter::new("afftdn").kv("nf", -25));
        filters.push(Filter::new("highpass").kv("f", 80));
        filters.push(Filter::new("lowpass").kv("f", 12000));
    }
    if enhancement.voice_clarity {
        filters.push(
            Filter::new("equalizer")
                .kv("f", 3000)
                .kv("t", "q")
                .kv("w", 1)
                .kv("g", 3),
        );
        filters.push(
            Filter::new("acompressor")
                .kv("threshold", "-18dB")
                .kv("ratio", 3)
                .kv("attack", 5)
                .kv("release", 50),
        );
    }
    filters.push(
        Filter::new("loudnorm")
            .kv("I", loudness_target)
            .kv("TP", TRUE_PEAK_DB)
            .kv("LRA", LOUDNESS_RANGE),
    );
    filters
}
