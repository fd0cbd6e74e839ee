//! Ordered ffmpeg inputs with stable stream indices.

use std::path::{Path, PathBuf};

use clipforge_clip_model::RenderRequest;

use crate::graph::secs;

/// One `-i` input plus the options that must precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub path: PathBuf,
    pub pre_args: Vec<String>,
}

/// Inputs in the order they appear on the command line.
///
/// Source is always index 0, then the watermark image, music bed, and
/// sound effects in placement order.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPlan {
    inputs: Vec<InputSpec>,
    pub watermark_image: Option<usize>,
    pub music: Option<usize>,
    pub effects: Vec<usize>,
}

impl InputPlan {
    /// Source only, with the given options before `-i`.
    pub fn source(path: impl AsRef<Path>, pre_args: Vec<String>) -> Self {
        Self {
            inputs: vec![InputSpec {
                path: path.as_ref().to_path_buf(),
                pre_args,
            }],
            watermark_image: None,
            music: None,
            effects: Vec::new(),
        }
    }

    /// Inputs for the full-fidelity attempt: source seeked to the clip start,
    /// then every overlay and audio asset the request uses.
    pub fn for_full_render(request: &RenderRequest, hw_accel: bool) -> Self {
        let mut pre_args = Vec::new();
        if hw_accel {
            pre_args.extend(["-hwaccel".to_string(), "auto".to_string()]);
        }
        pre_args.extend(["-ss".to_string(), secs(request.range.start_secs)]);
        let mut plan = Self::source(&request.source.path, pre_args);

        let watermark = &request.config.watermark;
        if watermark.is_visible() {
            if let Some(image) = &watermark.image {
                plan.watermark_image = Some(plan.push(image, ["-loop", "1"]));
            }
        }
        if let Some(music) = &request.music {
            plan.music = Some(plan.push(&music.track.path, ["-stream_loop", "-1"]));
        }
        for effect in &request.sound_effects {
            let index = plan.push(&effect.track.path, []);
            plan.effects.push(index);
        }
        plan
    }

    fn push<const N: usize>(&mut self, path: &Path, pre_args: [&str; N]) -> usize {
        self.inputs.push(InputSpec {
            path: path.to_path_buf(),
            pre_args: pre_args.iter().map(|s| s.to_string()).collect(),
        });
        self.inputs.len() - 1
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    /// `[pre_args.., -i, path]` for every input.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for input in &self.inputs {
            args.extend(input.pre_args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.display().to_string());
        }
        args
    }
}
