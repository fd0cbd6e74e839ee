//! Video filter graph for the full-fidelity attempt.
//!
//! Stage order is fixed: reframe, progress bar, subtitles, hook title,
//! watermark, pixel format. Every path ends at the `[vout]` pad.
//!
//! Reframing modes that duplicate the source (fit, split, tracked panel over
//! blur) produce several chains recombined by overlay/vstack. Burning text
//! into those graphs in the same pass is fragile, so such requests are
//! flagged for a second, single-chain overlay pass instead.

use std::path::Path;

use clipforge_clip_model::{
    even_floor, AxisPath, CropSpec, HookTitleConfig, ReframeMode, RenderRequest,
    WatermarkConfig, WatermarkCorner,
};
use clipforge_processing_core::crop_window;

use crate::captions::force_style;
use crate::graph::{ffmpeg_color, secs, Filter, FilterChain, FilterGraph, StreamLabel};
use crate::inputs::InputPlan;

/// Terminal video pad.
pub const VIDEO_OUTPUT: &str = "vout";

/// Tracked panel height as a fraction of the output in blurred tracking.
pub const TRACKING_PANEL_RATIO: f64 = 0.6;

const BLUR_ARGS: (u32, u32) = (20, 5);
const WATERMARK_MARGIN: u32 = 24;

/// A built video graph.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoGraph {
    pub graph: FilterGraph,
    pub output: StreamLabel,
    /// The reframing stage split the source into more than one stream.
    pub multi_stream: bool,
    /// Captions/hook were held back for a second pass.
    pub needs_second_pass: bool,
}

pub struct VideoGraphBuilder<'a> {
    request: &'a RenderRequest,
    inputs: &'a InputPlan,
    crop: Option<&'a CropSpec>,
    caption_file: Option<&'a Path>,
}

/// Reframing output: helper chains plus the head of the main chain.
struct Reframe {
    prefix: Vec<FilterChain>,
    head_inputs: Vec<StreamLabel>,
    head: Vec<Filter>,
}

impl<'a> VideoGraphBuilder<'a> {
    pub fn new(request: &'a RenderRequest, inputs: &'a InputPlan) -> Self {
        Self {
            request,
            inputs,
            crop: None,
            caption_file: None,
        }
    }

    /// Crop path for tracking modes. Without one they fall back to a
    /// centered crop.
    pub fn crop_path(mut self, crop: Option<&'a CropSpec>) -> Self {
        self.crop = crop;
        self
    }

    pub fn caption_file(mut self, path: Option<&'a Path>) -> Self {
        self.caption_file = path;
        self
    }

    /// Size the crop-path engine should plan for under this request.
    pub fn tracking_target(request: &RenderRequest) -> (u32, u32) {
        let (w, h) = (request.config.width, request.config.height);
        match request.config.reframe {
            ReframeMode::FaceTrackingWithBlur => (w, panel_height(h)),
            _ => (w, h),
        }
    }

    pub fn build(&self) -> VideoGraph {
        let reframe = self.reframe();
        let multi_stream = !reframe.prefix.is_empty();

        let hook = self
            .request
            .hook
            .as_ref()
            .filter(|hook| hook.is_visible());
        let needs_second_pass = multi_stream && (self.caption_file.is_some() || hook.is_some());

        let mut graph = FilterGraph::new();
        for chain in reframe.prefix {
            graph.push(chain);
        }

        let mut main = FilterChain::new().filters(reframe.head);
        for label in reframe.head_inputs {
            main = main.input(label);
        }

        if self.request.progress_bar.enabled {
            let pre = StreamLabel::new("prebar");
            let bar = StreamLabel::new("bar");
            graph.push(main.output(pre.clone()));
            graph.push(
                FilterChain::new()
                    .filter(self.progress_bar_source())
                    .output(bar.clone()),
            );
            main = FilterChain::new()
                .input(pre)
                .input(bar)
                .filter(self.progress_bar_overlay());
        }
        if !needs_second_pass {
            if let Some(path) = self.caption_file {
                main = main.filter(subtitles_filter(self.request, path));
            }
            if let Some(hook) = hook {
                main = main.filter(hook_filter(hook, self.request.duration()));
            }
        }

        let output = StreamLabel::new(VIDEO_OUTPUT);
        let watermark = &self.request.config.watermark;
        match (watermark.is_visible(), self.inputs.watermark_image) {
            (true, Some(index)) => {
                let base = StreamLabel::new("base");
                let mark = StreamLabel::new("wm");
                graph.push(main.output(base.clone()));
                graph.push(
                    FilterChain::new()
                        .input(StreamLabel::video_input(index))
                        .filter(Filter::new("format").arg("rgba"))
                        .filter(
                            Filter::new("colorchannelmixer")
                                .kv("aa", format!("{:.2}", watermark.opacity.clamp(0.0, 1.0))),
                        )
                        .filter(
                            Filter::new("scale")
                                .arg(even_floor(self.request.config.width / 5))
                                .arg(-1),
                        )
                        .output(mark.clone()),
                );
                let (x, y) = overlay_position(watermark.corner);
                graph.push(
                    FilterChain::new()
                        .input(base)
                        .input(mark)
                        .filter(
                            Filter::new("overlay")
                                .kv("x", x)
                                .kv("y", y)
                                .kv("shortest", 1),
                        )
                        .filter(pixel_format())
                        .output(output.clone()),
                );
            }
            (true, None) => {
                graph.push(
                    main.filter(text_watermark_filter(watermark))
                        .filter(pixel_format())
                        .output(output.clone()),
                );
            }
            _ => graph.push(main.filter(pixel_format()).output(output.clone())),
        }

        VideoGraph {
            graph,
            output,
            multi_stream,
            needs_second_pass,
        }
    }

    fn reframe(&self) -> Reframe {
        let (w, h) = (self.request.config.width, self.request.config.height);
        let source = StreamLabel::video_input(0);

        match self.request.config.reframe {
            ReframeMode::Center => linear(self.center_filters(w, h)),
            ReframeMode::FaceTracking => match self.crop {
                Some(spec) => linear(tracked_filters(spec, w, h)),
                None => linear(self.center_filters(w, h)),
            },
            ReframeMode::Fit => {
                let fg = vec![Filter::new("scale")
                    .kv("w", w)
                    .kv("h", h)
                    .kv("force_original_aspect_ratio", "decrease")];
                self.over_blurred_background(fg, "(W-w)/2")
            }
            ReframeMode::FaceTrackingWithBlur => {
                let panel_h = panel_height(h);
                let fg = match self.crop {
                    Some(spec) => tracked_filters(spec, w, panel_h),
                    None => self.center_filters(w, panel_h),
                };
                self.over_blurred_background(fg, "0")
            }
            ReframeMode::Split => self.split_panes(source, w, h),
        }
    }

    fn center_filters(&self, w: u32, h: u32) -> Vec<Filter> {
        let (sw, sh) = (self.request.source.width, self.request.source.height);
        if sw < 2 || sh < 2 {
            return fill_filters(w, h);
        }
        let (cw, ch) = crop_window(sw, sh, w, h);
        vec![
            Filter::new("crop")
                .arg(cw)
                .arg(ch)
                .arg((sw - cw) / 2)
                .arg((sh - ch) / 2),
            Filter::new("scale").arg(w).arg(h),
            Filter::new("setsar").arg(1),
        ]
    }

    fn over_blurred_background(&self, fg_filters: Vec<Filter>, fg_x: &str) -> Reframe {
        let (w, h) = (self.request.config.width, self.request.config.height);
        let bg = StreamLabel::new("bg");
        let fg = StreamLabel::new("fg");
        let bg_blur = StreamLabel::new("bgblur");
        let fg_out = StreamLabel::new("fgout");

        let mut bg_chain = FilterChain::new().input(bg.clone()).filters(fill_filters(w, h));
        bg_chain.filters.retain(|f| f.name != "setsar");
        let bg_chain = bg_chain
            .filter(Filter::new("boxblur").arg(BLUR_ARGS.0).arg(BLUR_ARGS.1))
            .output(bg_blur.clone());

        Reframe {
            prefix: vec![
                FilterChain::new()
                    .input(StreamLabel::video_input(0))
                    .filter(Filter::new("split").arg(2))
                    .output(bg.clone())
                    .output(fg.clone()),
                bg_chain,
                FilterChain::new()
                    .input(fg)
                    .filters(fg_filters)
                    .output(fg_out.clone()),
            ],
            head_inputs: vec![bg_blur, fg_out],
            head: vec![
                Filter::new("overlay").kv("x", fg_x).kv("y", "(H-h)/2"),
                Filter::new("setsar").arg(1),
            ],
        }
    }

    fn split_panes(&self, source: StreamLabel, w: u32, h: u32) -> Reframe {
        let top_h = even_floor(h / 2);
        let bottom_h = h.saturating_sub(top_h).max(2);
        let (sw, sh) = (self.request.source.width, self.request.source.height);

        let pane = |left: bool, pane_h: u32| -> Vec<Filter> {
            if sw < 4 || sh < 2 {
                let x = if left { "0" } else { "iw/2" };
                let mut filters = vec![Filter::new("crop").arg("iw/2").arg("ih").arg(x).arg(0)];
                filters.extend(fill_filters(w, pane_h));
                return filters;
            }
            let half = sw / 2;
            let (pw, ph) = crop_window(half, sh, w, pane_h);
            let x = (half - pw) / 2 + if left { 0 } else { half };
            vec![
                Filter::new("crop").arg(pw).arg(ph).arg(x).arg((sh - ph) / 2),
                Filter::new("scale").arg(w).arg(pane_h),
                Filter::new("setsar").arg(1),
            ]
        };

        let left = StreamLabel::new("left");
        let right = StreamLabel::new("right");
        let top = StreamLabel::new("top");
        let bottom = StreamLabel::new("bottom");

        Reframe {
            prefix: vec![
                FilterChain::new()
                    .input(source)
                    .filter(Filter::new("split").arg(2))
                    .output(left.clone())
                    .output(right.clone()),
                FilterChain::new()
                    .input(left)
                    .filters(pane(true, top_h))
                    .output(top.clone()),
                FilterChain::new()
                    .input(right)
                    .filters(pane(false, bottom_h))
                    .output(bottom.clone()),
            ],
            head_inputs: vec![top, bottom],
            head: vec![Filter::new("vstack").kv("inputs", 2)],
        }
    }

    /// Endless solid strip; the overlay below ends it with the main stream.
    fn progress_bar_source(&self) -> Filter {
        let bar = &self.request.progress_bar;
        Filter::new("color")
            .kv("c", ffmpeg_color(&bar.color, None))
            .kv("s", format!("{}x{}", self.request.config.width, bar.height_px.max(1)))
    }

    /// overlay evaluates `x` per frame, so the strip slides in from the left
    /// and is fully visible at the clip's last frame.
    fn progress_bar_overlay(&self) -> Filter {
        let duration = secs(self.request.duration().max(0.001));
        Filter::new("overlay")
            .quoted("x", format!("-w+w*t/{duration}"))
            .kv("y", "H-h")
            .kv("shortest", 1)
    }
}

/// Single-chain overlay pass over an already reframed file (input 0).
pub fn build_overlay_pass(request: &RenderRequest, caption_file: Option<&Path>) -> FilterGraph {
    let mut chain = FilterChain::new().input(StreamLabel::video_input(0));
    if let Some(path) = caption_file {
        chain = chain.filter(subtitles_filter(request, path));
    }
    if let Some(hook) = request.hook.as_ref().filter(|hook| hook.is_visible()) {
        chain = chain.filter(hook_filter(hook, request.duration()));
    }
    let mut graph = FilterGraph::new();
    graph.push(
        chain
            .filter(pixel_format())
            .output(StreamLabel::new(VIDEO_OUTPUT)),
    );
    graph
}

fn linear(head: Vec<Filter>) -> Reframe {
    Reframe {
        prefix: Vec::new(),
        head_inputs: vec![StreamLabel::video_input(0)],
        head,
    }
}

fn panel_height(h: u32) -> u32 {
    even_floor((h as f64 * TRACKING_PANEL_RATIO) as u32)
}

/// Scale to cover `w`x`h`, then crop the overflow.
fn fill_filters(w: u32, h: u32) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .kv("w", w)
            .kv("h", h)
            .kv("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(w).arg(h),
        Filter::new("setsar").arg(1),
    ]
}

fn tracked_filters(spec: &CropSpec, w: u32, h: u32) -> Vec<Filter> {
    let crop = Filter::new("crop").kv("w", spec.width).kv("h", spec.height);
    let crop = axis_arg(crop, "x", &spec.x);
    let crop = axis_arg(crop, "y", &spec.y);
    vec![
        crop,
        Filter::new("scale").arg(w).arg(h),
        Filter::new("setsar").arg(1),
    ]
}

fn axis_arg(filter: Filter, key: &str, path: &AxisPath) -> Filter {
    match path {
        AxisPath::Constant(v) => filter.kv(key, format!("{:.0}", v.max(0.0))),
        AxisPath::Piecewise(_) => filter.quoted(key, path.to_expr()),
    }
}

fn subtitles_filter(request: &RenderRequest, path: &Path) -> Filter {
    Filter::new("subtitles")
        .kv("filename", path.display())
        .quoted("force_style", force_style(&request.captions.style))
}

fn hook_filter(hook: &HookTitleConfig, clip_duration: f64) -> Filter {
    let mut filter = Filter::new("drawtext");
    if let Some(font) = &hook.font_file {
        filter = filter.kv("fontfile", font.display());
    }
    let visible_for = hook.duration_secs.min(clip_duration).max(0.0);
    filter
        .text(hook.text.trim())
        .kv("fontsize", hook.font_size)
        .kv("fontcolor", ffmpeg_color(&hook.text_color, None))
        .kv("box", 1)
        .kv("boxcolor", ffmpeg_color(&hook.box_color, Some(hook.box_opacity)))
        .kv("boxborderw", 24)
        .kv("x", "(w-text_w)/2")
        .kv("y", format!("h*{:.3}-text_h/2", hook.y_ratio.clamp(0.0, 1.0)))
        .quoted("enable", format!("between(t,0,{})", secs(visible_for)))
}

fn text_watermark_filter(watermark: &WatermarkConfig) -> Filter {
    let text = watermark.text.as_deref().unwrap_or_default().trim();
    let alpha = watermark.opacity.clamp(0.0, 1.0);
    let m = WATERMARK_MARGIN;
    let (x, y) = match watermark.corner {
        WatermarkCorner::TopLeft => (format!("{m}"), format!("{m}")),
        WatermarkCorner::TopRight => (format!("w-text_w-{m}"), format!("{m}")),
        WatermarkCorner::BottomLeft => (format!("{m}"), format!("h-text_h-{m}")),
        WatermarkCorner::BottomRight => (format!("w-text_w-{m}"), format!("h-text_h-{m}")),
    };
    let filter = Filter::new("drawtext")
        .text(text)
        .kv("fontsize", "h/40")
        .kv("fontcolor", format!("white@{alpha:.2}"))
        .kv("shadowcolor", format!("black@{:.2}", alpha * 0.6))
        .kv("shadowx", 2)
        .kv("shadowy", 2);
    if watermark.animated {
        // Drifts right to left once every 20 seconds.
        filter
            .quoted("x", "w-mod(t*(w+text_w)/20,w+text_w)")
            .kv("y", y)
    } else {
        filter.kv("x", x).kv("y", y)
    }
}

fn overlay_position(corner: WatermarkCorner) -> (String, String) {
    let m = WATERMARK_MARGIN;
    match corner {
        WatermarkCorner::TopLeft => (format!("{m}"), format!("{m}")),
        WatermarkCorner::TopRight => (format!("W-w-{m}"), format!("{m}")),
        WatermarkCorner::BottomLeft => (format!("{m}"), format!("H-h-{m}")),
        WatermarkCorner::BottomRight => (format!("W-w-{m}"), format!("H-h-{m}")),
    }
}

fn pixel_format() -> Filter {
    Filter::new("format").arg("yuv420p")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::request;
    use clipforge_clip_model::{CaptionSegment, HookTitleConfig};
    use std::path::PathBuf;

    fn build(req: &RenderRequest, crop: Option<&CropSpec>, captions: Option<&Path>) -> VideoGraph {
        let inputs = InputPlan::for_full_render(req, false);
        VideoGraphBuilder::new(req, &inputs)
            .crop_path(crop)
            .caption_file(captions)
            .build()
    }

    #[test]
    fn test_center_is_single_linear_chain() {
        let req = request(ReframeMode::Center);
        let video = build(&req, None, None);
        assert!(!video.multi_stream);
        assert_eq!(video.graph.chains.len(), 1);
        assert_eq!(
            video.graph.to_string(),
            "[0:v]crop=606:1080:657:0,scale=1080:1920,setsar=1,format=yuv420p[vout]"
        );
    }

    #[test]
    fn test_fit_is_multi_stream_and_ends_at_vout() {
        let req = request(ReframeMode::Fit);
        let video = build(&req, None, None);
        assert!(video.multi_stream);
        assert!(!video.needs_second_pass);
        assert_eq!(video.graph.chains.len(), 4);
        assert!(video.graph.has_output(&StreamLabel::new(VIDEO_OUTPUT)));
        assert_eq!(
            video.graph.filter_names(),
            vec!["split", "scale", "crop", "boxblur", "scale", "overlay", "setsar", "format"]
        );
    }

    #[test]
    fn test_split_stacks_two_panes() {
        let req = request(ReframeMode::Split);
        let video = build(&req, None, None);
        let text = video.graph.to_string();
        assert!(text.contains("[left]crop=960:852:0:114,scale=1080:960,setsar=1[top]"));
        assert!(text.contains("[right]crop=960:852:960:114,scale=1080:960,setsar=1[bottom]"));
        assert!(text.contains("[top][bottom]vstack=inputs=2"));
    }

    #[test]
    fn test_tracking_without_path_falls_back_to_center() {
        let tracked = build(&request(ReframeMode::FaceTracking), None, None);
        let center = build(&request(ReframeMode::Center), None, None);
        assert_eq!(tracked.graph, center.graph);
    }

    #[test]
    fn test_tracking_uses_quoted_expressions() {
        let req = request(ReframeMode::FaceTracking);
        let spec = CropSpec {
            width: 606,
            height: 1080,
            x: AxisPath::piecewise(vec![(0.0, 100.0), (2.0, 300.0), (4.0, 200.0)]),
            y: AxisPath::Constant(0.0),
        };
        let video = build(&req, Some(&spec), None);
        let crop = video.graph.find("crop").unwrap();
        assert_eq!(crop.get("w"), Some("606"));
        assert_eq!(crop.get("y"), Some("0"));
        assert!(crop.to_string().contains("x='if(lt(t,"));
    }

    #[test]
    fn test_overlay_order_in_single_pass() {
        let mut req = request(ReframeMode::Center);
        req.progress_bar.enabled = true;
        req.hook = Some(HookTitleConfig {
            text: "Wait for it".to_string(),
            ..HookTitleConfig::default()
        });
        req.config.watermark.enabled = true;
        req.config.watermark.text = Some("@clipforge".to_string());
        let srt = PathBuf::from("/tmp/c1.srt");

        let video = build(&req, None, Some(&srt));
        assert!(!video.needs_second_pass);
        assert_eq!(
            video.graph.filter_names(),
            vec![
                "crop", "scale", "setsar", "color", "overlay", "subtitles", "drawtext", "drawtext",
                "format"
            ]
        );
        let hook = video
            .graph
            .filters()
            .find(|f| f.get("text") == Some("Wait for it"))
            .unwrap();
        assert_eq!(hook.get("enable"), Some("between(t,0,3)"));
    }

    #[test]
    fn test_multi_stream_with_captions_needs_second_pass() {
        let mut req = request(ReframeMode::Fit);
        req.captions.segments.push(CaptionSegment {
            start_secs: 12.0,
            end_secs: 14.0,
            text: "hello".to_string(),
        });
        let srt = PathBuf::from("/tmp/c1.srt");

        let video = build(&req, None, Some(&srt));
        assert!(video.needs_second_pass);
        assert!(video.graph.find("subtitles").is_none());

        let pass2 = build_overlay_pass(&req, Some(&srt));
        assert_eq!(pass2.chains.len(), 1);
        assert_eq!(pass2.filter_names(), vec!["subtitles", "format"]);
    }

    #[test]
    fn test_image_watermark_overlays_extra_input() {
        let mut req = request(ReframeMode::Center);
        req.config.watermark.enabled = true;
        req.config.watermark.image = Some(PathBuf::from("/brand/logo.png"));
        let video = build(&req, None, None);
        let text = video.graph.to_string();
        assert!(text.contains("[1:v]format=rgba"));
        assert!(
            text.contains("[base][wm]overlay=x=W-w-24:y=H-h-24:shortest=1,format=yuv420p[vout]")
        );
    }

    #[test]
    fn test_progress_bar_slides_in_over_clip_duration() {
        let mut req = request(ReframeMode::Center);
        req.progress_bar.enabled = true;
        req.progress_bar.color = "#ff3b30".to_string();
        req.progress_bar.height_px = 8;
        let video = build(&req, None, None);

        let source = video.graph.find("color").unwrap();
        assert_eq!(source.get("c"), Some("0xFF3B30"));
        assert_eq!(source.get("s"), Some("1080x8"));
        let bar_chain = video.graph.producer_of(&StreamLabel::new("bar")).unwrap();
        assert!(bar_chain.inputs.is_empty());

        let overlay = video.graph.find("overlay").unwrap();
        assert_eq!(overlay.get("x"), Some("-w+w*t/30"));
        assert_eq!(overlay.get("y"), Some("H-h"));
        assert_eq!(overlay.get("shortest"), Some("1"));
        assert!(video.graph.to_string().contains(
            "[prebar][bar]overlay=x='-w+w*t/30':y=H-h:shortest=1,format=yuv420p[vout]"
        ));
        assert!(video.graph.find("drawbox").is_none());
    }

    #[test]
    fn test_hook_text_with_colon_is_escaped_twice() {
        let mut req = request(ReframeMode::Center);
        req.hook = Some(HookTitleConfig {
            text: "3 tips: watch".to_string(),
            ..HookTitleConfig::default()
        });
        let video = build(&req, None, None);
        let text = video.graph.to_string();
        assert!(text.contains(r"drawtext=text=3 tips\\\: watch:fontsize="));
    }

    #[test]
    fn test_tracking_target_for_blur_panel() {
        let req = request(ReframeMode::FaceTrackingWithBlur);
        assert_eq!(VideoGraphBuilder::tracking_target(&req), (1080, 1152));
    }
}
