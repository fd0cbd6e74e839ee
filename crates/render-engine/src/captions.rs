//! Caption files for subtitle burn-in.

use std::path::{Path, PathBuf};

use clipforge_clip_model::{CaptionPosition, CaptionSegment, CaptionStyle, RenderRequest};
use clipforge_common::error::ClipResult;

/// Generate SRT content from clip-relative segments.
pub fn generate_srt(segments: &[CaptionSegment]) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start_secs),
            format_srt_time(segment.end_secs),
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Write the clip's captions to `<dir>/<clip>.srt`.
///
/// Returns `None` when no caption overlaps the clip.
pub fn write_caption_file(request: &RenderRequest, dir: &Path) -> ClipResult<Option<PathBuf>> {
    let segments = request.captions.clip_segments(&request.range);
    if segments.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.srt", file_stem(&request.clip_id)));
    std::fs::write(&path, generate_srt(&segments))?;
    tracing::debug!(
        path = %path.display(),
        segments = segments.len(),
        "Wrote caption file"
    );
    Ok(Some(path))
}

/// libass `force_style` string for the subtitles filter.
pub fn force_style(style: &CaptionStyle) -> String {
    let alignment = match style.position {
        CaptionPosition::Bottom => 2,
        CaptionPosition::Center => 5,
        CaptionPosition::Top => 8,
    };
    format!(
        "FontName={},FontSize={},PrimaryColour={},OutlineColour={},BorderStyle=1,Outline={},Bold={},Alignment={},MarginV={}",
        style.font_name.replace([',', '\'', ':'], " "),
        style.font_size,
        ass_color(&style.primary_color),
        ass_color(&style.outline_color),
        style.outline_width,
        if style.bold { 1 } else { 0 },
        alignment,
        style.margin_v,
    )
}

/// `#rrggbb` to ASS `&H00BBGGRR`. Unparseable colours become white.
fn ass_color(hex: &str) -> String {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return "&H00FFFFFF".to_string();
    }
    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    format!("&H00{}{}{}", b, g, r).to_ascii_uppercase()
}

fn file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_generation() {
        let segments = vec![
            CaptionSegment {
                start_secs: 0.0,
                end_secs: 2.5,
                text: "Hello world".to_string(),
            },
            CaptionSegment {
                start_secs: 3.0,
                end_secs: 5.0,
                text: "This is a test".to_string(),
            },
        ];

        let srt = generate_srt(&segments);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:05,000\nThis is a test"));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
    }

    #[test]
    fn test_force_style() {
        let style = CaptionStyle::default();
        let forced = force_style(&style);
        assert!(forced.starts_with("FontName=Arial,FontSize=18,"));
        assert!(forced.contains("PrimaryColour=&H00FFFFFF"));
        assert!(forced.contains("Alignment=2"));
        assert!(!forced.contains(':'));
    }

    #[test]
    fn test_ass_color_byte_order() {
        assert_eq!(ass_color("#ff8800"), "&H000088FF");
        assert_eq!(ass_color("nope"), "&H00FFFFFF");
    }
}
