//! Downscaled RGB frames handed to region detection.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Frame dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Expected {expected} RGB bytes for {width}x{height}, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// One packed RGB24 frame sampled from the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    /// Clip-relative time in seconds.
    pub time_secs: f64,
    pub width: u32,
    pub height: u32,
    /// Row-major RGB24 pixel data, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

impl AnalysisFrame {
    pub fn new(time_secs: f64, width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        let expected = frame_len(width, height);
        if rgb.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: rgb.len(),
            });
        }
        Ok(Self {
            time_secs,
            width,
            height,
            rgb,
        })
    }

    /// Solid-colour frame.
    pub fn filled(time_secs: f64, width: u32, height: u32, color: [u8; 3]) -> Self {
        let rgb = color
            .iter()
            .copied()
            .cycle()
            .take(frame_len(width, height))
            .collect();
        Self {
            time_secs,
            width,
            height,
            rgb,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `(x, y, [r, g, b])` for every pixel, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, [u8; 3])> + '_ {
        let width = self.width;
        self.rgb.chunks_exact(3).enumerate().map(move |(i, px)| {
            let i = i as u32;
            (i % width, i / width, [px[0], px[1], px[2]])
        })
    }

    /// Paint a filled rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y.min(self.height)..y_end {
            for px in x.min(self.width)..x_end {
                let offset = (py as usize * self.width as usize + px as usize) * 3;
                self.rgb[offset..offset + 3].copy_from_slice(&color);
            }
        }
    }
}

/// Split a rawvideo RGB24 byte stream into frames taken every
/// `interval_secs`, starting at clip time zero. A trailing partial frame is
/// dropped.
pub fn frames_from_rawvideo(
    bytes: &[u8],
    width: u32,
    height: u32,
    interval_secs: f64,
) -> Result<Vec<AnalysisFrame>, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyDimensions { width, height });
    }
    let len = frame_len(width, height);
    Ok(bytes
        .chunks_exact(len)
        .enumerate()
        .map(|(i, chunk)| AnalysisFrame {
            time_secs: i as f64 * interval_secs,
            width,
            height,
            rgb: chunk.to_vec(),
        })
        .collect())
}

fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mismatch_rejected() {
        let err = AnalysisFrame::new(0.0, 4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, FrameError::SizeMismatch { expected: 48, .. }));
    }

    #[test]
    fn test_rawvideo_split_drops_partial_tail() {
        let bytes = vec![7u8; 2 * 2 * 3 * 3 + 5];
        let frames = frames_from_rawvideo(&bytes, 2, 2, 2.0).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].time_secs, 4.0);
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut frame = AnalysisFrame::filled(0.0, 4, 4, [0, 0, 0]);
        frame.fill_rect(2, 2, 10, 10, [255, 0, 0]);
        let painted = frame.pixels().filter(|(_, _, px)| px[0] == 255).count();
        assert_eq!(painted, 4);
    }
}
