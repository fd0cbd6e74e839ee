//! Error types shared across ClipForge crates.

use std::path::PathBuf;

/// Top-level error type for clip rendering operations.
///
/// Variants follow the pipeline's failure taxonomy: input errors stop a
/// render before any attempt, transient errors escalate to the next attempt
/// tier, overlay errors are absorbed, and fatal errors reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Transcoder timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Overlay pass failed: {message}")]
    Overlay { message: String },

    #[error("Transcoder binary not available: {binary}")]
    TranscoderMissing { binary: String },

    #[error("Render of clip {clip_id} failed: {diagnostic}")]
    RenderFailed { clip_id: String, diagnostic: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipError.
pub type ClipResult<T> = Result<T, ClipError>;

impl ClipError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn overlay(msg: impl Into<String>) -> Self {
        Self::Overlay {
            message: msg.into(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Errors recovered by retrying with a simpler attempt tier.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transcode { .. } | Self::Timeout { .. })
    }

    /// Errors that end the render immediately, with no further attempts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TranscoderMissing { .. }
                | Self::RenderFailed { .. }
                | Self::InvalidInput { .. }
                | Self::SourceNotFound { .. }
        )
    }
}
