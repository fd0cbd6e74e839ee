//! Clip status state machine observed by external callers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use clipforge_common::error::{ClipError, ClipResult};

/// `pending → rendering → {rendered | failed}`; a finished clip may be
/// rendered again, which moves it back to `rendering`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClipStatus {
    #[default]
    Pending,
    Rendering,
    Rendered { output_path: PathBuf },
    Failed { error: String },
}

impl ClipStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rendering => "rendering",
            Self::Rendered { .. } => "rendered",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rendered { .. } | Self::Failed { .. })
    }

    pub fn can_transition_to(&self, next: &ClipStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending | Self::Rendered { .. } | Self::Failed { .. },
                Self::Rendering
            ) | (Self::Rendering, Self::Rendered { .. } | Self::Failed { .. })
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(self, next: ClipStatus) -> ClipResult<ClipStatus> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(ClipError::invalid_input(format!(
                "Illegal clip status transition: {} -> {}",
                self.name(),
                next.name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = ClipStatus::Pending
            .transition(ClipStatus::Rendering)
            .unwrap()
            .transition(ClipStatus::Rendered {
                output_path: PathBuf::from("/out/c1.mp4"),
            })
            .unwrap();
        assert!(status.is_terminal());
        assert!(status.transition(ClipStatus::Rendering).is_ok());
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(ClipStatus::Pending
            .transition(ClipStatus::Failed {
                error: "x".to_string()
            })
            .is_err());
        assert!(ClipStatus::Rendering
            .transition(ClipStatus::Rendering)
            .is_err());
        assert!(ClipStatus::Rendering
            .transition(ClipStatus::Pending)
            .is_err());
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&ClipStatus::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"failed","error":"boom"}"#);
    }
}
