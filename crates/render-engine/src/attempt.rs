//! Attempt tiers and the escalation state machine.
//!
//! `Attempt(Full) → Attempt(Simplified) → Attempt(StreamCopy) → Exhausted`,
//! leaving the chain at `Done(tier)` on the first success. The transition
//! function is pure; the orchestrator owns the side effects.

use serde::{Deserialize, Serialize};

/// One of three increasingly conservative render strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptTier {
    /// Requested reframing, overlays, audio graph, and encoder.
    Full,
    /// Plain scale+crop re-encode with a pre-seek buffer.
    Simplified,
    /// Stream copy of the trimmed range.
    StreamCopy,
}

impl AttemptTier {
    pub const ALL: [AttemptTier; 3] = [Self::Full, Self::Simplified, Self::StreamCopy];

    /// 1-based attempt number.
    pub fn number(self) -> u8 {
        match self {
            Self::Full => 1,
            Self::Simplified => 2,
            Self::StreamCopy => 3,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Full => Some(Self::Simplified),
            Self::Simplified => Some(Self::StreamCopy),
            Self::StreamCopy => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Simplified => "simplified",
            Self::StreamCopy => "stream_copy",
        }
    }

    /// Plain-language progress message shown when this tier starts.
    pub fn start_message(self) -> &'static str {
        match self {
            Self::Full => "Rendering clip",
            Self::Simplified => "Retrying with simpler encoding",
            Self::StreamCopy => "Retrying with a direct copy of the source",
        }
    }
}

impl std::fmt::Display for AttemptTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempt(AttemptTier),
    Done(AttemptTier),
    Exhausted,
}

impl AttemptState {
    pub fn initial() -> Self {
        Self::Attempt(AttemptTier::Full)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempt(_))
    }
}

pub fn next_state(state: AttemptState, outcome: AttemptOutcome) -> AttemptState {
    match (state, outcome) {
        (AttemptState::Attempt(tier), AttemptOutcome::Succeeded) => AttemptState::Done(tier),
        (AttemptState::Attempt(tier), AttemptOutcome::Failed) => match tier.next() {
            Some(next) => AttemptState::Attempt(next),
            None => AttemptState::Exhausted,
        },
        (terminal, _) => terminal,
    }
}
