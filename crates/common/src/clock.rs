//! Timing utilities for render bookkeeping and progress throttling.

use std::time::{Duration, Instant};

/// Wall-clock anchored timer for one render invocation.
#[derive(Debug, Clone)]
pub struct RenderClock {
    /// The instant the render started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RenderClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the render started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Milliseconds elapsed since the render started.
    pub fn elapsed_ms(&self) -> u128 {
        self.epoch.elapsed().as_millis()
    }

    /// Wall-clock time at render start.
    pub fn started_at(&self) -> &str {
        &self.epoch_wall
    }
}

/// Rate limiter for progress reports.
///
/// The first report always passes; later reports pass only once the
/// minimum interval has elapsed since the last one that passed.
#[derive(Debug)]
pub struct ProgressThrottle {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit: None,
        }
    }

    /// Create a throttle from a millisecond interval.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Check whether a report at `now` may be emitted.
    /// Returns true and records the emission if so.
    pub fn should_emit(&mut self, now: Instant) -> bool {
        match self.last_emit {
            None => {
                self.last_emit = Some(now);
                true
            }
            Some(last) if now.saturating_duration_since(last) >= self.min_interval => {
                self.last_emit = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Minimum spacing between reports.
    pub fn interval(&self) -> Duration {
        self.min_interval
    }
}
