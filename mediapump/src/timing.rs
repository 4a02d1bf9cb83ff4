//! Render pacing against a monotonic anchor
//!
//! Output units carry a presentation time in microseconds. The first unit
//! released after a reset anchors wall-clock zero for the stream
//! (`anchor = now - pts`); every later unit is held until
//! `anchor + pts` so output paces at the stream's native rate regardless of
//! how fast the decoder runs.

use std::time::{Duration, Instant};

/// Presentation time in microseconds as a Duration
pub fn pts_duration(pts_us: i64) -> Duration {
    Duration::from_micros(pts_us.max(0) as u64)
}

/// Monotonic render-start anchor for one playback run
///
/// Reset on resume and on seek, so the next output re-anchors instead of
/// trying to catch up to where playback left off.
#[derive(Debug, Default)]
pub struct RenderClock {
    start: Option<Instant>,
}

impl RenderClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the anchor; the next output unit re-establishes it
    pub fn reset(&mut self) {
        self.start = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.start.is_some()
    }

    /// How long to hold the unit with the given presentation time before
    /// releasing it. Anchors on the first call after a reset (zero delay).
    pub fn delay_for(&mut self, pts_us: i64) -> Duration {
        self.delay_at(Instant::now(), pts_us)
    }

    fn delay_at(&mut self, now: Instant, pts_us: i64) -> Duration {
        match self.start {
            None => {
                // First output after a reset: render immediately and anchor
                // stream time zero relative to now.
                self.start = Some(now.checked_sub(pts_duration(pts_us)).unwrap_or(now));
                Duration::ZERO
            }
            Some(anchor) => {
                let target = anchor + pts_duration(pts_us);
                target.saturating_duration_since(now)
            }
        }
    }
}
