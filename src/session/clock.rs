use std::time::Instant;

/// Wall-clock position tracking for a player with no real audio pipeline
/// behind it. Anchors a known position to a monotonic instant and
/// extrapolates while playing.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    /// Anchor position in milliseconds.
    anchor_ms: u64,
    /// Monotonic instant corresponding to `anchor_ms`; `None` while paused.
    anchor_instant: Option<Instant>,
}

impl PlaybackClock {
    /// Re-anchor at `position_ms` with the running anchor cleared. Callers
    /// decide separately whether the clock is running via `mark_playing`.
    pub fn reset(&mut self, position_ms: u64) {
        self.anchor_ms = position_ms;
        self.anchor_instant = None;
    }

    /// Re-anchor at an observed position, refreshing the monotonic anchor so
    /// later estimates are relative to this observation. Prevents
    /// double-counting when a sampled estimate is written back.
    pub fn set_position(&mut self, position_ms: u64) {
        self.anchor_ms = position_ms;
        self.anchor_instant = Some(Instant::now());
    }

    /// Measure elapsed time from the resume moment, so paused wall-clock
    /// time never leaks into estimates.
    pub fn mark_playing(&mut self) {
        self.anchor_instant = Some(Instant::now());
    }

    /// Fold elapsed time into the anchor and stop the clock.
    pub fn mark_paused(&mut self) {
        self.anchor_ms = self.estimate(true);
        self.anchor_instant = None;
    }

    pub fn estimate(&self, playing: bool) -> u64 {
        if !playing {
            return self.anchor_ms;
        }
        match self.anchor_instant {
            Some(instant) => self
                .anchor_ms
                .saturating_add(instant.elapsed().as_millis() as u64),
            None => self.anchor_ms,
        }
    }
}
