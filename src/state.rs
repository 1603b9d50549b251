// state.rs: the snapshot type owned by the playback state store.

use serde::Serialize;

const ZERO_CLOCK: &str = "0:00";

/// Point-in-time view of what is playing, how far along it is, and whether
/// anything comes next.
///
/// Exactly one snapshot is live per store. Every change replaces the whole
/// value through the store's watch channel, so readers never observe a
/// half-updated mix of fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    /// Display name of the current queue item.
    pub track_name: String,
    /// Artwork locator, when the metadata resolver found one.
    pub track_art_url: Option<String>,
    /// 0-100. Zero when the duration is unknown.
    pub progress_percent: f32,
    /// Elapsed time as `M:SS`.
    pub progress_formatted: String,
    /// Total time as `M:SS`.
    pub duration_formatted: String,
    pub is_playing: bool,
    /// True when no playback session is active (idle, stopped or ended).
    pub stopped: bool,
    pub has_next: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            track_name: String::new(),
            track_art_url: None,
            progress_percent: 0.0,
            progress_formatted: ZERO_CLOCK.to_string(),
            duration_formatted: ZERO_CLOCK.to_string(),
            is_playing: false,
            stopped: true,
            has_next: false,
        }
    }
}

/// Render a millisecond count as `M:SS`.
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Progress as 0-100. A zero duration means "unknown" and yields 0 rather
/// than a division error.
pub fn progress_percent(position_ms: u64, duration_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f32 / duration_ms as f32) * 100.0
}
