//! Engine seam: the media session the controller drives and observes.
//!
//! The engine itself is a black box behind [`MediaSession`]: transport
//! commands in, raw events and synchronous position reads out. The crate
//! ships one in-process implementation ([`SimulatedSession`]) that advances
//! position by wall clock without decoding anything.

pub mod clock;
pub mod sim;

pub use sim::SimulatedSession;

use std::path::PathBuf;
use tokio::sync::broadcast;

/// Errors crossing the session boundary.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("session is not connected")]
    Disconnected,
    #[error("could not establish engine session: {0}")]
    Connect(String),
}

/// Discrete engine state codes as the engine reports them. The controller
/// translates these into the normalized phase set and drops anything it
/// does not recognize.
pub mod phase_code {
    pub const IDLE: u8 = 1;
    pub const BUFFERING: u8 = 2;
    pub const READY: u8 = 3;
    pub const ENDED: u8 = 4;
}

/// Raw engine callbacks, re-expressed as a broadcast stream.
///
/// `ItemChanged` carries the engine's new queue index; consumers that need
/// it re-read it through [`MediaSession::current_index`] rather than
/// trusting the payload, so a late-delivered event cannot plant a stale
/// pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PlayingChanged(bool),
    ItemChanged { index: usize },
    StateChanged(u8),
}

/// A queue item handed to the engine.
///
/// Duration is optional: nothing in this crate decodes audio, so callers
/// supply it when they know it and the engine substitutes a default when
/// they don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub path: PathBuf,
    pub duration_ms: Option<u64>,
}

impl TrackRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), duration_ms: None }
    }

    pub fn with_duration(path: impl Into<PathBuf>, duration_ms: u64) -> Self {
        Self { path: path.into(), duration_ms: Some(duration_ms) }
    }
}

/// The engine session handle as the controller sees it.
///
/// Commands are fire-and-forget; their outcome is observed through the
/// event stream, never as a return value. Accessors are synchronous
/// point-in-time reads and fail only when the session is not connected.
pub trait MediaSession: Send + Sync {
    fn connect(&self) -> Result<(), SessionError>;
    fn disconnect(&self);

    /// Replace the queue and position the engine at `start_index`, paused.
    fn set_queue(&self, items: Vec<TrackRef>, start_index: usize);
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn seek_to_ms(&self, position_ms: u64);
    fn next(&self);
    /// Move to the previous item if one exists, else restart the current one.
    fn previous(&self);

    fn is_playing(&self) -> Result<bool, SessionError>;
    fn position_ms(&self) -> Result<u64, SessionError>;
    fn duration_ms(&self) -> Result<u64, SessionError>;
    fn current_index(&self) -> Result<usize, SessionError>;
    fn has_next(&self) -> Result<bool, SessionError>;

    fn events(&self) -> broadcast::Receiver<SessionEvent>;
}
