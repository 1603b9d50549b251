//! Playback-state synchronization core for a folder-based music player.
//!
//! A [`PlaybackStateStore`] owns one observable snapshot of "what is
//! playing, how far, what comes next" and keeps it consistent while
//! asynchronous engine events and a periodic progress sampler compete to
//! update it. The engine sits behind the [`MediaSession`] trait; the crate
//! ships a simulated engine plus the library plumbing (folder scan,
//! persisted index, artwork lookup) around the core.

pub mod controller;
pub mod library;
pub mod session;
pub mod state;
pub mod store;

pub use controller::{PlaybackPhase, PlayerController, PlayerEvent};
pub use library::MetadataResolver;
pub use session::{MediaSession, SessionError, SessionEvent, TrackRef};
pub use state::PlaybackSnapshot;
pub use store::PlaybackStateStore;
