//! Command façade over the engine session.
//!
//! Translates the engine's raw callback vocabulary into a single ordered
//! stream of normalized [`PlayerEvent`]s consumed by the state store, and
//! gates every command on an explicit connected/disconnected link so a
//! missing engine degrades to silent no-ops instead of a crash.

use crate::session::{MediaSession, SessionError, SessionEvent, TrackRef, phase_code};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Normalized player events. Closed set, consumed exactly once by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    IsPlayingChanged(bool),
    TrackTransition,
    PhaseChanged(PlaybackPhase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Maybe-connected engine handle. Degraded mode is a typed state, not a
/// nullable field checked ad hoc at each call site.
enum Link {
    Disconnected,
    Connected(Arc<dyn MediaSession>),
}

/// Produces the engine session handle when the controller initializes.
pub type SessionConnector =
    Box<dyn Fn() -> Result<Arc<dyn MediaSession>, SessionError> + Send + Sync>;

#[derive(Default)]
struct QueueState {
    items: Vec<TrackRef>,
    index: usize,
}

struct Shared {
    connector: SessionConnector,
    link: Mutex<Link>,
    queue: Mutex<QueueState>,
    event_tx: Mutex<Option<mpsc::Sender<PlayerEvent>>>,
    forwarder: Mutex<Option<CancellationToken>>,
}

pub struct PlayerController {
    shared: Arc<Shared>,
    event_rx: Mutex<Option<mpsc::Receiver<PlayerEvent>>>,
}

impl PlayerController {
    pub fn new(connector: SessionConnector) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                connector,
                link: Mutex::new(Link::Disconnected),
                queue: Mutex::new(QueueState::default()),
                event_tx: Mutex::new(Some(event_tx)),
                forwarder: Mutex::new(None),
            }),
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Convenience for engine sessions that already exist in-process.
    pub fn with_session(session: Arc<dyn MediaSession>) -> Self {
        Self::new(Box::new(move || Ok(Arc::clone(&session))))
    }

    /// Establish the engine session. Idempotent per controller lifetime; a
    /// failed connection leaves the controller disconnected and every
    /// command a no-op until `init` is retried.
    pub fn init(&self) {
        let mut link = self.shared.link.lock().unwrap();
        if matches!(*link, Link::Connected(_)) {
            return;
        }
        match (self.shared.connector)() {
            Ok(session) => {
                if let Err(error) = session.connect() {
                    warn!(%error, "engine session refused connection; staying disconnected");
                    return;
                }
                spawn_forwarder(&self.shared, &session);
                *link = Link::Connected(session);
            }
            Err(error) => {
                warn!(%error, "could not reach engine session; commands will be no-ops");
            }
        }
    }

    /// Disconnect from the engine. Afterwards commands are no-ops and the
    /// normalized event stream is closed.
    pub fn release(&self) {
        if let Some(token) = self.shared.forwarder.lock().unwrap().take() {
            token.cancel();
        }
        self.shared.event_tx.lock().unwrap().take();
        let mut link = self.shared.link.lock().unwrap();
        if let Link::Connected(session) = std::mem::replace(&mut *link, Link::Disconnected) {
            session.disconnect();
        }
    }

    /// The normalized event stream. Yields `None` once, to its single
    /// consumer; the stream itself closes when the controller is released.
    pub fn take_events(&self) -> Option<mpsc::Receiver<PlayerEvent>> {
        self.event_rx.lock().unwrap().take()
    }

    /// Replace the queue and start playback at `start_index`. An
    /// out-of-range index is rejected here and never reaches the engine;
    /// no event is synthesized for the rejection.
    pub fn start_playback(&self, items: Vec<TrackRef>, start_index: usize) {
        if items.is_empty() || start_index >= items.len() {
            warn!(start_index, len = items.len(), "rejecting start_playback with out-of-range index");
            return;
        }
        let Some(session) = self.session() else {
            debug!("start_playback ignored: disconnected");
            return;
        };
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.items = items.clone();
            queue.index = start_index;
        }
        session.set_queue(items, start_index);
        session.play();
    }

    pub fn play_pause_toggle(&self) {
        let Some(session) = self.session() else { return };
        if session.is_playing().unwrap_or(false) {
            session.pause();
        } else {
            session.play();
        }
    }

    pub fn stop(&self) {
        if let Some(session) = self.session() {
            session.stop();
        }
    }

    pub fn skip_next(&self) {
        if let Some(session) = self.session() {
            session.next();
        }
    }

    /// Restart the current item when some of it has already played,
    /// otherwise step back through the queue.
    pub fn skip_previous(&self, elapsed_ms: u64) {
        let Some(session) = self.session() else { return };
        if elapsed_ms > 0 {
            session.seek_to_ms(0);
        } else {
            session.previous();
        }
    }

    /// Translate a 0-100 position into an absolute seek against the current
    /// duration. Out-of-range values are rejected at this boundary.
    pub fn seek_to_percent(&self, percent: f32) {
        if !(0.0..=100.0).contains(&percent) {
            warn!(percent, "rejecting out-of-range seek");
            return;
        }
        let Some(session) = self.session() else { return };
        let duration = session.duration_ms().unwrap_or(0);
        let target = ((duration as f64) * (percent as f64) / 100.0).round() as u64;
        session.seek_to_ms(target);
    }

    pub fn is_playing(&self) -> bool {
        self.session().and_then(|s| s.is_playing().ok()).unwrap_or(false)
    }

    pub fn position_ms(&self) -> u64 {
        self.session().and_then(|s| s.position_ms().ok()).unwrap_or(0)
    }

    pub fn duration_ms(&self) -> u64 {
        self.session().and_then(|s| s.duration_ms().ok()).unwrap_or(0)
    }

    pub fn has_next(&self) -> bool {
        self.session().and_then(|s| s.has_next().ok()).unwrap_or(false)
    }

    /// Display name of the current queue item: its file stem.
    pub fn current_track_name(&self) -> String {
        let queue = self.shared.queue.lock().unwrap();
        queue
            .items
            .get(queue.index)
            .and_then(|t| t.path.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn current_track_path(&self) -> Option<PathBuf> {
        let queue = self.shared.queue.lock().unwrap();
        queue.items.get(queue.index).map(|t| t.path.clone())
    }

    /// Re-read the engine's current item index into the controller's queue
    /// pointer. Called by the store after a transition, when the engine is
    /// the only party that knows where the queue actually is.
    pub fn resync_current_index(&self) {
        let Some(session) = self.session() else { return };
        if let Ok(index) = session.current_index() {
            self.shared.queue.lock().unwrap().index = index;
        }
    }

    fn session(&self) -> Option<Arc<dyn MediaSession>> {
        match &*self.shared.link.lock().unwrap() {
            Link::Connected(session) => Some(Arc::clone(session)),
            Link::Disconnected => None,
        }
    }
}

/// Map one raw engine event to the normalized set. Unknown state codes are
/// dropped rather than forwarded.
fn normalize(event: &SessionEvent) -> Option<PlayerEvent> {
    match event {
        SessionEvent::PlayingChanged(playing) => Some(PlayerEvent::IsPlayingChanged(*playing)),
        SessionEvent::ItemChanged { .. } => Some(PlayerEvent::TrackTransition),
        SessionEvent::StateChanged(code) => phase_from_code(*code).map(PlayerEvent::PhaseChanged),
    }
}

fn phase_from_code(code: u8) -> Option<PlaybackPhase> {
    match code {
        phase_code::IDLE => Some(PlaybackPhase::Idle),
        phase_code::BUFFERING => Some(PlaybackPhase::Buffering),
        phase_code::READY => Some(PlaybackPhase::Ready),
        phase_code::ENDED => Some(PlaybackPhase::Ended),
        other => {
            debug!(code = other, "dropping unknown engine state code");
            None
        }
    }
}

fn spawn_forwarder(shared: &Shared, session: &Arc<dyn MediaSession>) {
    let Some(tx) = shared.event_tx.lock().unwrap().clone() else {
        return;
    };
    let token = CancellationToken::new();
    *shared.forwarder.lock().unwrap() = Some(token.clone());
    // Subscribe before the task starts so no event emitted after `init`
    // returns can be missed.
    let mut raw = session.events();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                received = raw.recv() => match received {
                    Ok(event) => {
                        if let Some(normalized) = normalize(&event)
                            && tx.send(normalized).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "engine event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}
