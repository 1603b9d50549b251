//! In-process engine used by the demo binary and tests.
//!
//! Position advances by wall clock; nothing is decoded. Track transitions
//! come from an end-of-track watchdog task, so the session emits the same
//! event vocabulary a real engine would: buffering/ready on queue load,
//! playing-changed on transport commands, item-changed on auto-advance and
//! an ended state after the last item.

use super::clock::PlaybackClock;
use super::{MediaSession, SessionError, SessionEvent, TrackRef, phase_code};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Duration assumed for queue items that do not carry one.
pub const DEFAULT_TRACK_MS: u64 = 180_000;

struct Inner {
    connected: bool,
    queue: Vec<TrackRef>,
    index: usize,
    playing: bool,
    clock: PlaybackClock,
    watchdog: Option<CancellationToken>,
}

impl Inner {
    fn duration_ms(&self) -> u64 {
        self.queue
            .get(self.index)
            .map(|t| t.duration_ms.unwrap_or(DEFAULT_TRACK_MS))
            .unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        self.clock.estimate(self.playing).min(self.duration_ms())
    }

    fn disarm_watchdog(&mut self) {
        if let Some(token) = self.watchdog.take() {
            token.cancel();
        }
    }
}

pub struct SimulatedSession {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SimulatedSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                connected: false,
                queue: Vec::new(),
                index: 0,
                playing: false,
                clock: PlaybackClock::default(),
                watchdog: None,
            })),
            events,
        }
    }
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep out the rest of the current item, then advance or end.
fn arm_watchdog(state: &Arc<Mutex<Inner>>, events: &broadcast::Sender<SessionEvent>, inner: &mut Inner) {
    inner.disarm_watchdog();
    let token = CancellationToken::new();
    inner.watchdog = Some(token.clone());
    let remaining = inner.duration_ms().saturating_sub(inner.position_ms());
    let state = Arc::clone(state);
    let events = events.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(remaining)) => advance(&state, &events),
        }
    });
}

fn advance(state: &Arc<Mutex<Inner>>, events: &broadcast::Sender<SessionEvent>) {
    let mut inner = state.lock().unwrap();
    if !inner.connected || !inner.playing {
        return;
    }
    if inner.index + 1 < inner.queue.len() {
        inner.index += 1;
        inner.clock.reset(0);
        inner.clock.mark_playing();
        debug!(index = inner.index, "simulated engine advancing to next item");
        let _ = events.send(SessionEvent::ItemChanged { index: inner.index });
        arm_watchdog(state, events, &mut inner);
    } else {
        inner.playing = false;
        let end = inner.duration_ms();
        inner.clock.reset(end);
        debug!("simulated engine reached end of queue");
        let _ = events.send(SessionEvent::PlayingChanged(false));
        let _ = events.send(SessionEvent::StateChanged(phase_code::ENDED));
    }
}

impl MediaSession for SimulatedSession {
    fn connect(&self) -> Result<(), SessionError> {
        self.inner.lock().unwrap().connected = true;
        Ok(())
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.disarm_watchdog();
        inner.connected = false;
        inner.playing = false;
    }

    fn set_queue(&self, items: Vec<TrackRef>, start_index: usize) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || items.is_empty() || start_index >= items.len() {
            return;
        }
        inner.disarm_watchdog();
        inner.queue = items;
        inner.index = start_index;
        inner.playing = false;
        inner.clock.reset(0);
        let _ = self.events.send(SessionEvent::StateChanged(phase_code::BUFFERING));
        let _ = self.events.send(SessionEvent::StateChanged(phase_code::READY));
    }

    fn play(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || inner.queue.is_empty() || inner.playing {
            return;
        }
        // Resuming after the queue ended restarts the last item.
        let duration = inner.duration_ms();
        if duration > 0 && inner.position_ms() >= duration {
            inner.clock.reset(0);
        }
        inner.playing = true;
        inner.clock.mark_playing();
        let _ = self.events.send(SessionEvent::PlayingChanged(true));
        arm_watchdog(&self.inner, &self.events, &mut inner);
    }

    fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || !inner.playing {
            return;
        }
        inner.disarm_watchdog();
        inner.playing = false;
        inner.clock.mark_paused();
        let _ = self.events.send(SessionEvent::PlayingChanged(false));
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            return;
        }
        inner.disarm_watchdog();
        let was_playing = inner.playing;
        inner.playing = false;
        inner.clock.reset(0);
        if was_playing {
            let _ = self.events.send(SessionEvent::PlayingChanged(false));
        }
        let _ = self.events.send(SessionEvent::StateChanged(phase_code::IDLE));
    }

    fn seek_to_ms(&self, position_ms: u64) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || inner.queue.is_empty() {
            return;
        }
        let target = position_ms.min(inner.duration_ms());
        if inner.playing {
            inner.clock.set_position(target);
            arm_watchdog(&self.inner, &self.events, &mut inner);
        } else {
            inner.clock.reset(target);
        }
    }

    fn next(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || inner.index + 1 >= inner.queue.len() {
            return;
        }
        inner.index += 1;
        inner.clock.reset(0);
        if inner.playing {
            inner.clock.mark_playing();
            arm_watchdog(&self.inner, &self.events, &mut inner);
        }
        let _ = self.events.send(SessionEvent::ItemChanged { index: inner.index });
    }

    fn previous(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected || inner.queue.is_empty() {
            return;
        }
        if inner.index > 0 {
            inner.index -= 1;
            inner.clock.reset(0);
            if inner.playing {
                inner.clock.mark_playing();
                arm_watchdog(&self.inner, &self.events, &mut inner);
            }
            let _ = self.events.send(SessionEvent::ItemChanged { index: inner.index });
        } else {
            // No previous item: restart the current one.
            inner.clock.reset(0);
            if inner.playing {
                inner.clock.mark_playing();
                arm_watchdog(&self.inner, &self.events, &mut inner);
            }
        }
    }

    fn is_playing(&self) -> Result<bool, SessionError> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(SessionError::Disconnected);
        }
        Ok(inner.playing)
    }

    fn position_ms(&self) -> Result<u64, SessionError> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(SessionError::Disconnected);
        }
        Ok(inner.position_ms())
    }

    fn duration_ms(&self) -> Result<u64, SessionError> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(SessionError::Disconnected);
        }
        Ok(inner.duration_ms())
    }

    fn current_index(&self) -> Result<usize, SessionError> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(SessionError::Disconnected);
        }
        Ok(inner.index)
    }

    fn has_next(&self) -> Result<bool, SessionError> {
        let inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(SessionError::Disconnected);
        }
        Ok(inner.index + 1 < inner.queue.len())
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
