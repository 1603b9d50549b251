//! Shared fakes and wait utilities for the integration suites.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracksync::controller::PlayerController;
use tracksync::library::MetadataResolver;
use tracksync::session::{MediaSession, SessionError, SessionEvent, TrackRef};
use tracksync::state::PlaybackSnapshot;
use tracksync::store::PlaybackStateStore;

/// What the fake engine currently claims over its accessor surface.
#[derive(Debug, Clone, Default)]
pub struct FakeReadings {
    pub playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub index: usize,
    pub has_next: bool,
}

/// Scripted engine: tests push raw events and set accessor readings by
/// hand. Commands and position reads are recorded in order, so tests can
/// assert things like "nothing read the position after disconnect".
pub struct FakeSession {
    readings: Mutex<FakeReadings>,
    refuse_connect: bool,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<SessionEvent>,
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            readings: Mutex::new(FakeReadings::default()),
            refuse_connect: false,
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    /// A session whose `connect` always fails, for degraded-mode tests.
    pub fn refusing() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            readings: Mutex::new(FakeReadings::default()),
            refuse_connect: true,
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_readings(&self, readings: FakeReadings) {
        *self.readings.lock().unwrap() = readings;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl MediaSession for FakeSession {
    fn connect(&self) -> Result<(), SessionError> {
        if self.refuse_connect {
            return Err(SessionError::Connect("refused by test".into()));
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.record("disconnect");
    }

    fn set_queue(&self, items: Vec<TrackRef>, start_index: usize) {
        self.record(format!("set_queue:{}:{}", items.len(), start_index));
    }

    fn play(&self) {
        self.record("play");
    }

    fn pause(&self) {
        self.record("pause");
    }

    fn stop(&self) {
        self.record("stop");
    }

    fn seek_to_ms(&self, position_ms: u64) {
        self.record(format!("seek:{position_ms}"));
    }

    fn next(&self) {
        self.record("next");
    }

    fn previous(&self) {
        self.record("previous");
    }

    fn is_playing(&self) -> Result<bool, SessionError> {
        Ok(self.readings.lock().unwrap().playing)
    }

    fn position_ms(&self) -> Result<u64, SessionError> {
        self.record("read_position");
        Ok(self.readings.lock().unwrap().position_ms)
    }

    fn duration_ms(&self) -> Result<u64, SessionError> {
        Ok(self.readings.lock().unwrap().duration_ms)
    }

    fn current_index(&self) -> Result<usize, SessionError> {
        Ok(self.readings.lock().unwrap().index)
    }

    fn has_next(&self) -> Result<bool, SessionError> {
        Ok(self.readings.lock().unwrap().has_next)
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Resolver with a fixed artwork answer.
pub struct StaticResolver(pub Option<String>);

impl MetadataResolver for StaticResolver {
    fn display_name(&self, path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn art_locator(&self, _path: &Path) -> Option<String> {
        self.0.clone()
    }
}

/// Build a store over a fake session with the given sampling interval.
pub fn store_over(session: Arc<FakeSession>, tick: Duration) -> PlaybackStateStore {
    let session: Arc<dyn MediaSession> = session;
    PlaybackStateStore::spawn(
        PlayerController::with_session(session),
        Arc::new(StaticResolver(None)),
        tick,
    )
}

/// Wait until the snapshot stream yields a value matching `pred`.
pub async fn wait_for_snapshot<F>(
    rx: &mut watch::Receiver<PlaybackSnapshot>,
    mut pred: F,
) -> PlaybackSnapshot
where
    F: FnMut(&PlaybackSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let snap = rx.borrow_and_update().clone();
                if pred(&snap) {
                    return snap;
                }
            }
            rx.changed()
                .await
                .expect("snapshot stream closed before condition was met");
        }
    })
    .await
    .expect("timed out waiting for snapshot condition")
}

/// Poll a condition until it holds or two seconds pass.
pub async fn wait_until<F>(mut cond: F, what: &str)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
