//! The playback state store: single source of truth for what is playing.
//!
//! One event-loop task consumes the controller's normalized stream and
//! applies a deterministic transition per event, each one replacing the
//! snapshot wholesale. While playing, exactly one sampler task re-reads the
//! live position on a fixed cadence and patches only the progress fields.
//! Both writers go through the watch sender, whose internal lock serializes
//! every replace, so readers never see a torn snapshot.

use crate::controller::{PlaybackPhase, PlayerController, PlayerEvent};
use crate::library::MetadataResolver;
use crate::session::TrackRef;
use crate::state::{PlaybackSnapshot, format_clock, progress_percent};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Progress sampling cadence. A smoothness knob, not a correctness constant.
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

enum Control {
    Dispose,
}

pub struct PlaybackStateStore {
    controller: Arc<PlayerController>,
    snapshot_rx: watch::Receiver<PlaybackSnapshot>,
    control_tx: mpsc::Sender<Control>,
    event_loop: JoinHandle<()>,
    live_samplers: Arc<AtomicUsize>,
}

impl PlaybackStateStore {
    /// Take ownership of a freshly built controller, initialize it and start
    /// the event loop. Must run inside a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the controller's event stream was already taken.
    pub fn spawn(
        controller: PlayerController,
        resolver: Arc<dyn MetadataResolver>,
        tick: Duration,
    ) -> Self {
        controller.init();
        let events = controller
            .take_events()
            .expect("controller event stream already taken");
        let controller = Arc::new(controller);
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());
        let (control_tx, control_rx) = mpsc::channel(1);
        let live_samplers = Arc::new(AtomicUsize::new(0));
        let event_loop = EventLoop {
            controller: Arc::clone(&controller),
            resolver,
            snapshot: Arc::new(snapshot_tx),
            tick,
            sampler: None,
            live_samplers: Arc::clone(&live_samplers),
        };
        let event_loop = tokio::spawn(event_loop.run(events, control_rx));
        Self { controller, snapshot_rx, control_tx, event_loop, live_samplers }
    }

    /// Retry establishing the engine session after a failed spawn-time
    /// connection. Until it succeeds the store keeps reporting "stopped".
    pub fn init(&self) {
        self.controller.init();
    }

    /// Observable snapshot stream for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Point-in-time read of the current snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Number of live sampling tasks; never more than one.
    pub fn live_sampler_count(&self) -> usize {
        self.live_samplers.load(Ordering::SeqCst)
    }

    // Commands delegate to the controller and nothing else: every resulting
    // state change flows back through the event stream, keeping a single
    // write path into the snapshot.

    pub fn start_playback(&self, items: Vec<TrackRef>, start_index: usize) {
        self.controller.start_playback(items, start_index);
    }

    pub fn play_pause_toggle(&self) {
        self.controller.play_pause_toggle();
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn skip_next(&self) {
        self.controller.skip_next();
    }

    pub fn skip_previous(&self) {
        let elapsed_ms = self.controller.position_ms();
        self.controller.skip_previous(elapsed_ms);
    }

    pub fn seek_to_percent(&self, percent: f32) {
        self.controller.seek_to_percent(percent);
    }

    /// Tear down: cancel the sampler, then release the controller, then
    /// reset the snapshot to its default. Fully awaited.
    pub async fn dispose(self) {
        let _ = self.control_tx.send(Control::Dispose).await;
        if let Err(error) = self.event_loop.await
            && !error.is_cancelled()
        {
            warn!(%error, "store event loop ended abnormally");
        }
    }
}

struct EventLoop {
    controller: Arc<PlayerController>,
    resolver: Arc<dyn MetadataResolver>,
    snapshot: Arc<watch::Sender<PlaybackSnapshot>>,
    tick: Duration,
    sampler: Option<ProgressSampler>,
    live_samplers: Arc<AtomicUsize>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<PlayerEvent>,
        mut control: mpsc::Receiver<Control>,
    ) {
        loop {
            tokio::select! {
                // A Dispose message, or the store handle dropping without
                // one: tear down either way.
                _ = control.recv() => break,
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.apply(event).await,
                    // Controller released elsewhere; the stream is closed.
                    None => break,
                },
            }
        }
        self.teardown().await;
    }

    async fn apply(&mut self, event: PlayerEvent) {
        debug!(?event, "applying player event");
        match event {
            PlayerEvent::IsPlayingChanged(true) => {
                self.recompute_full(true);
                self.start_sampler().await;
            }
            PlayerEvent::IsPlayingChanged(false) => {
                self.recompute_full(false);
                self.stop_sampler().await;
            }
            PlayerEvent::TrackTransition => {
                // A transition implies continued playback of the next item.
                self.controller.resync_current_index();
                self.recompute_full(true);
            }
            PlayerEvent::PhaseChanged(PlaybackPhase::Idle) => {
                self.enter_stopped();
                self.stop_sampler().await;
            }
            PlayerEvent::PhaseChanged(PlaybackPhase::Buffering | PlaybackPhase::Ready) => {
                self.recompute_full(true);
                self.controller.resync_current_index();
            }
            PlayerEvent::PhaseChanged(PlaybackPhase::Ended) => {
                self.enter_stopped();
                self.stop_sampler().await;
            }
        }
    }

    /// Whole-snapshot rebuild from the controller. Any of these fields may
    /// have moved as a side effect of the event that got us here (a
    /// transition changes name and duration at once), so nothing is patched
    /// incrementally.
    fn recompute_full(&self, is_playing: bool) {
        let track_name = self.controller.current_track_name();
        let track_art_url = self
            .controller
            .current_track_path()
            .and_then(|path| self.resolver.art_locator(&path));
        let position_ms = self.controller.position_ms();
        let duration_ms = self.controller.duration_ms();
        let has_next = self.controller.has_next();
        self.snapshot.send_replace(PlaybackSnapshot {
            track_name,
            track_art_url,
            progress_percent: progress_percent(position_ms, duration_ms),
            progress_formatted: format_clock(position_ms),
            duration_formatted: format_clock(duration_ms),
            is_playing,
            stopped: false,
            has_next,
        });
    }

    /// Nothing track-specific survives a stop except whether a next item
    /// exists.
    fn enter_stopped(&self) {
        self.snapshot.send_replace(PlaybackSnapshot {
            has_next: self.controller.has_next(),
            ..PlaybackSnapshot::default()
        });
    }

    async fn start_sampler(&mut self) {
        // At most one sampler: cancel and await the old loop before the new
        // one exists, so two can never tick concurrently.
        self.stop_sampler().await;
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let controller = Arc::clone(&self.controller);
        let snapshot = Arc::clone(&self.snapshot);
        let live = Arc::clone(&self.live_samplers);
        let tick = self.tick;
        let handle = tokio::spawn(async move {
            let _live = LiveGuard::new(live);
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of an interval completes immediately; swallow
            // it so sampling starts one period from now.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => sample_progress(&controller, &snapshot),
                }
            }
        });
        debug!("progress sampler started");
        self.sampler = Some(ProgressSampler { token, handle });
    }

    async fn stop_sampler(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.cancel().await;
            debug!("progress sampler stopped");
        }
    }

    async fn teardown(&mut self) {
        self.stop_sampler().await;
        self.controller.release();
        self.snapshot.send_replace(PlaybackSnapshot::default());
    }
}

/// Tick-path update: only the progress fields move; track identity is left
/// untouched. The one place an incremental patch is correct, because
/// nothing else changes on a tick.
fn sample_progress(controller: &PlayerController, snapshot: &watch::Sender<PlaybackSnapshot>) {
    let position_ms = controller.position_ms();
    let duration_ms = controller.duration_ms();
    snapshot.send_modify(|snap| {
        snap.progress_percent = progress_percent(position_ms, duration_ms);
        snap.progress_formatted = format_clock(position_ms);
    });
}

/// Owned handle for the sampling loop: cancel is idempotent and completion
/// is awaited, so no tick can write after `cancel` returns.
struct ProgressSampler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressSampler {
    async fn cancel(self) {
        self.token.cancel();
        if let Err(error) = self.handle.await
            && !error.is_cancelled()
        {
            warn!(%error, "progress sampler ended abnormally");
        }
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
