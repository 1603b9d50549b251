//! Controller boundary behavior: command gating, argument validation,
//! normalization and release semantics.

mod helpers;

use helpers::{FakeReadings, FakeSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracksync::controller::{PlaybackPhase, PlayerController, PlayerEvent};
use tracksync::session::{MediaSession, SessionEvent, TrackRef, phase_code};

fn controller_over(fake: Arc<FakeSession>) -> PlayerController {
    let session: Arc<dyn MediaSession> = fake;
    let controller = PlayerController::with_session(session);
    controller.init();
    controller
}

async fn next_event(rx: &mut mpsc::Receiver<PlayerEvent>) -> Option<PlayerEvent> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a normalized event")
}

#[tokio::test]
async fn out_of_range_start_index_is_a_no_op() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());

    controller.start_playback(vec![TrackRef::new("a.mp3")], 5);
    controller.start_playback(vec![], 0);

    assert!(fake.calls().is_empty(), "nothing may reach the engine: {:?}", fake.calls());
    assert_eq!(controller.current_track_name(), "");
}

#[tokio::test]
async fn start_playback_loads_queue_then_plays() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());

    controller.start_playback(
        vec![TrackRef::new("a.mp3"), TrackRef::new("b.mp3")],
        1,
    );

    assert_eq!(fake.calls(), vec!["set_queue:2:1", "play"]);
    assert_eq!(controller.current_track_name(), "b");
    assert_eq!(
        controller.current_track_path(),
        Some(std::path::PathBuf::from("b.mp3"))
    );
}

#[tokio::test]
async fn toggle_follows_the_engine_state() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());

    controller.play_pause_toggle();
    fake.set_readings(FakeReadings { playing: true, ..FakeReadings::default() });
    controller.play_pause_toggle();

    assert_eq!(fake.calls(), vec!["play", "pause"]);
}

#[tokio::test]
async fn seek_percent_is_validated_and_translated() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());
    fake.set_readings(FakeReadings { duration_ms: 200_000, ..FakeReadings::default() });

    controller.seek_to_percent(-1.0);
    controller.seek_to_percent(100.5);
    assert!(fake.calls().is_empty(), "out-of-range seeks must not reach the engine");

    controller.seek_to_percent(50.0);
    controller.seek_to_percent(0.0);
    assert_eq!(fake.calls(), vec!["seek:100000", "seek:0"]);
}

#[tokio::test]
async fn skip_previous_restarts_or_steps_back() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());

    controller.skip_previous(3_000);
    controller.skip_previous(0);

    assert_eq!(fake.calls(), vec!["seek:0", "previous"]);
}

#[tokio::test]
async fn refused_connection_degrades_to_no_ops() {
    let fake = FakeSession::refusing();
    let session: Arc<dyn MediaSession> = fake.clone();
    let controller = PlayerController::with_session(session);
    controller.init();

    controller.start_playback(vec![TrackRef::new("a.mp3")], 0);
    controller.play_pause_toggle();
    controller.stop();
    controller.skip_next();
    controller.seek_to_percent(50.0);

    assert!(fake.calls().is_empty());
    assert!(!controller.is_playing());
    assert_eq!(controller.position_ms(), 0);
    assert_eq!(controller.duration_ms(), 0);
    assert!(!controller.has_next());
    assert_eq!(controller.current_track_name(), "");
}

#[tokio::test]
async fn unknown_state_codes_never_reach_the_store() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());
    let mut events = controller.take_events().expect("first take");

    fake.emit(SessionEvent::StateChanged(42));
    fake.emit(SessionEvent::StateChanged(phase_code::READY));

    assert_eq!(
        next_event(&mut events).await,
        Some(PlayerEvent::PhaseChanged(PlaybackPhase::Ready)),
        "the unknown code must be dropped, not forwarded"
    );
}

#[tokio::test]
async fn item_changes_normalize_to_bare_transitions() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());
    let mut events = controller.take_events().expect("first take");

    controller.start_playback(vec![TrackRef::new("a.mp3"), TrackRef::new("b.mp3")], 0);
    fake.emit(SessionEvent::ItemChanged { index: 1 });
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::TrackTransition));

    // The queue pointer moves on resync, not on the event payload.
    assert_eq!(controller.current_track_name(), "a");
    fake.set_readings(FakeReadings { index: 1, ..FakeReadings::default() });
    controller.resync_current_index();
    assert_eq!(controller.current_track_name(), "b");
}

#[tokio::test]
async fn release_closes_the_stream_and_gates_commands() {
    let fake = FakeSession::new();
    let controller = controller_over(fake.clone());
    let mut events = controller.take_events().expect("first take");
    assert!(controller.take_events().is_none(), "single consumer only");

    fake.emit(SessionEvent::PlayingChanged(true));
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::IsPlayingChanged(true)));

    controller.release();
    assert_eq!(next_event(&mut events).await, None, "stream must close on release");
    assert!(fake.calls().contains(&"disconnect".to_string()));

    let calls_after_release = fake.calls().len();
    controller.play_pause_toggle();
    controller.stop();
    assert_eq!(fake.calls().len(), calls_after_release, "commands after release must be no-ops");
}
