//! Sync loop scenarios: change detection, render dedup, failure and retry.

use chrono::Duration as ChronoDuration;
use tagsync::color::Rgb;
use tagsync::device::mock::MockSink;
use tagsync::error::TagError;
use tagsync::render::ArtworkCompositor;
use tagsync::snapshot::{PollOutcome, TrackSnapshot, has_changed};
use tagsync::source::mock::ScriptedSource;
use tagsync::sync::{SyncLoop, SyncSettings, TickOutcome};

use crate::common::fixtures::{solid, track};
use crate::common::init_test_logging;

type TestLoop = SyncLoop<ScriptedSource, ArtworkCompositor, MockSink>;

fn new_loop() -> (ScriptedSource, TestLoop) {
    init_test_logging();
    let source = ScriptedSource::new();
    let sync = SyncLoop::new(
        source.clone(),
        ArtworkCompositor::default(),
        MockSink::new(),
        SyncSettings::default(),
    );
    (source, sync)
}

#[test]
fn comparator_properties() {
    let a = track("t1", solid([1, 2, 3], 4), true);
    assert!(has_changed(None, &a));
    assert!(!has_changed(Some(&a), &a));

    let mut later = a.clone();
    later.fetched_at = a.fetched_at + ChronoDuration::seconds(30);
    later.title = "Renamed".into();
    later.artist = "Someone Else".into();
    assert!(!has_changed(Some(&a), &later));
}

#[tokio::test]
async fn unchanged_snapshot_never_writes() {
    let (source, mut sync) = new_loop();
    source.push_track(track("t1", solid([255, 0, 0], 32), true));
    sync.tick().await.unwrap();
    sync.sink().clear_writes();

    for _ in 0..5 {
        assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Unchanged));
    }
    sync.sink().assert_no_writes();
    assert_eq!(sync.sink().attempt_count(), 0);
}

#[tokio::test]
async fn identical_render_with_new_track_id_writes_once() {
    let (source, mut sync) = new_loop();
    source.push_track(track("a", solid([0, 90, 200], 32), true));
    source.push_track(track("b", solid([0, 90, 200], 32), true));

    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Deduplicated));
    assert_eq!(sync.sink().write_count(), 1);

    // The in-memory snapshot moved on, so "b" is now unchanged.
    assert_eq!(sync.state().last_snapshot().unwrap().track_id, "b");
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Unchanged));
}

#[tokio::test]
async fn pausing_with_identical_render_still_writes() {
    let (source, mut sync) = new_loop();
    source.push_track(track("t1", solid([0, 90, 200], 32), true));
    source.push_track(track("t1", solid([0, 90, 200], 32), false));

    sync.tick().await.unwrap();
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert_eq!(sync.sink().write_count(), 2);
    assert!(!sync.sink().last_write().unwrap().is_playing);
}

#[tokio::test]
async fn resuming_after_pause_writes_playing_state() {
    let (source, mut sync) = new_loop();
    let art = solid([0, 90, 200], 32);
    source.push_track(track("t1", art.clone(), true));
    source.push_track(track("t1", art.clone(), false));
    source.push_track(track("t1", art, true));

    sync.tick().await.unwrap();
    sync.tick().await.unwrap();
    assert!(!sync.sink().last_write().unwrap().is_playing);

    // Same render as the paused write, but the device still shows paused.
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert_eq!(sync.sink().write_count(), 3);
    assert!(sync.sink().last_write().unwrap().is_playing);
    assert!(sync.state().last_snapshot().unwrap().is_playing);
}

#[tokio::test]
async fn red_track_end_to_end() {
    let (source, mut sync) = new_loop();
    let red = solid([255, 0, 0], 64);

    // First sighting: one write, red LEDs.
    source.push_track(track("t1", red.clone(), true));
    let outcome = sync.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::Written { color } if color == Rgb::new(255, 0, 0)));
    assert_eq!(sync.sink().write_count(), 1);
    assert_eq!(sync.state().last_color(), Some(Rgb::new(255, 0, 0)));
    assert_eq!(sync.state().summary().color.as_deref(), Some("#FF0000"));

    // Same snapshot again: nothing.
    source.push_track(track("t1", red.clone(), true));
    sync.tick().await.unwrap();
    assert_eq!(sync.sink().write_count(), 1);

    // Paused: one write, same color.
    source.push_track(track("t1", red.clone(), false));
    sync.tick().await.unwrap();
    assert_eq!(sync.sink().write_count(), 2);
    let paused = sync.sink().last_write().unwrap();
    assert!(!paused.is_playing);
    assert_eq!(paused.hex_color, "FF0000");

    // Track change while the device is unplugged: state stays put.
    let before = sync.state().summary();
    sync.sink().inject_error(TagError::SinkWrite {
        path: "mock".into(),
        reason: "volume unmounted".into(),
    });
    source.push_track(track("t2", solid([0, 200, 0], 64), true));
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::WriteFailed(_)));
    assert_eq!(sync.state().summary(), before);
    assert_eq!(sync.sink().write_count(), 2);

    // Next tick sees the same snapshot and completes the update.
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
    assert_eq!(sync.sink().write_count(), 3);
    assert_eq!(sync.state().last_snapshot().unwrap().track_id, "t2");
    assert_eq!(sync.state().last_color(), Some(Rgb::new(0, 200, 0)));

    let stats = sync.stats();
    assert_eq!((stats.ticks, stats.writes, stats.failures), (5, 3, 1));
}

#[tokio::test]
async fn fetch_errors_are_skipped() {
    let (source, mut sync) = new_loop();
    source.push(Err(TagError::Fetch("connection reset".into())));
    source.push(Err(TagError::Unauthorized));
    source.push_track(track("t1", solid([9, 9, 200], 16), true));

    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::FetchFailed(_)));
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::FetchFailed(_)));
    assert!(sync.state().is_empty());
    assert!(matches!(sync.tick().await.unwrap(), TickOutcome::Written { .. }));
}

#[tokio::test]
async fn nothing_playing_is_a_paused_empty_snapshot() {
    let (source, mut sync) = new_loop();
    source.push(Ok(PollOutcome::NoTrackPlaying));

    let outcome = sync.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::Written { .. }));
    let write = sync.sink().last_write().unwrap();
    assert!(!write.is_playing);
    // Nothing to extract from: the black canvas gives black.
    assert_eq!(write.hex_color, "000000");

    let snapshot: &TrackSnapshot = sync.state().last_snapshot().unwrap();
    assert!(!snapshot.has_artwork());
}
