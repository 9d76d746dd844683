use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use keyroll_core::{Editor, EditorConfig, Note, ScheduledNote};
use keyroll_services::{ManualClock, Player};

fn looping_editor() -> Arc<Mutex<Editor>> {
    let mut editor = Editor::new(EditorConfig {
        poll_interval_ms: 1,
        loop_end: 4,
        ..EditorConfig::default()
    });
    editor.store_mut().insert(Note::new(0, 60, 1, 100));
    editor.store_mut().insert(Note::new(2, 64, 1, 100));
    Arc::new(Mutex::new(editor))
}

#[test]
fn test_no_callbacks_after_stop_returns() {
    let clock = Arc::new(ManualClock::new(0.0));
    let count = Arc::new(AtomicUsize::new(0));
    let mut player = Player::new(looping_editor(), clock.clone());

    let seen = count.clone();
    player
        .start(Some(0), move |_: ScheduledNote| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    // Keep the worker busy emitting across several loop passes
    for _ in 0..10 {
        clock.advance(0.5);
        thread::sleep(Duration::from_millis(5));
    }
    player.stop().unwrap();
    let at_stop = count.load(Ordering::SeqCst);
    assert!(at_stop > 2);

    clock.advance(10.0);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), at_stop);
    assert!(player.playhead().is_none());
}

#[test]
fn test_restart_after_stop() {
    let clock = Arc::new(ManualClock::new(0.0));
    let editor = looping_editor();
    let mut player = Player::new(editor.clone(), clock.clone());
    let (tx, rx) = crossbeam_channel::unbounded();

    player.start(Some(0), keyroll_services::ChannelSink(tx.clone())).unwrap();
    player.stop().unwrap();
    while rx.try_recv().is_ok() {}

    clock.set(5.0);
    player.start(Some(2), keyroll_services::ChannelSink(tx)).unwrap();
    let note = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(note.pitch, 64);
    assert!((note.start - 5.1).abs() < 1e-9);
    player.stop().unwrap();
}
