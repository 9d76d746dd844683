//! Background playback worker
//!
//! A worker thread polls the look-ahead scheduler on a fixed period. Stopping
//! joins the worker, so once [`Player::stop`] returns no further notes reach
//! the sink. Start and stop are both idempotent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use keyroll_core::{Editor, NoteSink, PlaybackScheduler, ScheduledNote, SchedulerConfig};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Editor state lock poisoned")]
    Poisoned,
    #[error("Failed to spawn playback thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Forwards scheduled notes into a channel read by the audio collaborator
#[derive(Debug, Clone)]
pub struct ChannelSink(pub Sender<ScheduledNote>);

impl NoteSink for ChannelSink {
    fn note_on(&mut self, note: ScheduledNote) {
        if self.0.send(note).is_err() {
            debug!("note receiver dropped");
        }
    }
}

/// Shared playback state (lock-free reads from UI)
#[derive(Debug)]
pub struct PlayerState {
    running: AtomicBool,
    playhead_raw: AtomicU64,
}

impl PlayerState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            playhead_raw: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Interpolated playhead tick as of the last poll
    pub fn playhead(&self) -> f64 {
        f64::from_bits(self.playhead_raw.load(Ordering::Relaxed))
    }

    fn set_playhead(&self, tick: f64) {
        self.playhead_raw.store(tick.to_bits(), Ordering::Relaxed);
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives a [`PlaybackScheduler`] against a shared [`Editor`]
pub struct Player {
    editor: Arc<Mutex<Editor>>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    clock: Arc<dyn Clock>,
    state: Arc<PlayerState>,
    worker: Option<Worker>,
}

impl Player {
    pub fn new(editor: Arc<Mutex<Editor>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            editor,
            scheduler: Arc::new(Mutex::new(PlaybackScheduler::default())),
            clock,
            state: Arc::new(PlayerState::new()),
            worker: None,
        }
    }

    pub fn state(&self) -> Arc<PlayerState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Interpolated playhead at the clock's current time
    pub fn playhead(&self) -> Option<f64> {
        let scheduler = self.scheduler.lock().ok()?;
        scheduler.playhead(self.clock.now())
    }

    /// Start playback from `from` (the transport cursor when `None`),
    /// delivering notes to `sink`. While running this does nothing and `sink`
    /// is dropped.
    pub fn start<S>(&mut self, from: Option<u64>, mut sink: S) -> Result<(), PlayerError>
    where
        S: NoteSink + Send + 'static,
    {
        if self.worker.is_some() {
            debug!("playback already running");
            return Ok(());
        }

        let poll_interval = {
            let mut editor = lock(&self.editor)?;
            let mut scheduler = lock(&self.scheduler)?;
            scheduler.set_config(SchedulerConfig::from(editor.config()));
            let now = self.clock.now();
            editor.start_playback(&mut scheduler, now, from);
            editor.poll_playback(&mut scheduler, now, &mut sink);
            Duration::from_millis(editor.config().poll_interval_ms.max(1))
        };

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let editor = self.editor.clone();
        let scheduler = self.scheduler.clone();
        let clock = self.clock.clone();
        let state = self.state.clone();

        let handle = thread::Builder::new()
            .name("keyroll-playback".into())
            .spawn(move || {
                let ticker = tick(poll_interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let (Ok(mut editor), Ok(mut scheduler)) = (editor.lock(), scheduler.lock()) else {
                                warn!("playback state poisoned, worker exiting");
                                break;
                            };
                            let now = clock.now();
                            editor.poll_playback(&mut scheduler, now, &mut sink);
                            if let Some(tick) = scheduler.playhead(now) {
                                state.set_playhead(tick);
                            }
                        }
                    }
                }
            })?;

        self.state.running.store(true, Ordering::SeqCst);
        self.worker = Some(Worker { stop_tx, handle });
        info!(interval_ms = poll_interval.as_millis() as u64, "Playback started");
        Ok(())
    }

    /// Stop playback and wait for the worker to exit
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // The worker may already have exited on a poisoned lock
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            warn!("playback worker panicked");
        }

        lock(&self.scheduler)?.stop();
        self.state.running.store(false, Ordering::SeqCst);
        info!("Playback stopped");
        Ok(())
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, PlayerError> {
    m.lock().map_err(|_| PlayerError::Poisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crossbeam_channel::unbounded;
    use keyroll_core::{EditorConfig, Note};

    fn editor_with_note() -> Arc<Mutex<Editor>> {
        let mut editor = Editor::new(EditorConfig {
            poll_interval_ms: 1,
            ..EditorConfig::default()
        });
        editor.store_mut().insert(Note::new(0, 60, 4, 100));
        Arc::new(Mutex::new(editor))
    }

    #[test]
    fn test_start_emits_first_note() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut player = Player::new(editor_with_note(), clock);
        let (tx, rx) = unbounded();

        player.start(Some(0), ChannelSink(tx)).unwrap();
        let note = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(note.pitch, 60);
        assert!((note.start - 0.1).abs() < 1e-9);
        player.stop().unwrap();
    }

    #[test]
    fn test_start_twice_and_stop_twice() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut player = Player::new(editor_with_note(), clock);
        let (tx, rx) = unbounded();
        let (tx2, rx2) = unbounded();

        player.start(Some(0), ChannelSink(tx)).unwrap();
        player.start(Some(0), ChannelSink(tx2)).unwrap();
        assert!(player.is_running());
        assert_eq!(rx.try_iter().count(), 1);
        assert!(rx2.try_recv().is_err());

        player.stop().unwrap();
        player.stop().unwrap();
        assert!(!player.is_running());
    }

    #[test]
    fn test_worker_tracks_playhead() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut player = Player::new(editor_with_note(), clock.clone());
        let (tx, _rx) = unbounded();

        player.start(Some(0), ChannelSink(tx)).unwrap();
        clock.set(0.1 + 4.0 * 0.125);
        thread::sleep(Duration::from_millis(30));
        let state = player.state();
        assert!((state.playhead() - 4.0).abs() < 1e-6);
        player.stop().unwrap();
    }
}
