//! Look-ahead playback scheduler
//!
//! The scheduler is clock-agnostic: callers pass the current time in seconds on
//! every call. Each [`PlaybackScheduler::poll`] walks the note sequence forward
//! until the scheduling cursor is more than the preload window ahead of `now`,
//! emitting every note onset it passes and wrapping at the loop end. Every
//! position the cursor reaches is recorded as a `(time, tick, rate)`
//! breakpoint; the displayed playhead interpolates between breakpoints, so its
//! motion is independent of the poll cadence.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::config::EditorConfig;
use crate::note::Note;
use crate::transport::Transport;

/// Default look-ahead window in seconds
pub const PRELOAD_SECS: f64 = 1.0;
/// Delay between `start` and the first scheduled onset
pub const START_DELAY_SECS: f64 = 0.1;
/// Default poll period in milliseconds
pub const POLL_INTERVAL_MS: u64 = 25;

/// A note-on handed to the audio collaborator. Times are absolute seconds on
/// the caller's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub start: f64,
    pub end: f64,
    pub pitch: u8,
    pub velocity: u8,
}

/// Receiver of scheduled notes
pub trait NoteSink {
    fn note_on(&mut self, note: ScheduledNote);
}

impl<F: FnMut(ScheduledNote)> NoteSink for F {
    fn note_on(&mut self, note: ScheduledNote) {
        self(note)
    }
}

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub preload_secs: f64,
    pub start_delay_secs: f64,
    /// Fraction of each note's written length that is played
    pub note_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            preload_secs: PRELOAD_SECS,
            start_delay_secs: START_DELAY_SECS,
            note_ratio: 1.0,
        }
    }
}

impl From<&EditorConfig> for SchedulerConfig {
    fn from(config: &EditorConfig) -> Self {
        Self {
            preload_secs: config.preload_secs.max(0.0),
            start_delay_secs: START_DELAY_SECS,
            note_ratio: if config.edit_mode.is_grid() {
                config.grid_note_ratio.clamp(0.0, 1.0)
            } else {
                1.0
            },
        }
    }
}

/// Playhead history entry: at `time` the playhead is at `tick` and advances at
/// `rate` ticks per second
#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time: f64,
    tick: f64,
    rate: f64,
}

/// Look-ahead scheduler state
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    config: SchedulerConfig,
    running: bool,
    history: VecDeque<Breakpoint>,
    /// Tick the scheduling cursor sits on
    next_tick: u64,
    /// Wall time at which `next_tick` sounds
    next_time: f64,
    /// Onsets at `next_tick` already emitted
    emitted_here: usize,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl PlaybackScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            running: false,
            history: VecDeque::new(),
            next_tick: 0,
            next_time: 0.0,
            emitted_here: 0,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Takes effect for onsets scheduled after the call
    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start scheduling from `tick` (the transport cursor when `None`). The
    /// first onset sounds after the start delay. Returns false, changing
    /// nothing, if already running.
    pub fn start(&mut self, now: f64, tick: Option<u64>, transport: &mut Transport) -> bool {
        if self.running {
            return false;
        }
        if let Some(tick) = tick {
            transport.locate(tick);
        }
        let tick = transport.cursor;
        let first = now + self.config.start_delay_secs;

        self.history.clear();
        self.history.push_back(Breakpoint {
            time: now,
            tick: tick as f64,
            rate: 0.0,
        });
        self.history.push_back(Breakpoint {
            time: first,
            tick: tick as f64,
            rate: transport.ticks_per_sec(),
        });
        self.next_tick = tick;
        self.next_time = first;
        self.emitted_here = 0;
        self.running = true;

        if tick >= transport.loop_end() {
            self.wrap(transport);
        }
        debug!(tick, bpm = transport.bpm, "playback started");
        true
    }

    /// Stop scheduling. Idempotent; nothing is emitted until the next start.
    pub fn stop(&mut self) {
        if self.running {
            debug!(tick = self.next_tick, "playback stopped");
        }
        self.running = false;
        self.history.clear();
    }

    /// Interpolated playhead tick at `now`, or `None` when stopped
    pub fn playhead(&self, now: f64) -> Option<f64> {
        if !self.running {
            return None;
        }
        let bp = self
            .history
            .iter()
            .rev()
            .find(|bp| bp.time <= now)
            .or_else(|| self.history.front())?;
        Some(bp.tick + (now - bp.time).max(0.0) * bp.rate)
    }

    /// Advance the schedule to `now + preload`, emitting every onset passed to
    /// `sink`, and write the floored playhead back to the transport cursor.
    /// Returns the number of notes emitted.
    pub fn poll(&mut self, now: f64, notes: &[Note], transport: &mut Transport, sink: &mut impl NoteSink) -> usize {
        if !self.running {
            return 0;
        }
        while self.history.len() > 1 && self.history[1].time <= now {
            self.history.pop_front();
        }
        if let Some(tick) = self.playhead(now) {
            transport.cursor = tick.max(0.0).floor() as u64;
        }

        let secs_per_tick = transport.secs_per_tick();
        if !(secs_per_tick.is_finite() && secs_per_tick > 0.0) {
            return 0;
        }
        let loop_end = transport.loop_end();
        let mut emitted = 0;

        while self.next_time <= now + self.config.preload_secs {
            let here = notes
                .iter()
                .filter(|n| n.start_tick == self.next_tick && n.start_tick < loop_end)
                .nth(self.emitted_here);
            if let Some(note) = here {
                let length = (note.end_tick().min(loop_end) - note.start_tick) as f64 * self.config.note_ratio;
                sink.note_on(ScheduledNote {
                    start: self.next_time,
                    end: self.next_time + length * secs_per_tick,
                    pitch: note.pitch,
                    velocity: note.velocity,
                });
                self.emitted_here += 1;
                emitted += 1;
                continue;
            }

            let next = notes
                .iter()
                .filter(|n| n.start_tick > self.next_tick && n.start_tick < loop_end)
                .map(|n| n.start_tick)
                .min();
            match next {
                Some(tick) => {
                    self.next_time += (tick - self.next_tick) as f64 * secs_per_tick;
                    self.next_tick = tick;
                    self.emitted_here = 0;
                    self.history.push_back(Breakpoint {
                        time: self.next_time,
                        tick: tick as f64,
                        rate: 1.0 / secs_per_tick,
                    });
                }
                None => {
                    self.next_time += loop_end.saturating_sub(self.next_tick) as f64 * secs_per_tick;
                    self.wrap(transport);
                }
            }
        }
        emitted
    }

    /// Jump the scheduling cursor to loop start at the current `next_time`
    fn wrap(&mut self, transport: &Transport) {
        let tick = transport.loop_start();
        self.next_tick = tick;
        self.emitted_here = 0;
        self.history.push_back(Breakpoint {
            time: self.next_time,
            tick: tick as f64,
            rate: transport.ticks_per_sec(),
        });
        trace!(time = self.next_time, tick, "loop wrap");
    }
}
