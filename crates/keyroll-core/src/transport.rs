//! Transport state: tempo, timebase and the loop/playhead markers

use serde::{Deserialize, Serialize};

/// Minimum distance between loop start and loop end
pub const MIN_LOOP_SPAN: u64 = 1;

/// Tempo, timebase and marker positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    /// Tempo in BPM
    pub bpm: f64,
    /// Ticks per whole note (four beats)
    pub timebase: u32,
    /// Loop start marker in ticks
    loop_start: u64,
    /// Loop end marker in ticks (always > loop_start)
    loop_end: u64,
    /// Playhead marker in ticks
    pub cursor: u64,
    /// Whether the playhead marker is shown (and hit-testable)
    pub show_cursor: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            timebase: 16,
            loop_start: 0,
            loop_end: 16,
            cursor: 0,
            show_cursor: true,
        }
    }
}

impl Transport {
    pub fn new(bpm: f64, timebase: u32) -> Self {
        Self {
            bpm: if bpm > 0.0 { bpm } else { 120.0 },
            timebase: timebase.max(1),
            ..Default::default()
        }
    }

    pub fn loop_start(&self) -> u64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> u64 {
        self.loop_end
    }

    /// Set both loop markers; an empty or inverted range is widened to the
    /// minimum span after `start`.
    pub fn set_loop(&mut self, start: u64, end: u64) {
        self.loop_start = start;
        self.loop_end = end.max(start + MIN_LOOP_SPAN);
    }

    /// Move loop start, pushing loop end right if needed
    pub fn set_loop_start(&mut self, tick: u64) {
        if self.loop_end <= tick {
            self.loop_end = tick + MIN_LOOP_SPAN;
        }
        self.loop_start = tick;
    }

    /// Move loop end (at least one tick), pushing loop start left if needed
    pub fn set_loop_end(&mut self, tick: u64) {
        let tick = tick.max(MIN_LOOP_SPAN);
        if self.loop_start >= tick {
            self.loop_start = tick - MIN_LOOP_SPAN;
        }
        self.loop_end = tick;
    }

    /// Move the playhead marker
    pub fn locate(&mut self, tick: u64) {
        self.cursor = tick;
    }

    /// Seconds per tick at the current tempo
    pub fn secs_per_tick(&self) -> f64 {
        4.0 * 60.0 / self.bpm / self.timebase as f64
    }

    /// Ticks per second at the current tempo
    pub fn ticks_per_sec(&self) -> f64 {
        1.0 / self.secs_per_tick()
    }

    /// Ticks per beat (quarter note)
    pub fn ticks_per_beat(&self) -> f64 {
        self.timebase as f64 / 4.0
    }

    /// Loop length in seconds
    pub fn loop_secs(&self) -> f64 {
        (self.loop_end - self.loop_start) as f64 * self.secs_per_tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_per_tick() {
        let transport = Transport::new(120.0, 16);
        assert!((transport.secs_per_tick() - 0.125).abs() < 1e-12);
        assert!((transport.loop_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_loop_start_pushes_end() {
        let mut transport = Transport::default();
        transport.set_loop(0, 8);
        transport.set_loop_start(10);
        assert_eq!(transport.loop_start(), 10);
        assert_eq!(transport.loop_end(), 11);
    }

    #[test]
    fn test_loop_end_pushes_start() {
        let mut transport = Transport::default();
        transport.set_loop(4, 8);
        transport.set_loop_end(2);
        assert_eq!(transport.loop_end(), 2);
        assert_eq!(transport.loop_start(), 1);
        transport.set_loop_end(0);
        assert_eq!(transport.loop_end(), 1);
        assert_eq!(transport.loop_start(), 0);
    }

    #[test]
    fn test_set_loop_enforces_span() {
        let mut transport = Transport::default();
        transport.set_loop(5, 5);
        assert_eq!((transport.loop_start(), transport.loop_end()), (5, 6));
    }
}
