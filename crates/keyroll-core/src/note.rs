//! Note events

use serde::{Deserialize, Serialize};

/// Highest valid MIDI pitch
pub const MAX_PITCH: u8 = 127;
/// Latest tick a loaded note may end at
pub const MAX_TICK: u64 = u32::MAX as u64;

/// Stable identifier for a stored note. Allocated by the note store and never
/// persisted; gestures hold ids and resolve indices at each step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u64);

/// A single note event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub id: NoteId,
    /// Start position in ticks
    pub start_tick: u64,
    /// MIDI note number (0-127, 60 = middle C)
    pub pitch: u8,
    /// Duration in ticks, never below 1
    pub duration_ticks: u64,
    /// Velocity (1-127)
    pub velocity: u8,
    #[serde(default)]
    pub selected: bool,
}

impl Note {
    pub fn new(start_tick: u64, pitch: u8, duration_ticks: u64, velocity: u8) -> Self {
        Self {
            id: NoteId::default(),
            start_tick,
            pitch: pitch.min(MAX_PITCH),
            duration_ticks: duration_ticks.max(1),
            velocity: velocity.clamp(1, 127),
            selected: false,
        }
    }

    /// Builder-style selection flag
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// End tick (start + duration), exclusive
    pub fn end_tick(&self) -> u64 {
        self.start_tick.saturating_add(self.duration_ticks)
    }

    /// Half-open interval overlap test against `[start, end)`
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start_tick < end && self.end_tick() > start
    }

    /// Onset/pitch/duration equality, ignoring id, velocity and selection
    pub fn same_event(&self, other: &Note) -> bool {
        self.start_tick == other.start_tick
            && self.pitch == other.pitch
            && self.duration_ticks == other.duration_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_fields() {
        let note = Note::new(4, 200, 0, 0);
        assert_eq!(note.pitch, 127);
        assert_eq!(note.duration_ticks, 1);
        assert_eq!(note.velocity, 1);
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let note = Note::new(4, 60, 4, 100);
        assert!(note.overlaps(7, 9));
        assert!(!note.overlaps(8, 9));
        assert!(!note.overlaps(0, 4));
    }

    #[test]
    fn test_serialized_note_has_no_id() {
        let mut note = Note::new(0, 60, 2, 100);
        note.id = NoteId(42);
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("42"));
        assert!(!json.contains("id"));
    }
}
