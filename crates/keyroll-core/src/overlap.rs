//! Overlap truncation for monophonic (drum) tracks
//!
//! Two passes run after every structural change when monophonic enforcement is
//! on: [`apply_overlap_rules`] resolves conflicts around the notes that were
//! just placed, then [`truncate_overlaps`] walks each pitch row once. This is a
//! single pass, not a fixpoint.

use std::collections::BTreeMap;

use crate::note::{Note, NoteId};

/// Sort notes ascending by start tick (stable, tie order preserved)
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by_key(|n| n.start_tick);
}

/// Resolve conflicts against freshly placed notes. Any other note on the same
/// pitch overlapping an active note is deleted when it starts at or after the
/// active note, otherwise truncated to end where the active note starts.
pub fn apply_overlap_rules(notes: &mut Vec<Note>, active: &[NoteId]) {
    for &id in active {
        let Some(placed) = notes.iter().find(|n| n.id == id).copied() else {
            continue;
        };
        let (start, end) = (placed.start_tick, placed.end_tick());

        for i in (0..notes.len()).rev() {
            let other = &mut notes[i];
            if other.id == id || other.pitch != placed.pitch || !other.overlaps(start, end) {
                continue;
            }
            if other.start_tick >= start {
                notes.remove(i);
            } else {
                other.duration_ticks = start - other.start_tick;
            }
        }
    }
    sort_notes(notes);
}

/// Walk each pitch row in start order and cut every note at the next onset on
/// the same row. Notes left with no length are dropped.
pub fn truncate_overlaps(notes: &mut Vec<Note>) {
    let mut rows: BTreeMap<u8, Vec<Note>> = BTreeMap::new();
    for note in notes.drain(..) {
        rows.entry(note.pitch).or_default().push(note);
    }

    for mut row in rows.into_values() {
        sort_notes(&mut row);
        for i in 0..row.len().saturating_sub(1) {
            let next_start = row[i + 1].start_tick;
            let cur = &mut row[i];
            if cur.end_tick() > next_start {
                cur.duration_ticks = next_start - cur.start_tick;
            }
        }
        notes.extend(row.into_iter().filter(|n| n.duration_ticks > 0));
    }
    sort_notes(notes);
}

/// True if any two notes on the same pitch overlap
pub fn has_overlaps(notes: &[Note]) -> bool {
    let mut rows: BTreeMap<u8, Vec<&Note>> = BTreeMap::new();
    for note in notes {
        rows.entry(note.pitch).or_default().push(note);
    }
    rows.values_mut().any(|row| {
        row.sort_by_key(|n| n.start_tick);
        row.windows(2).any(|w| w[0].end_tick() > w[1].start_tick)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: u64, start: u64, pitch: u8, dur: u64) -> Note {
        let mut n = Note::new(start, pitch, dur, 100);
        n.id = NoteId(id);
        n
    }

    #[test]
    fn test_later_note_truncates_earlier() {
        let mut notes = vec![note(1, 0, 60, 4), note(2, 2, 60, 4)];
        apply_overlap_rules(&mut notes, &[NoteId(2)]);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].duration_ticks, 2);
        assert_eq!(notes[1].duration_ticks, 4);
    }

    #[test]
    fn test_contained_note_is_deleted() {
        let mut notes = vec![note(1, 2, 60, 1), note(2, 0, 60, 8)];
        apply_overlap_rules(&mut notes, &[NoteId(2)]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, NoteId(2));
    }

    #[test]
    fn test_other_pitches_untouched() {
        let mut notes = vec![note(1, 0, 61, 8), note(2, 2, 60, 4)];
        apply_overlap_rules(&mut notes, &[NoteId(2)]);
        truncate_overlaps(&mut notes);
        assert_eq!(notes[0].duration_ticks, 8);
    }

    #[test]
    fn test_truncate_pass_drops_same_start_duplicates() {
        let mut notes = vec![note(1, 4, 60, 4), note(2, 4, 60, 2), note(3, 0, 60, 6)];
        truncate_overlaps(&mut notes);
        assert!(!has_overlaps(&notes));
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].start_tick, 0);
        assert_eq!(notes[0].duration_ticks, 4);
        assert_eq!(notes[1].id, NoteId(2));
    }

    #[test]
    fn test_result_sorted_by_start() {
        let mut notes = vec![note(1, 9, 62, 1), note(2, 3, 60, 1), note(3, 5, 61, 1)];
        truncate_overlaps(&mut notes);
        let starts: Vec<u64> = notes.iter().map(|n| n.start_tick).collect();
        assert_eq!(starts, vec![3, 5, 9]);
    }
}
