//! Note store: the canonical ordered note sequence

use tracing::debug;

use crate::error::Result;
use crate::note::{Note, NoteId, MAX_PITCH, MAX_TICK};
use crate::overlap::{apply_overlap_rules, sort_notes, truncate_overlaps};

/// Ordered note sequence. Notes are kept sorted by start tick after every
/// structural mutation; with monophonic enforcement on, no two notes on the
/// same pitch overlap after a commit.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    next_id: u64,
    monophonic: bool,
}

impl NoteStore {
    pub fn new(monophonic: bool) -> Self {
        Self {
            notes: Vec::new(),
            next_id: 1,
            monophonic,
        }
    }

    pub fn is_monophonic(&self) -> bool {
        self.monophonic
    }

    /// Toggle monophonic enforcement; turning it on re-applies the row pass
    pub fn set_monophonic(&mut self, monophonic: bool) {
        self.monophonic = monophonic;
        self.commit(&[]);
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn notes_mut(&mut self) -> &mut Vec<Note> {
        &mut self.notes
    }

    fn allocate_id(&mut self) -> NoteId {
        self.next_id = self.next_id.max(1);
        let id = NoteId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a note from raw coordinates. Out-of-range pitch or a negative start
    /// drops the note; a non-positive duration is clamped to one tick.
    pub fn add_note(&mut self, start_tick: i64, pitch: i32, duration_ticks: i64, velocity: u8) -> Option<NoteId> {
        if start_tick < 0 || !(0..=MAX_PITCH as i32).contains(&pitch) {
            debug!(start_tick, pitch, "rejected out-of-range note");
            return None;
        }
        let note = Note::new(start_tick as u64, pitch as u8, duration_ticks.max(1) as u64, velocity);
        Some(self.insert(note))
    }

    /// Insert a note and immediately apply overlap constraints around it
    pub fn insert(&mut self, note: Note) -> NoteId {
        let id = self.push_unconstrained(note);
        self.commit(&[id]);
        id
    }

    /// Append a note without running the overlap engine. Used by gestures that
    /// commit on pointer-up.
    pub(crate) fn push_unconstrained(&mut self, mut note: Note) -> NoteId {
        let id = self.allocate_id();
        note.id = id;
        note.duration_ticks = note.duration_ticks.max(1);
        self.notes.push(note);
        id
    }

    /// Append copies of `notes` with fresh ids, returning the new ids
    pub(crate) fn push_copies(&mut self, notes: impl IntoIterator<Item = Note>) -> Vec<NoteId> {
        notes.into_iter().map(|n| self.push_unconstrained(n)).collect()
    }

    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        let idx = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(idx))
    }

    /// Delete every selected note, returning the removed notes
    pub fn remove_selected(&mut self) -> Vec<Note> {
        let (removed, kept): (Vec<Note>, Vec<Note>) = self.notes.drain(..).partition(|n| n.selected);
        self.notes = kept;
        removed
    }

    /// Cut `[start, start + len)` out of the notes on `pitch`. Fully covered
    /// notes are deleted, partially covered ones trimmed, and a note strictly
    /// containing the span is split in two.
    pub fn clear_span(&mut self, start: u64, len: u64, pitch: u8) {
        let end = start + len.max(1);
        let mut tails = Vec::new();

        self.notes.retain_mut(|n| {
            if n.pitch != pitch || !n.overlaps(start, end) {
                return true;
            }
            let (s, e) = (n.start_tick, n.end_tick());
            if start <= s && end >= e {
                return false;
            }
            if start <= s {
                n.start_tick = end;
                n.duration_ticks = e - end;
            } else if end >= e {
                n.duration_ticks = start - s;
            } else {
                let mut tail = *n;
                tail.start_tick = end;
                tail.duration_ticks = e - end;
                tail.selected = false;
                tails.push(tail);
                n.duration_ticks = start - s;
            }
            true
        });

        for tail in tails {
            self.push_unconstrained(tail);
        }
        sort_notes(&mut self.notes);
    }

    /// Re-sort and, for monophonic tracks, resolve overlaps around `active`
    /// followed by a full row pass.
    pub fn commit(&mut self, active: &[NoteId]) {
        if self.monophonic {
            apply_overlap_rules(&mut self.notes, active);
            truncate_overlaps(&mut self.notes);
        } else {
            sort_notes(&mut self.notes);
        }
    }

    pub fn sort(&mut self) {
        sort_notes(&mut self.notes);
    }

    // -- Selection --

    pub fn select_all(&mut self) {
        self.notes.iter_mut().for_each(|n| n.selected = true);
    }

    pub fn clear_selection(&mut self) {
        self.notes.iter_mut().for_each(|n| n.selected = false);
    }

    pub fn set_selected(&mut self, id: NoteId, selected: bool) {
        if let Some(note) = self.get_mut(id) {
            note.selected = selected;
        }
    }

    pub fn toggle_selected(&mut self, id: NoteId) {
        if let Some(note) = self.get_mut(id) {
            note.selected = !note.selected;
        }
    }

    pub fn has_selection(&self) -> bool {
        self.notes.iter().any(|n| n.selected)
    }

    pub fn selected_ids(&self) -> Vec<NoteId> {
        self.notes.iter().filter(|n| n.selected).map(|n| n.id).collect()
    }

    // -- Snapshots and persistence --

    /// Copy of the current notes, ids included
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.clone()
    }

    /// Restore notes previously taken with [`NoteStore::snapshot`]
    pub fn restore(&mut self, notes: Vec<Note>) {
        self.notes = notes;
        sort_notes(&mut self.notes);
    }

    /// Replace the whole sequence, assigning fresh ids and dropping invalid notes
    pub fn replace_all(&mut self, notes: impl IntoIterator<Item = Note>) {
        self.notes.clear();
        for note in notes {
            if note.pitch > MAX_PITCH || note.end_tick() > MAX_TICK {
                continue;
            }
            let note = Note::new(note.start_tick, note.pitch, note.duration_ticks, note.velocity)
                .selected(note.selected);
            self.push_unconstrained(note);
        }
        self.commit(&[]);
    }

    /// Serialize the note array (ids are not persisted)
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.notes)?)
    }

    /// Load a note array, replacing the current sequence
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let notes: Vec<Note> = serde_json::from_str(json)?;
        self.replace_all(notes);
        debug!(count = self.notes.len(), "loaded note array");
        Ok(())
    }
}
