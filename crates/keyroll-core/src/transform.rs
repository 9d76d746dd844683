//! Selection and bulk transforms
//!
//! Bulk operations act on a [`Target`]: the current selection, or the whole
//! sequence when invoked globally or when nothing is selected. Each operation
//! finishes with a store commit (sort + overlap pass on monophonic tracks).

use tracing::debug;

use crate::note::{Note, NoteId, MAX_PITCH};
use crate::store::NoteStore;

/// Which notes a bulk operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Selection,
    /// Whole sequence (menu opened over empty space)
    Global,
}

/// Resolve the target set to ids. An empty selection falls back to every note.
fn target_ids(store: &NoteStore, target: Target) -> Vec<NoteId> {
    let selected = store.selected_ids();
    if target == Target::Global || selected.is_empty() {
        store.notes().iter().map(|n| n.id).collect()
    } else {
        selected
    }
}

fn target_notes(store: &NoteStore, target: Target) -> Vec<Note> {
    target_ids(store, target)
        .into_iter()
        .filter_map(|id| store.get(id).copied())
        .collect()
}

/// Time span `[min start, max end)` of a non-empty note set
fn span(notes: &[Note]) -> Option<(u64, u64)> {
    let start = notes.iter().map(|n| n.start_tick).min()?;
    let end = notes.iter().map(Note::end_tick).max()?;
    Some((start, end))
}

/// Append a copy of the target set shifted so it starts where the originals
/// end. The copies become the only selected notes. Returns the copy ids.
pub fn duplicate(store: &mut NoteStore, target: Target) -> Vec<NoteId> {
    let notes = target_notes(store, target);
    let Some((start, end)) = span(&notes) else {
        return Vec::new();
    };
    let offset = end - start;

    store.clear_selection();
    let copies = store.push_copies(notes.into_iter().map(|n| {
        let mut copy = n.selected(true);
        copy.start_tick = copy.start_tick.saturating_add(offset);
        copy
    }));
    store.commit(&copies);
    debug!(count = copies.len(), offset, "duplicate");
    copies
}

/// Mirror each note's time position within the target set's own span
pub fn reverse(store: &mut NoteStore, target: Target) {
    let notes = target_notes(store, target);
    let Some((start, end)) = span(&notes) else {
        return;
    };
    for note in &notes {
        if let Some(n) = store.get_mut(note.id) {
            n.start_tick = start + end - note.end_tick();
        }
    }
    store.commit(&[]);
    debug!(count = notes.len(), start, end, "reverse");
}

/// Mirror each note's pitch within the target set's own pitch range
pub fn invert(store: &mut NoteStore, target: Target) {
    let notes = target_notes(store, target);
    let (Some(lo), Some(hi)) = (
        notes.iter().map(|n| n.pitch).min(),
        notes.iter().map(|n| n.pitch).max(),
    ) else {
        return;
    };
    for note in &notes {
        if let Some(n) = store.get_mut(note.id) {
            n.pitch = lo + hi - note.pitch;
        }
    }
    store.commit(&[]);
    debug!(count = notes.len(), lo, hi, "invert");
}

/// Scale offsets from the set's first onset and durations by `factor`
pub fn rescale(store: &mut NoteStore, target: Target, factor: f64) {
    if !(factor.is_finite() && factor > 0.0) {
        return;
    }
    let notes = target_notes(store, target);
    let Some((start, _)) = span(&notes) else {
        return;
    };
    for note in &notes {
        if let Some(n) = store.get_mut(note.id) {
            n.start_tick = start + ((note.start_tick - start) as f64 * factor).round() as u64;
            n.duration_ticks = ((note.duration_ticks as f64 * factor).round() as u64).max(1);
        }
    }
    store.commit(&[]);
    debug!(count = notes.len(), factor, "rescale");
}

/// Snap each start to the nearest multiple of `grid`
pub fn quantize(store: &mut NoteStore, target: Target, grid: u64) {
    let grid = grid.max(1);
    let ids = target_ids(store, target);
    for &id in &ids {
        if let Some(n) = store.get_mut(id) {
            n.start_tick = quantize_tick(n.start_tick, grid);
        }
    }
    store.commit(&[]);
    debug!(count = ids.len(), grid, "quantize");
}

fn quantize_tick(tick: u64, grid: u64) -> u64 {
    (tick as f64 / grid as f64).round() as u64 * grid
}

/// Set the velocity of the selected notes, clamped to 1..127
pub fn set_velocity(store: &mut NoteStore, velocity: i32) {
    let velocity = velocity.clamp(1, 127) as u8;
    store
        .notes_mut()
        .iter_mut()
        .filter(|n| n.selected)
        .for_each(|n| n.velocity = velocity);
}

/// Replace the notes on `pitch` that start inside `[loop_start, loop_end)`
/// with a random pattern: every grid cell independently gets a one-cell note
/// with probability 1/2. Returns the number of notes placed.
pub fn random_fill_row(
    store: &mut NoteStore,
    pitch: u8,
    loop_start: u64,
    loop_end: u64,
    grid: u64,
    velocity: u8,
    rng: &mut fastrand::Rng,
) -> usize {
    if pitch > MAX_PITCH {
        return 0;
    }
    let grid = grid.max(1);
    store
        .notes_mut()
        .retain(|n| !(n.pitch == pitch && n.start_tick >= loop_start && n.start_tick < loop_end));

    let steps = loop_end.saturating_sub(loop_start) / grid;
    let mut placed = 0;
    for step in 0..steps {
        if rng.bool() {
            store.insert(Note::new(loop_start + step * grid, pitch, grid, velocity));
            placed += 1;
        }
    }
    store.commit(&[]);
    debug!(pitch, steps, placed, "random fill");
    placed
}

/// Replace the selection with every note whose start lies in `[t1, t2)` and
/// whose pitch lies in `[n1, n2]`. Bounds may be given in either order.
pub fn select_area(store: &mut NoteStore, t1: f64, t2: f64, n1: f64, n2: f64) {
    let (t1, t2) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    let (n1, n2) = if n1 <= n2 { (n1, n2) } else { (n2, n1) };
    for n in store.notes_mut() {
        let (start, pitch) = (n.start_tick as f64, n.pitch as f64);
        n.selected = start >= t1 && start < t2 && pitch >= n1 && pitch <= n2;
    }
}

/// Shift the selected notes in time. The group delta is clamped so no note
/// moves before tick 0.
pub fn nudge_selected(store: &mut NoteStore, delta: i64) {
    let ids = store.selected_ids();
    let earliest = ids
        .iter()
        .filter_map(|&id| store.get(id))
        .map(|n| n.start_tick as i64)
        .min();
    let Some(earliest) = earliest else {
        return;
    };
    let delta = delta.max(-earliest);
    if delta == 0 {
        return;
    }
    for &id in &ids {
        if let Some(n) = store.get_mut(id) {
            n.start_tick = (n.start_tick as i64 + delta) as u64;
        }
    }
    store.commit(&ids);
}

/// Shift the selected notes in pitch, clamping the group delta so every note
/// stays inside 0..127
pub fn transpose_selected(store: &mut NoteStore, delta: i32) {
    let ids = store.selected_ids();
    let pitches: Vec<i32> = ids
        .iter()
        .filter_map(|&id| store.get(id))
        .map(|n| n.pitch as i32)
        .collect();
    let (Some(&lo), Some(&hi)) = (pitches.iter().min(), pitches.iter().max()) else {
        return;
    };
    let delta = delta.clamp(-lo, MAX_PITCH as i32 - hi);
    if delta == 0 {
        return;
    }
    for &id in &ids {
        if let Some(n) = store.get_mut(id) {
            n.pitch = (n.pitch as i32 + delta) as u8;
        }
    }
    store.commit(&ids);
}
