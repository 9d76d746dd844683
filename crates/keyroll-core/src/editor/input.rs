use tracing::{debug, info, trace};

use super::menu::{ContextMenu, MenuItem};
use super::types::{Button, Edge, EditorAction, Grabbed, Operation, PointerEvent, Press};
use super::{Editor, CLICK_TOLERANCE, LONG_PRESS_TICKS};
use crate::edit_mode::InsertStyle;
use crate::note::{Note, NoteId, MAX_PITCH};
use crate::transform::{self, Target};
use crate::view::{Hit, HitKind, Marker, Point};

/// Perpendicular ruler travel ignored before zooming starts
const AXIS_DEAD_ZONE: f64 = 5.0;
const AXIS_ZOOM_BASE: f64 = 1.01;

/// Cell containing `tick`
fn floor_snap(tick: f64, grid: u64) -> u64 {
    (tick.max(0.0) / grid as f64).floor() as u64 * grid
}

/// Resize edges snap to the next grid line once 10% into a cell
fn resize_snap(tick: f64, grid: u64) -> u64 {
    (tick.max(0.0) / grid as f64 + 0.9).floor() as u64 * grid
}

/// Zoom factor for a perpendicular ruler drag of `d` pixels
fn axis_zoom(d: f64) -> f64 {
    let dz = if d.abs() > AXIS_DEAD_ZONE {
        d - AXIS_DEAD_ZONE * d.signum()
    } else {
        0.0
    };
    AXIS_ZOOM_BASE.powf(-dz / 2.0)
}

/// Span between a fixed edge and a moving one. A moving edge that crosses the
/// fixed edge turns the note around instead of going negative.
fn span_between(fixed: u64, moving: i64, edge: Edge) -> (u64, u64) {
    let moving = moving.max(0) as u64;
    if moving > fixed {
        (fixed, moving - fixed)
    } else if moving < fixed {
        (moving, fixed - moving)
    } else {
        match edge {
            Edge::End => (fixed, 1),
            Edge::Start => (fixed.saturating_sub(1), 1),
        }
    }
}

fn is_note(kind: HitKind) -> bool {
    matches!(
        kind,
        HitKind::NoteStart(_) | HitKind::NoteEnd(_) | HitKind::NoteBody { .. }
    )
}

impl Editor {
    fn hit(&self, pos: Point) -> Hit {
        let menu = self.menu.as_ref().map(|m| m.rect);
        self.view.hit_test(pos, self.store.notes(), &self.transport, menu)
    }

    fn row_of(hit: &Hit) -> Option<u8> {
        let row = hit.row();
        (0..=MAX_PITCH as i32).contains(&row).then_some(row as u8)
    }

    // -- Pointer down --

    pub fn pointer_down(&mut self, ev: PointerEvent) -> EditorAction {
        if !self.config.enabled || !self.is_idle() {
            return EditorAction::None;
        }
        let hit = self.hit(ev.pos);

        if self.menu.is_some() {
            if hit.kind == HitKind::Menu {
                self.operation = Operation::Menu { opened_here: false };
                return EditorAction::None;
            }
            self.close_menu();
            if ev.is_context() {
                return EditorAction::Redraw;
            }
        }

        let snapshot = self.store.snapshot();
        let action = if ev.is_context() {
            self.context_down(ev, hit)
        } else {
            self.primary_down(ev, hit)
        };

        if self.menu.is_none() && (hit.kind == HitKind::Empty || is_note(hit.kind)) {
            self.press = Some(Press {
                pos: ev.pos,
                hit,
                snapshot,
                ticks: 0,
            });
        }
        action
    }

    fn context_down(&mut self, ev: PointerEvent, hit: Hit) -> EditorAction {
        if let Some(id) = hit.note() {
            self.select_exclusive_unless_selected(id);
            self.open_menu(ev.pos, false, hit.row());
            self.operation = Operation::Menu { opened_here: true };
            return EditorAction::Redraw;
        }
        if hit.kind == HitKind::Empty {
            self.store.clear_selection();
            self.operation = Operation::AreaSelect {
                from: ev.pos,
                to: ev.pos,
                from_hit: hit,
                to_hit: hit,
                secondary: true,
            };
            return EditorAction::Redraw;
        }
        EditorAction::None
    }

    fn primary_down(&mut self, ev: PointerEvent, hit: Hit) -> EditorAction {
        match hit.kind {
            HitKind::Menu | HitKind::Outside => EditorAction::None,
            HitKind::Marker(marker) => {
                let origin_tick = match marker {
                    Marker::LoopStart => self.transport.loop_start(),
                    Marker::LoopEnd => self.transport.loop_end(),
                    Marker::Playhead => self.transport.cursor,
                };
                self.operation = Operation::MarkerDrag {
                    marker,
                    origin_x: ev.pos.x,
                    origin_tick,
                };
                EditorAction::None
            }
            HitKind::TimeRuler => {
                self.operation = Operation::TimeAxis {
                    origin: ev.pos,
                    anchor: hit.tick,
                    offset: self.view.x_offset,
                    range: self.view.x_range,
                };
                EditorAction::None
            }
            HitKind::PitchRuler => {
                self.operation = Operation::PitchAxis {
                    origin: ev.pos,
                    anchor: hit.pitch,
                    offset: self.view.y_offset,
                    range: self.view.y_range,
                    row: hit.row(),
                };
                EditorAction::None
            }
            _ => match self.config.edit_mode.style {
                InsertStyle::Drag => self.drag_down(ev, hit),
                InsertStyle::Grid => self.grid_down(hit),
                InsertStyle::Draw => self.draw_down(hit),
            },
        }
    }

    fn drag_down(&mut self, ev: PointerEvent, hit: Hit) -> EditorAction {
        match hit.kind {
            HitKind::NoteBody { id, .. } if ev.modifiers.shift => {
                self.store.toggle_selected(id);
                EditorAction::Redraw
            }
            HitKind::NoteBody { id, .. } => {
                self.select_exclusive_unless_selected(id);
                self.begin_move(hit);
                EditorAction::Redraw
            }
            HitKind::NoteStart(id) => self.begin_resize(id, Edge::Start),
            HitKind::NoteEnd(id) => self.begin_resize(id, Edge::End),
            HitKind::Empty if hit.tick >= 0.0 => self.begin_insert(hit),
            _ => EditorAction::None,
        }
    }

    fn grid_down(&mut self, hit: Hit) -> EditorAction {
        if let Some(id) = hit.note() {
            self.store.remove(id);
            self.operation = Operation::GridErase;
            return EditorAction::NotesChanged;
        }
        if hit.kind == HitKind::Empty && hit.tick >= 0.0 {
            self.operation = Operation::GridPaint;
            self.paint_cell(&hit);
            return EditorAction::NotesChanged;
        }
        EditorAction::None
    }

    fn draw_down(&mut self, hit: Hit) -> EditorAction {
        if hit.tick < 0.0 {
            return EditorAction::None;
        }
        self.operation = Operation::Draw;
        self.draw_cell(&hit);
        EditorAction::NotesChanged
    }

    fn select_exclusive_unless_selected(&mut self, id: NoteId) {
        if !self.store.get(id).is_some_and(|n| n.selected) {
            self.store.clear_selection();
            self.store.set_selected(id, true);
        }
    }

    fn selected_grabs(&self) -> Vec<Grabbed> {
        self.store.notes().iter().filter(|n| n.selected).map(Grabbed::from).collect()
    }

    fn begin_move(&mut self, hit: Hit) {
        let grabbed = self.selected_grabs();
        debug!(count = grabbed.len(), tick = hit.tick, "note move started");
        self.operation = Operation::Move {
            anchor_tick: hit.tick,
            anchor_row: hit.row(),
            grabbed,
            base: self.store.snapshot(),
        };
    }

    fn begin_resize(&mut self, id: NoteId, edge: Edge) -> EditorAction {
        let Some(reference) = self.store.get(id).map(Grabbed::from) else {
            return EditorAction::None;
        };
        let grabbed = self.selected_grabs();
        debug!(count = grabbed.len(), ?edge, "note resize started");
        self.operation = Operation::Resize {
            edge,
            reference,
            grabbed,
            base: self.store.snapshot(),
        };
        EditorAction::Redraw
    }

    /// Drag-mode insertion: a default-length note at the pressed cell, handed
    /// straight to an end resize
    fn begin_insert(&mut self, hit: Hit) -> EditorAction {
        let Some(row) = Self::row_of(&hit) else {
            return EditorAction::None;
        };
        let grid = self.grid_ticks();
        let tick = floor_snap(hit.tick, grid);
        let length = self.config.insert_length();
        let id = self.config.edit_mode.begin_drag_insert(
            &mut self.store,
            tick,
            row,
            length,
            self.config.default_velocity,
        );
        let Some(reference) = self.store.get(id).map(Grabbed::from) else {
            return EditorAction::None;
        };
        debug!(tick, row, length, "note inserted");
        self.operation = Operation::Resize {
            edge: Edge::End,
            reference,
            grabbed: vec![reference],
            base: self.store.snapshot(),
        };
        EditorAction::NotesChanged
    }

    /// Place a one-cell note at the cell under `hit`; mono modes clear it first
    fn paint_cell(&mut self, hit: &Hit) -> bool {
        let grid = self.grid_ticks();
        let tick = floor_snap(hit.tick, grid);
        self.config
            .edit_mode
            .place_cell(&mut self.store, tick as i64, hit.row(), grid, self.config.default_velocity)
            .is_some()
    }

    /// Like [`Editor::paint_cell`] but never stacks a note on an identical one
    fn draw_cell(&mut self, hit: &Hit) -> bool {
        let tick = floor_snap(hit.tick, self.grid_ticks());
        let row = hit.row();
        let exists = self
            .store
            .notes()
            .iter()
            .any(|n| n.start_tick == tick && n.pitch as i32 == row);
        !exists && self.paint_cell(hit)
    }

    // -- Pointer move --

    pub fn pointer_move(&mut self, ev: PointerEvent) -> EditorAction {
        if self
            .press
            .as_ref()
            .is_some_and(|press| press.pos.manhattan(ev.pos) > CLICK_TOLERANCE)
        {
            self.press = None;
        }
        let hit = self.hit(ev.pos);
        let mut op = std::mem::take(&mut self.operation);
        let action = self.step(&mut op, ev, hit);
        self.operation = op;
        action
    }

    fn step(&mut self, op: &mut Operation, ev: PointerEvent, hit: Hit) -> EditorAction {
        let grid = self.grid_ticks();
        match op {
            Operation::Idle => EditorAction::None,
            Operation::Move {
                anchor_tick,
                anchor_row,
                grabbed,
                base,
            } => {
                let g = grid as i64;
                let dt = ((hit.tick - *anchor_tick) / grid as f64).round() as i64 * g;
                let dn = hit.row() - *anchor_row;

                let earliest = grabbed.iter().map(|n| n.start).min().unwrap_or(0) as i64;
                let lo = grabbed.iter().map(|n| n.pitch).min().unwrap_or(0) as i32;
                let hi = grabbed.iter().map(|n| n.pitch).max().unwrap_or(0) as i32;
                let dt = dt.max(-earliest);
                let dn = dn.clamp(-lo, MAX_PITCH as i32 - hi);

                trace!(dt, dn, "move");
                self.apply_grabbed(base, grabbed, |n| {
                    ((n.start as i64 + dt) as u64, (n.pitch as i32 + dn) as u8, n.duration)
                });
                EditorAction::NotesChanged
            }
            Operation::Resize {
                edge,
                reference,
                grabbed,
                base,
            } => {
                let edge = *edge;
                let moving_edge = |n: &Grabbed| match edge {
                    Edge::End => (n.start, n.end()),
                    Edge::Start => (n.end(), n.start),
                };
                let (_, reference_moving) = moving_edge(&*reference);
                let delta = resize_snap(hit.tick, grid) as i64 - reference_moving as i64;

                self.apply_grabbed(base, grabbed, |n| {
                    let (fixed, moving) = moving_edge(n);
                    let (start, duration) = span_between(fixed, moving as i64 + delta, edge);
                    (start, n.pitch, duration)
                });
                EditorAction::NotesChanged
            }
            Operation::AreaSelect { to, to_hit, .. } => {
                *to = ev.pos;
                *to_hit = hit;
                EditorAction::Redraw
            }
            Operation::TimeAxis {
                origin,
                anchor,
                offset,
                range,
            } => {
                let f = axis_zoom(origin.y - ev.pos.y);
                let dx = origin.x - ev.pos.x;
                self.view.x_range = *range / f;
                self.view.x_offset = *anchor - (*anchor - *offset) / f + dx * (self.view.x_range / self.view.swidth());
                self.view.clamp();
                EditorAction::Redraw
            }
            Operation::PitchAxis {
                origin,
                anchor,
                offset,
                range,
                ..
            } => {
                let f = axis_zoom(origin.x - ev.pos.x);
                let dy = ev.pos.y - origin.y;
                self.view.y_range = *range / f;
                self.view.y_offset = *anchor - (*anchor - *offset) / f + dy * (self.view.y_range / self.view.sheight());
                self.view.clamp();
                EditorAction::Redraw
            }
            Operation::MarkerDrag {
                marker,
                origin_x,
                origin_tick,
            } => {
                let tick = (*origin_tick as f64 + (ev.pos.x - *origin_x) / self.view.step_w() + 0.5)
                    .floor()
                    .max(0.0) as u64;
                match marker {
                    Marker::LoopStart => self.transport.set_loop_start(tick),
                    Marker::LoopEnd => self.transport.set_loop_end(tick),
                    Marker::Playhead => self.transport.locate(tick),
                }
                EditorAction::Redraw
            }
            Operation::GridPaint => {
                if hit.kind == HitKind::Empty && hit.tick >= 0.0 && self.paint_cell(&hit) {
                    return EditorAction::NotesChanged;
                }
                EditorAction::None
            }
            Operation::GridErase => match hit.note() {
                Some(id) => {
                    self.store.remove(id);
                    EditorAction::NotesChanged
                }
                None => EditorAction::None,
            },
            Operation::Draw => {
                if hit.tick >= 0.0 && self.draw_cell(&hit) {
                    return EditorAction::NotesChanged;
                }
                EditorAction::None
            }
            Operation::Menu { .. } => match self.menu.as_mut() {
                Some(menu) => {
                    if menu.hover(ev.pos) {
                        EditorAction::Redraw
                    } else {
                        EditorAction::None
                    }
                }
                None => EditorAction::None,
            },
        }
    }

    /// Rebuild the store from the gesture's base snapshot with the grabbed
    /// notes repositioned, then run the overlap engine around them
    fn apply_grabbed(&mut self, base: &[Note], grabbed: &[Grabbed], place: impl Fn(&Grabbed) -> (u64, u8, u64)) {
        let mut notes = base.to_vec();
        for g in grabbed {
            if let Some(note) = notes.iter_mut().find(|n| n.id == g.id) {
                let (start, pitch, duration) = place(g);
                note.start_tick = start;
                note.pitch = pitch;
                note.duration_ticks = duration.max(1);
            }
        }
        self.store.restore(notes);
        let ids: Vec<NoteId> = grabbed.iter().map(|g| g.id).collect();
        self.store.commit(&ids);
    }

    // -- Pointer up --

    pub fn pointer_up(&mut self, ev: PointerEvent) -> EditorAction {
        self.press = None;
        match std::mem::take(&mut self.operation) {
            Operation::Idle => EditorAction::None,
            Operation::Menu { opened_here } => {
                if ev.button == Button::Secondary {
                    return EditorAction::None;
                }
                let item = self.menu.as_ref().and_then(|m| m.item_at(ev.pos));
                match item {
                    Some(item) => self.commit_menu(item),
                    None if opened_here => EditorAction::None,
                    None => {
                        self.close_menu();
                        EditorAction::Redraw
                    }
                }
            }
            Operation::AreaSelect {
                from,
                from_hit,
                secondary,
                ..
            } => {
                if secondary && from.manhattan(ev.pos) < CLICK_TOLERANCE {
                    self.open_menu(from, true, from_hit.row());
                    return EditorAction::Redraw;
                }
                let to_hit = self.hit(ev.pos);
                let (lo, hi) = (from_hit.pitch.min(to_hit.pitch), from_hit.pitch.max(to_hit.pitch));
                transform::select_area(&mut self.store, from_hit.tick, to_hit.tick, lo.floor(), hi.floor());
                EditorAction::Redraw
            }
            Operation::Move { grabbed, .. } | Operation::Resize { grabbed, .. } => {
                let ids: Vec<NoteId> = grabbed.iter().map(|g| g.id).collect();
                self.store.commit(&ids);
                debug!(count = ids.len(), "note gesture committed");
                EditorAction::NotesChanged
            }
            Operation::GridPaint | Operation::GridErase | Operation::Draw => {
                self.store.commit(&[]);
                EditorAction::NotesChanged
            }
            Operation::PitchAxis { origin, row, .. } if origin.manhattan(ev.pos) < CLICK_TOLERANCE => {
                match u8::try_from(row) {
                    Ok(row) if row <= MAX_PITCH => EditorAction::PitchRowClicked { row },
                    _ => EditorAction::None,
                }
            }
            Operation::TimeAxis { .. } | Operation::PitchAxis { .. } | Operation::MarkerDrag { .. } => {
                EditorAction::Redraw
            }
        }
    }

    // -- Long press and menu --

    /// Advance the long-press timer. After [`LONG_PRESS_TICKS`] ticks without
    /// travel the pending gesture is undone and the context menu opens.
    pub fn long_press_tick(&mut self) -> EditorAction {
        let Some(press) = self.press.as_mut() else {
            return EditorAction::None;
        };
        press.ticks += 1;
        if press.ticks < LONG_PRESS_TICKS {
            return EditorAction::None;
        }
        let Some(press) = self.press.take() else {
            return EditorAction::None;
        };

        self.store.restore(press.snapshot);
        self.operation = Operation::Idle;
        match press.hit.note() {
            Some(id) => {
                self.select_exclusive_unless_selected(id);
                self.open_menu(press.pos, false, press.hit.row());
            }
            None => {
                self.store.clear_selection();
                self.open_menu(press.pos, true, press.hit.row());
            }
        }
        self.operation = Operation::Menu { opened_here: true };
        info!("long press opened menu");
        EditorAction::Redraw
    }

    fn open_menu(&mut self, at: Point, global: bool, row: i32) {
        let menu = ContextMenu::open(at, global, row, self.view.height);
        debug!(global, row = menu.row, "menu opened");
        self.menu = Some(menu);
    }

    fn close_menu(&mut self) {
        self.menu = None;
    }

    /// Close the menu and run `item`
    pub fn commit_menu(&mut self, item: MenuItem) -> EditorAction {
        let Some(menu) = self.menu.take() else {
            return EditorAction::None;
        };
        if !menu.is_enabled(item) {
            return EditorAction::Redraw;
        }
        let target = if menu.global { Target::Global } else { Target::Selection };
        info!(item = item.label(), global = menu.global, "menu item");
        match item {
            MenuItem::Delete => match self.delete_selected() {
                EditorAction::None => EditorAction::Redraw,
                action => action,
            },
            MenuItem::Duplicate => self.duplicate(target),
            MenuItem::Reverse => self.reverse(target),
            MenuItem::Invert => self.invert(target),
            MenuItem::DoubleLength => self.rescale(target, 2.0),
            MenuItem::HalveLength => self.rescale(target, 0.5),
            MenuItem::Quantize => self.quantize(target),
            MenuItem::EuclidFill => EditorAction::EuclidFill { row: menu.row },
            MenuItem::RandomFill => self.random_fill_row(menu.row),
        }
    }

    // -- Wheel --

    /// Wheel step at `pos`; positive `delta` zooms in. Only acts over a ruler
    /// whose wheel zoom is enabled.
    pub fn wheel(&mut self, pos: Point, delta: f64) -> EditorAction {
        if !self.config.enabled || delta == 0.0 {
            return EditorAction::None;
        }
        let hit = self.hit(pos);
        match hit.kind {
            HitKind::TimeRuler | HitKind::Marker(_) if self.config.wheel_zoom_x => {
                self.view.wheel_zoom_x(hit.tick, delta > 0.0);
                EditorAction::Redraw
            }
            HitKind::PitchRuler if self.config.wheel_zoom_y => {
                self.view.wheel_zoom_y(hit.pitch, delta > 0.0);
                EditorAction::Redraw
            }
            _ => EditorAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snaps() {
        assert_eq!(floor_snap(7.9, 4), 4);
        assert_eq!(floor_snap(-3.0, 4), 0);
        assert_eq!(resize_snap(4.3, 4), 4);
        assert_eq!(resize_snap(4.5, 4), 8);
    }

    #[test]
    fn test_axis_zoom_dead_zone() {
        assert_eq!(axis_zoom(4.0), 1.0);
        assert_eq!(axis_zoom(-5.0), 1.0);
        assert!((axis_zoom(25.0) - 1.01f64.powf(-10.0)).abs() < 1e-12);
        assert!((axis_zoom(-25.0) - 1.01f64.powf(10.0)).abs() < 1e-12);
    }

    #[test]
    fn test_span_flips_past_fixed_edge() {
        assert_eq!(span_between(4, 10, Edge::End), (4, 6));
        assert_eq!(span_between(4, 1, Edge::End), (1, 3));
        assert_eq!(span_between(4, 4, Edge::End), (4, 1));
        assert_eq!(span_between(8, 12, Edge::Start), (8, 4));
        assert_eq!(span_between(8, 8, Edge::Start), (7, 1));
        assert_eq!(span_between(0, -3, Edge::Start), (0, 1));
    }
}
