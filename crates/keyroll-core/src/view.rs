//! Geometric mapper: pixel ↔ (tick, pitch) conversion and hit-testing
//!
//! The editable region is the widget minus the time ruler along the top and the
//! pitch ruler + keyboard strip along the left. Pitch runs bottom-up.

use serde::{Deserialize, Serialize};

use crate::note::{Note, NoteId};
use crate::transport::Transport;

/// Pixel distance within which a selected note's edge grabs a resize
pub const EDGE_TOLERANCE: f64 = 8.0;
/// Pixel distance within which a ruler marker is grabbed
pub const MARKER_TOLERANCE: f64 = 8.0;
/// Number of addressable pitch rows
pub const PITCH_ROWS: f64 = 128.0;
/// Wheel zoom step
pub const WHEEL_ZOOM: f64 = 1.2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance, used for movement thresholds
    pub fn manhattan(&self, other: Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Ruler markers that can be dragged along the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    LoopStart,
    LoopEnd,
    Playhead,
}

/// Classification of a pointer position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// Inside the open context menu
    Menu,
    /// Beyond the widget bounds
    Outside,
    /// Time ruler along the top
    TimeRuler,
    /// A marker inside the time ruler
    Marker(Marker),
    /// Pitch ruler / keyboard strip on the left
    PitchRuler,
    /// Start edge handle of a selected note
    NoteStart(NoteId),
    /// End edge handle of a selected note
    NoteEnd(NoteId),
    NoteBody { id: NoteId, selected: bool },
    Empty,
}

/// Hit-test result: unsnapped position plus classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub tick: f64,
    pub pitch: f64,
    pub kind: HitKind,
}

impl Hit {
    /// Integer pitch row under the pointer
    pub fn row(&self) -> i32 {
        self.pitch.floor() as i32
    }

    pub fn note(&self) -> Option<NoteId> {
        match self.kind {
            HitKind::NoteStart(id) | HitKind::NoteEnd(id) | HitKind::NoteBody { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Widget dimensions and the visible time/pitch window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct View {
    /// Widget width in pixels
    pub width: f64,
    /// Widget height in pixels
    pub height: f64,
    /// Height of the time ruler
    pub x_ruler: f64,
    /// Width of the pitch ruler
    pub y_ruler: f64,
    /// Width of the keyboard strip right of the pitch ruler
    pub kb_width: f64,
    /// First visible tick
    pub x_offset: f64,
    /// Visible ticks
    pub x_range: f64,
    /// Lowest visible pitch
    pub y_offset: f64,
    /// Visible pitch rows
    pub y_range: f64,
}

impl Default for View {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 320.0,
            x_ruler: 24.0,
            y_ruler: 24.0,
            kb_width: 40.0,
            x_offset: 0.0,
            x_range: 16.0,
            y_offset: 60.0,
            y_range: 16.0,
        }
    }
}

impl View {
    /// Left edge of the editable region
    pub fn grid_left(&self) -> f64 {
        self.y_ruler + self.kb_width
    }

    /// Width of the editable region
    pub fn swidth(&self) -> f64 {
        (self.width - self.grid_left()).max(1.0)
    }

    /// Height of the editable region
    pub fn sheight(&self) -> f64 {
        (self.height - self.x_ruler).max(1.0)
    }

    /// Pixels per tick
    pub fn step_w(&self) -> f64 {
        self.swidth() / self.x_range
    }

    /// Pixels per pitch row
    pub fn step_h(&self) -> f64 {
        self.sheight() / self.y_range
    }

    pub fn x_to_tick(&self, x: f64) -> f64 {
        self.x_offset + (x - self.grid_left()) / self.swidth() * self.x_range
    }

    pub fn y_to_pitch(&self, y: f64) -> f64 {
        self.y_offset - (y - self.height) / self.step_h()
    }

    pub fn to_tick_pitch(&self, p: Point) -> (f64, f64) {
        (self.x_to_tick(p.x), self.y_to_pitch(p.y))
    }

    pub fn tick_to_x(&self, tick: f64) -> f64 {
        self.grid_left() + (tick - self.x_offset) * self.step_w()
    }

    /// Y of the bottom edge of a pitch row
    pub fn pitch_to_y(&self, pitch: f64) -> f64 {
        self.height - (pitch - self.y_offset) * self.step_h()
    }

    /// Pixel rectangle a note occupies (may lie outside the widget)
    pub fn note_rect(&self, note: &Note) -> Rect {
        let step_h = self.step_h();
        Rect::new(
            self.tick_to_x(note.start_tick as f64),
            self.pitch_to_y(note.pitch as f64) - step_h,
            note.duration_ticks as f64 * self.step_w(),
            step_h,
        )
    }

    /// Keep the pitch window inside 0..128 and the time window non-negative
    pub fn clamp(&mut self) {
        self.y_range = self.y_range.clamp(1.0, PITCH_ROWS);
        self.x_range = self.x_range.max(1.0);
        if self.y_offset < 0.0 {
            self.y_offset = 0.0;
        }
        if self.y_offset + self.y_range > PITCH_ROWS {
            self.y_offset = PITCH_ROWS - self.y_range;
        }
        if self.x_offset < 0.0 {
            self.x_offset = 0.0;
        }
    }

    /// Zoom the time axis around `anchor` by one wheel step
    pub fn wheel_zoom_x(&mut self, anchor: f64, zoom_in: bool) {
        let f = if zoom_in { WHEEL_ZOOM } else { 1.0 / WHEEL_ZOOM };
        self.x_offset = anchor - (anchor - self.x_offset) / f;
        self.x_range /= f;
        self.clamp();
    }

    /// Zoom the pitch axis around `anchor` by one wheel step
    pub fn wheel_zoom_y(&mut self, anchor: f64, zoom_in: bool) {
        let f = if zoom_in { WHEEL_ZOOM } else { 1.0 / WHEEL_ZOOM };
        self.y_offset = anchor - (anchor - self.y_offset) / f;
        self.y_range /= f;
        self.clamp();
    }

    /// X position of a marker
    pub fn marker_x(&self, marker: Marker, transport: &Transport) -> f64 {
        let tick = match marker {
            Marker::LoopStart => transport.loop_start(),
            Marker::LoopEnd => transport.loop_end(),
            Marker::Playhead => transport.cursor,
        };
        self.tick_to_x(tick as f64)
    }

    /// Classify a pointer position. Checks, in order: open menu, widget
    /// bounds, time ruler (markers first), pitch ruler, then notes in stored
    /// order. On a note's row, a selected note's start edge wins over its end
    /// edge, which wins over the body.
    pub fn hit_test(&self, p: Point, notes: &[Note], transport: &Transport, menu: Option<Rect>) -> Hit {
        let (tick, pitch) = self.to_tick_pitch(p);
        let hit = |kind| Hit { tick, pitch, kind };

        if menu.is_some_and(|r| r.contains(p)) {
            return hit(HitKind::Menu);
        }
        if p.x < 0.0 || p.y < 0.0 || p.x >= self.width || p.y >= self.height {
            return hit(HitKind::Outside);
        }
        if p.y < self.x_ruler {
            let mut markers = vec![Marker::LoopEnd, Marker::LoopStart];
            if transport.show_cursor {
                markers.push(Marker::Playhead);
            }
            let near = markers
                .into_iter()
                .find(|&m| (self.marker_x(m, transport) - p.x).abs() < MARKER_TOLERANCE);
            return hit(near.map_or(HitKind::TimeRuler, HitKind::Marker));
        }
        if p.x < self.grid_left() {
            return hit(HitKind::PitchRuler);
        }

        let row = pitch.floor();
        let step_w = self.step_w();
        for note in notes.iter().filter(|n| n.pitch as f64 == row) {
            let start = note.start_tick as f64;
            let end = note.end_tick() as f64;
            if note.selected && (start - tick).abs() * step_w < EDGE_TOLERANCE {
                return hit(HitKind::NoteStart(note.id));
            }
            if note.selected && (end - tick).abs() * step_w < EDGE_TOLERANCE {
                return hit(HitKind::NoteEnd(note.id));
            }
            if tick >= start && tick < end {
                return hit(HitKind::NoteBody {
                    id: note.id,
                    selected: note.selected,
                });
            }
        }
        hit(HitKind::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 64 px rulers + 576 px grid = 36 px per tick; 296 px / 16 rows = 18.5 px per row
    fn view() -> View {
        View::default()
    }

    fn note(id: u64, start: u64, pitch: u8, dur: u64, selected: bool) -> Note {
        let mut n = Note::new(start, pitch, dur, 100).selected(selected);
        n.id = NoteId(id);
        n
    }

    #[test]
    fn test_mapping_round_trip() {
        let v = view();
        let x = v.tick_to_x(5.0);
        let y = v.pitch_to_y(67.5);
        let (t, p) = v.to_tick_pitch(Point::new(x, y));
        assert!((t - 5.0).abs() < 1e-9);
        assert!((p - 67.5).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_runs_bottom_up() {
        let v = view();
        assert!((v.y_to_pitch(v.height) - 60.0).abs() < 1e-9);
        assert!((v.y_to_pitch(v.x_ruler) - 76.0).abs() < 1e-9);
    }

    #[test]
    fn test_regions() {
        let v = view();
        let t = Transport::default();
        assert_eq!(v.hit_test(Point::new(700.0, 100.0), &[], &t, None).kind, HitKind::Outside);
        assert_eq!(v.hit_test(Point::new(30.0, 100.0), &[], &t, None).kind, HitKind::PitchRuler);
        assert_eq!(v.hit_test(Point::new(300.0, 10.0), &[], &t, None).kind, HitKind::TimeRuler);
        assert_eq!(v.hit_test(Point::new(300.0, 100.0), &[], &t, None).kind, HitKind::Empty);
        let menu = Rect::new(290.0, 90.0, 130.0, 18.0);
        assert_eq!(v.hit_test(Point::new(300.0, 100.0), &[], &t, Some(menu)).kind, HitKind::Menu);
    }

    #[test]
    fn test_markers_in_ruler() {
        let v = view();
        let mut t = Transport::default();
        t.set_loop(4, 8);
        t.cursor = 12;
        let x = v.tick_to_x(4.0) + 3.0;
        assert_eq!(v.hit_test(Point::new(x, 10.0), &[], &t, None).kind, HitKind::Marker(Marker::LoopStart));
        let x = v.tick_to_x(8.0);
        assert_eq!(v.hit_test(Point::new(x, 10.0), &[], &t, None).kind, HitKind::Marker(Marker::LoopEnd));
        let x = v.tick_to_x(12.0);
        assert_eq!(v.hit_test(Point::new(x, 10.0), &[], &t, None).kind, HitKind::Marker(Marker::Playhead));
        t.show_cursor = false;
        assert_eq!(v.hit_test(Point::new(x, 10.0), &[], &t, None).kind, HitKind::TimeRuler);
    }

    #[test]
    fn test_edges_only_on_selected_notes() {
        let v = view();
        let t = Transport::default();
        let y = v.pitch_to_y(64.5);
        let near_start = Point::new(v.tick_to_x(4.0) + 2.0, y);
        let near_end = Point::new(v.tick_to_x(8.0) - 2.0, y);

        let unselected = [note(1, 4, 64, 4, false)];
        assert_eq!(
            v.hit_test(near_start, &unselected, &t, None).kind,
            HitKind::NoteBody { id: NoteId(1), selected: false }
        );

        let selected = [note(1, 4, 64, 4, true)];
        assert_eq!(v.hit_test(near_start, &selected, &t, None).kind, HitKind::NoteStart(NoteId(1)));
        assert_eq!(v.hit_test(near_end, &selected, &t, None).kind, HitKind::NoteEnd(NoteId(1)));
        let middle = Point::new(v.tick_to_x(6.0), y);
        assert_eq!(
            v.hit_test(middle, &selected, &t, None).kind,
            HitKind::NoteBody { id: NoteId(1), selected: true }
        );
    }

    #[test]
    fn test_edge_tolerance_is_zoom_independent() {
        let mut v = view();
        v.x_range = 256.0;
        let t = Transport::default();
        let notes = [note(1, 64, 64, 64, true)];
        let y = v.pitch_to_y(64.5);
        let p = Point::new(v.tick_to_x(64.0) + EDGE_TOLERANCE - 1.0, y);
        assert_eq!(v.hit_test(p, &notes, &t, None).kind, HitKind::NoteStart(NoteId(1)));
        let p = Point::new(v.tick_to_x(64.0) + EDGE_TOLERANCE + 1.0, y);
        assert!(matches!(v.hit_test(p, &notes, &t, None).kind, HitKind::NoteBody { .. }));
    }

    #[test]
    fn test_clamp_pitch_window() {
        let mut v = view();
        v.y_range = 300.0;
        v.y_offset = -4.0;
        v.clamp();
        assert_eq!(v.y_range, 128.0);
        assert_eq!(v.y_offset, 0.0);

        v.y_range = 16.0;
        v.y_offset = 120.0;
        v.clamp();
        assert_eq!(v.y_offset, 112.0);
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor() {
        let mut v = view();
        v.x_offset = 8.0;
        v.wheel_zoom_x(12.0, true);
        assert!((v.x_range - 16.0 / 1.2).abs() < 1e-9);
        assert!((v.x_offset - (12.0 - 4.0 / 1.2)).abs() < 1e-9);
    }
}
