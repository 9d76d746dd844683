//! Editor: gesture state machine, keyboard shortcuts and context menu over a
//! note store
//!
//! Every input handler returns an [`EditorAction`]. Handlers never fail;
//! input that maps to nothing is absorbed.

mod input;
mod keys;
mod menu;
mod types;

pub use menu::{ContextMenu, MenuItem, MENU_ITEM_HEIGHT, MENU_ITEM_WIDTH, MENU_OFFSET};
pub use types::{Button, Edge, EditorAction, Key, KeyEvent, Modifiers, PointerEvent};

use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::edit_mode::EditMode;
use crate::error::Result;
use crate::notation::Notation;
use crate::note::Note;
use crate::playback::{NoteSink, PlaybackScheduler};
use crate::store::NoteStore;
use crate::transform::{self, Target};
use crate::transport::Transport;
use crate::view::{Rect, View};

use types::{Operation, Press};

/// Long-press timer ticks before the menu opens
pub const LONG_PRESS_TICKS: u32 = 18;
/// Long-press timer period in milliseconds
pub const LONG_PRESS_INTERVAL_MS: u64 = 100;
/// Pointer travel (pixels) that cancels a long press or turns a click into a drag
pub const CLICK_TOLERANCE: f64 = 4.0;

/// Note sequencer editor state
pub struct Editor {
    config: EditorConfig,
    store: NoteStore,
    view: View,
    transport: Transport,
    operation: Operation,
    press: Option<Press>,
    menu: Option<ContextMenu>,
    rng: fastrand::Rng,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let mut editor = Self {
            store: NoteStore::new(config.monophonic),
            view: View::default(),
            transport: Transport::default(),
            operation: Operation::Idle,
            press: None,
            menu: None,
            rng: fastrand::Rng::new(),
            config: EditorConfig::default(),
        };
        editor.apply_config(config);
        editor
    }

    /// Replace the random source used by random fill
    pub fn with_rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = rng;
        self
    }

    /// Apply host configuration and recompute layout. Out-of-range values are
    /// clamped; the transport cursor and the notes are kept.
    pub fn apply_config(&mut self, config: EditorConfig) {
        self.view = View {
            width: config.width.max(config.y_ruler + config.kb_width + 1.0),
            height: config.height.max(config.x_ruler + 1.0),
            x_ruler: config.x_ruler.max(0.0),
            y_ruler: config.y_ruler.max(0.0),
            kb_width: config.kb_width.max(0.0),
            x_offset: config.x_offset,
            x_range: config.x_range,
            y_offset: config.y_offset,
            y_range: config.y_range,
        };
        self.view.clamp();

        let cursor = self.transport.cursor;
        self.transport = Transport::new(config.tempo, config.timebase);
        self.transport.set_loop(config.loop_start, config.loop_end);
        self.transport.show_cursor = config.show_cursor;
        self.transport.cursor = cursor;

        if self.store.is_monophonic() != config.monophonic {
            self.store.set_monophonic(config.monophonic);
        }
        debug!(mode = %config.edit_mode, grid = %config.grid, "editor config applied");
        self.config = config;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn edit_mode(&self) -> EditMode {
        self.config.edit_mode
    }

    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.config.edit_mode = mode;
    }

    /// Grid/snap quantum in ticks
    pub fn grid_ticks(&self) -> u64 {
        self.config.grid.ticks(self.transport.timebase)
    }

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NoteStore {
        &mut self.store
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    /// True when no pointer gesture is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self.operation, Operation::Idle)
    }

    /// Pixel rectangle of an in-progress area selection
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.operation {
            Operation::AreaSelect { from, to, .. } => Some(Rect::new(
                from.x.min(to.x),
                from.y.min(to.y),
                (from.x - to.x).abs(),
                (from.y - to.y).abs(),
            )),
            _ => None,
        }
    }

    // -- Bulk operations --

    pub fn duplicate(&mut self, target: Target) -> EditorAction {
        transform::duplicate(&mut self.store, target);
        EditorAction::NotesChanged
    }

    pub fn reverse(&mut self, target: Target) -> EditorAction {
        transform::reverse(&mut self.store, target);
        EditorAction::NotesChanged
    }

    pub fn invert(&mut self, target: Target) -> EditorAction {
        transform::invert(&mut self.store, target);
        EditorAction::NotesChanged
    }

    pub fn rescale(&mut self, target: Target, factor: f64) -> EditorAction {
        transform::rescale(&mut self.store, target, factor);
        EditorAction::NotesChanged
    }

    pub fn quantize(&mut self, target: Target) -> EditorAction {
        let grid = self.grid_ticks();
        transform::quantize(&mut self.store, target, grid);
        EditorAction::NotesChanged
    }

    pub fn set_velocity(&mut self, velocity: i32) -> EditorAction {
        transform::set_velocity(&mut self.store, velocity);
        EditorAction::NotesChanged
    }

    /// Randomly refill one pitch row inside the loop
    pub fn random_fill_row(&mut self, row: u8) -> EditorAction {
        let grid = self.grid_ticks();
        transform::random_fill_row(
            &mut self.store,
            row,
            self.transport.loop_start(),
            self.transport.loop_end(),
            grid,
            self.config.default_velocity,
            &mut self.rng,
        );
        EditorAction::NotesChanged
    }

    pub fn delete_selected(&mut self) -> EditorAction {
        if self.store.remove_selected().is_empty() {
            return EditorAction::None;
        }
        EditorAction::NotesChanged
    }

    // -- Persistence --

    fn notation(&self) -> Notation {
        Notation {
            timebase: self.transport.timebase,
            ..Notation::from(&self.config)
        }
    }

    /// Replace the sequence with parsed notation text; a tempo directive
    /// updates the transport
    pub fn load_notation(&mut self, text: &str) -> EditorAction {
        let decoded = self.notation().decode(text);
        if let Some(tempo) = decoded.tempo {
            self.transport.bpm = tempo;
            self.config.tempo = tempo;
        }
        self.store.replace_all(decoded.notes);
        info!(count = self.store.len(), "notation loaded");
        EditorAction::NotesChanged
    }

    pub fn to_notation(&self) -> String {
        self.notation().encode(self.store.notes(), self.transport.bpm)
    }

    pub fn load_json(&mut self, json: &str) -> Result<EditorAction> {
        self.store.load_json(json)?;
        Ok(EditorAction::NotesChanged)
    }

    pub fn to_json(&self) -> Result<String> {
        self.store.to_json()
    }

    // -- Playback --

    /// Run one scheduler poll against this editor's notes and transport
    pub fn poll_playback(&mut self, scheduler: &mut PlaybackScheduler, now: f64, sink: &mut impl NoteSink) -> usize {
        scheduler.poll(now, self.store.notes(), &mut self.transport, sink)
    }

    /// Start `scheduler` from `tick`, or from the transport cursor
    pub fn start_playback(&mut self, scheduler: &mut PlaybackScheduler, now: f64, tick: Option<u64>) -> bool {
        scheduler.start(now, tick, &mut self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridResolution;
    use crate::overlap::has_overlaps;
    use crate::view::Point;

    fn editor(mode: &str, monophonic: bool) -> Editor {
        Editor::new(EditorConfig {
            edit_mode: mode.parse().unwrap(),
            grid: GridResolution::Quarter,
            monophonic,
            ..EditorConfig::default()
        })
    }

    fn at(editor: &Editor, tick: f64, pitch: f64) -> (f64, f64) {
        (editor.view().tick_to_x(tick), editor.view().pitch_to_y(pitch))
    }

    fn down(editor: &mut Editor, tick: f64, pitch: f64) -> EditorAction {
        let (x, y) = at(editor, tick, pitch);
        editor.pointer_down(PointerEvent::primary(x, y))
    }

    fn drag(editor: &mut Editor, tick: f64, pitch: f64) -> EditorAction {
        let (x, y) = at(editor, tick, pitch);
        editor.pointer_move(PointerEvent::primary(x, y))
    }

    fn up(editor: &mut Editor, tick: f64, pitch: f64) -> EditorAction {
        let (x, y) = at(editor, tick, pitch);
        editor.pointer_up(PointerEvent::primary(x, y))
    }

    fn spans(editor: &Editor) -> Vec<(u64, u8, u64)> {
        editor
            .notes()
            .iter()
            .map(|n| (n.start_tick, n.pitch, n.duration_ticks))
            .collect()
    }

    #[test]
    fn test_drag_insert_then_resize() {
        let mut ed = editor("dragpoly", false);
        assert_eq!(down(&mut ed, 2.5, 64.5), EditorAction::NotesChanged);
        assert_eq!(spans(&ed), vec![(0, 64, 4)]);
        assert!(ed.notes()[0].selected);

        drag(&mut ed, 11.5, 64.5);
        assert_eq!(up(&mut ed, 11.5, 64.5), EditorAction::NotesChanged);
        assert_eq!(spans(&ed), vec![(0, 64, 12)]);
        assert!(ed.is_idle());
    }

    #[test]
    fn test_move_selection_snaps_to_grid() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(0, 60, 4, 100).selected(true));

        down(&mut ed, 1.5, 60.5);
        drag(&mut ed, 5.6, 62.5);
        up(&mut ed, 5.6, 62.5);
        assert_eq!(spans(&ed), vec![(4, 62, 4)]);
    }

    #[test]
    fn test_mono_move_is_non_destructive_until_release() {
        let mut ed = editor("dragmono", true);
        ed.store_mut().insert(Note::new(0, 60, 4, 100).selected(true));
        ed.store_mut().insert(Note::new(4, 60, 4, 100));

        down(&mut ed, 1.5, 60.5);
        drag(&mut ed, 5.5, 60.5);
        assert_eq!(spans(&ed), vec![(4, 60, 4)]);
        assert!(!has_overlaps(ed.notes()));

        drag(&mut ed, 1.5, 60.5);
        assert_eq!(spans(&ed), vec![(0, 60, 4), (4, 60, 4)]);
        up(&mut ed, 1.5, 60.5);
        assert_eq!(ed.notes().len(), 2);
    }

    #[test]
    fn test_grid_paint_and_erase() {
        let mut ed = editor("gridpoly", false);
        down(&mut ed, 0.5, 60.5);
        drag(&mut ed, 4.5, 60.5);
        drag(&mut ed, 8.5, 60.5);
        assert_eq!(up(&mut ed, 8.5, 60.5), EditorAction::NotesChanged);
        assert_eq!(spans(&ed), vec![(0, 60, 4), (4, 60, 4), (8, 60, 4)]);

        down(&mut ed, 4.5, 60.5);
        up(&mut ed, 4.5, 60.5);
        assert_eq!(spans(&ed), vec![(0, 60, 4), (8, 60, 4)]);
    }

    #[test]
    fn test_grid_mono_cell_replaces_same_pitch() {
        let mut ed = editor("gridmono", true);
        ed.store_mut().insert(Note::new(2, 60, 1, 100));
        ed.store_mut().insert(Note::new(3, 60, 4, 100));
        ed.store_mut().insert(Note::new(0, 62, 4, 100));

        down(&mut ed, 0.5, 60.5);
        up(&mut ed, 0.5, 60.5);
        assert!(!has_overlaps(ed.notes()));
        let mut got = spans(&ed);
        got.sort();
        assert_eq!(got, vec![(0, 60, 4), (0, 62, 4), (4, 60, 3)]);
    }

    #[test]
    fn test_long_press_restores_and_opens_menu() {
        let mut ed = editor("dragpoly", false);
        down(&mut ed, 2.5, 64.5);
        assert_eq!(ed.notes().len(), 1);

        for _ in 1..LONG_PRESS_TICKS {
            assert_eq!(ed.long_press_tick(), EditorAction::None);
        }
        assert_eq!(ed.long_press_tick(), EditorAction::Redraw);
        assert!(ed.notes().is_empty());
        let menu = ed.menu().cloned().unwrap();
        assert!(menu.global);
        assert_eq!(menu.row, 64);

        // Releasing off the menu leaves it open
        up(&mut ed, 2.5, 64.5);
        assert!(ed.menu().is_some());
        assert!(ed.is_idle());
    }

    #[test]
    fn test_travel_cancels_long_press() {
        let mut ed = editor("dragpoly", false);
        down(&mut ed, 2.5, 64.5);
        drag(&mut ed, 6.5, 64.5);
        for _ in 0..LONG_PRESS_TICKS {
            assert_eq!(ed.long_press_tick(), EditorAction::None);
        }
        assert!(ed.menu().is_none());
    }

    #[test]
    fn test_note_menu_commits_duplicate() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(0, 60, 4, 100));

        let (x, y) = at(&ed, 1.5, 60.5);
        assert_eq!(ed.pointer_down(PointerEvent::secondary(x, y)), EditorAction::Redraw);
        assert_eq!(ed.pointer_up(PointerEvent::secondary(x, y)), EditorAction::None);
        let menu = ed.menu().cloned().unwrap();
        assert!(!menu.global);
        assert!(ed.notes()[0].selected);

        let item = menu.item_rect(1);
        let p = Point::new(item.x + item.width / 2.0, item.y + item.height / 2.0);
        ed.pointer_down(PointerEvent::primary(p.x, p.y));
        assert_eq!(ed.pointer_up(PointerEvent::primary(p.x, p.y)), EditorAction::NotesChanged);

        assert!(ed.menu().is_none());
        assert_eq!(spans(&ed), vec![(0, 60, 4), (4, 60, 4)]);
        assert!(!ed.notes()[0].selected && ed.notes()[1].selected);
    }

    #[test]
    fn test_menu_hover_tracks_item_under_pointer() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(0, 60, 4, 100));

        let (x, y) = at(&ed, 1.5, 60.5);
        ed.pointer_down(PointerEvent::secondary(x, y));
        let item = ed.menu().cloned().unwrap().item_rect(2);
        let p = Point::new(item.x + item.width / 2.0, item.y + item.height / 2.0);

        assert_eq!(ed.pointer_move(PointerEvent::secondary(p.x, p.y)), EditorAction::Redraw);
        assert_eq!(ed.menu().unwrap().hover, Some(MenuItem::Reverse));
        assert_eq!(ed.pointer_move(PointerEvent::secondary(p.x + 2.0, p.y + 2.0)), EditorAction::None);
        assert_eq!(ed.menu().unwrap().hover, Some(MenuItem::Reverse));
    }

    #[test]
    fn test_long_press_on_note_opens_note_menu() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(0, 60, 4, 100));

        down(&mut ed, 1.5, 60.5);
        for _ in 1..LONG_PRESS_TICKS {
            ed.long_press_tick();
        }
        assert_eq!(ed.long_press_tick(), EditorAction::Redraw);
        let menu = ed.menu().cloned().unwrap();
        assert!(!menu.global);
        assert_eq!(menu.row, 60);
        assert_eq!(spans(&ed), vec![(0, 60, 4)]);
        assert!(ed.notes()[0].selected);
    }

    #[test]
    fn test_resize_past_start_flips_note() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(4, 60, 4, 100).selected(true));

        down(&mut ed, 8.0, 60.5);
        drag(&mut ed, 0.2, 60.5);
        assert_eq!(up(&mut ed, 0.2, 60.5), EditorAction::NotesChanged);
        assert_eq!(spans(&ed), vec![(0, 60, 4)]);
    }

    #[test]
    fn test_time_ruler_drag_zooms_around_grabbed_tick() {
        let mut ed = editor("dragpoly", false);
        let x = ed.view().tick_to_x(8.0);
        ed.pointer_down(PointerEvent::primary(x, 10.0));
        ed.pointer_move(PointerEvent::primary(x - 36.0, 30.0));

        assert!(ed.view().x_range < 16.0);
        assert!((ed.view().x_to_tick(x - 36.0) - 8.0).abs() < 1e-9);
        ed.pointer_up(PointerEvent::primary(x - 36.0, 30.0));
        assert!(ed.is_idle());
    }

    #[test]
    fn test_pitch_ruler_drag_zooms_around_grabbed_pitch() {
        let mut ed = editor("dragpoly", false);
        let y = ed.view().pitch_to_y(68.0);
        ed.pointer_down(PointerEvent::primary(10.0, y));
        ed.pointer_move(PointerEvent::primary(30.0, y + 18.5));

        assert!(ed.view().y_range < 16.0);
        assert!((ed.view().y_to_pitch(y + 18.5) - 68.0).abs() < 1e-9);
    }

    #[test]
    fn test_oversized_note_load_is_dropped() {
        let mut ed = editor("dragpoly", false);
        ed.load_json(r#"[{"start_tick":18446744073709551615,"pitch":60,"duration_ticks":4,"velocity":100}]"#)
            .unwrap();
        assert!(ed.notes().is_empty());
        assert_eq!(down(&mut ed, 1.5, 60.5), EditorAction::NotesChanged);
    }

    #[test]
    fn test_global_menu_from_secondary_click() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(0, 60, 4, 100).selected(true));

        let (x, y) = at(&ed, 8.5, 70.5);
        ed.pointer_down(PointerEvent::secondary(x, y));
        ed.pointer_up(PointerEvent::secondary(x, y));
        assert!(ed.menu().is_some_and(|m| m.global));
        assert!(!ed.notes()[0].selected);

        assert_eq!(ed.commit_menu(MenuItem::Delete), EditorAction::Redraw);
        assert_eq!(ed.notes().len(), 1);

        ed.pointer_down(PointerEvent::secondary(x, y));
        ed.pointer_up(PointerEvent::secondary(x, y));
        assert_eq!(ed.commit_menu(MenuItem::EuclidFill), EditorAction::EuclidFill { row: 70 });
    }

    #[test]
    fn test_secondary_drag_selects_area() {
        let mut ed = editor("dragpoly", false);
        ed.store_mut().insert(Note::new(1, 61, 2, 100));
        ed.store_mut().insert(Note::new(5, 61, 2, 100));
        ed.store_mut().insert(Note::new(1, 70, 2, 100));

        let (x1, y1) = at(&ed, 0.2, 60.2);
        let (x2, y2) = at(&ed, 4.0, 63.9);
        ed.pointer_down(PointerEvent::secondary(x1, y1));
        ed.pointer_move(PointerEvent::secondary(x2, y2));
        assert!(ed.selection_rect().is_some());
        ed.pointer_up(PointerEvent::secondary(x2, y2));

        let selected: Vec<(u64, u8)> = ed
            .notes()
            .iter()
            .filter(|n| n.selected)
            .map(|n| (n.start_tick, n.pitch))
            .collect();
        assert_eq!(selected, vec![(1, 61)]);
        assert!(ed.menu().is_none());
    }

    #[test]
    fn test_loop_marker_drag() {
        let mut ed = editor("dragpoly", false);
        let x = ed.view().tick_to_x(0.0);
        ed.transport_mut().show_cursor = false;
        ed.pointer_down(PointerEvent::primary(x + 2.0, 10.0));
        let step = ed.view().step_w();
        ed.pointer_move(PointerEvent::primary(x + 2.0 + 4.0 * step, 10.0));
        ed.pointer_up(PointerEvent::primary(x + 2.0 + 4.0 * step, 10.0));
        assert_eq!(ed.transport().loop_start(), 4);
    }

    #[test]
    fn test_pitch_ruler_click_reports_row() {
        let mut ed = editor("dragpoly", false);
        let y = ed.view().pitch_to_y(65.5);
        ed.pointer_down(PointerEvent::primary(10.0, y));
        assert_eq!(ed.pointer_up(PointerEvent::primary(10.0, y)), EditorAction::PitchRowClicked { row: 65 });
    }

    #[test]
    fn test_disabled_editor_ignores_input() {
        let mut ed = Editor::new(EditorConfig {
            enabled: false,
            ..EditorConfig::default()
        });
        assert_eq!(down(&mut ed, 2.5, 64.5), EditorAction::None);
        assert!(ed.notes().is_empty());
    }

    #[test]
    fn test_notation_load_sets_tempo() {
        let mut ed = Editor::default();
        ed.load_notation("t90o4l8cdefgab");
        assert_eq!(ed.transport().bpm, 90.0);
        assert_eq!(ed.notes().len(), 7);
        assert!(ed.to_notation().starts_with("t90o4l8c"));
    }
}
