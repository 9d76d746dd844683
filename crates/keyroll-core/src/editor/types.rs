use crate::note::{Note, NoteId};
use crate::view::{Hit, Marker, Point};

/// Actions returned from the editor for the host to handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorAction {
    None,
    /// View, selection, marker or menu state changed
    Redraw,
    /// The note sequence changed
    NotesChanged,
    /// Euclidean fill chosen from the menu; the host owns the pattern
    EuclidFill { row: u8 },
    /// Press and release on the pitch ruler without dragging
    PitchRowClicked { row: u8 },
}

impl EditorAction {
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, EditorAction::None)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Button {
    #[default]
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl or Cmd
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false };
    pub const CTRL: Modifiers = Modifiers { shift: false, ctrl: true };
}

/// Pointer event in widget pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub pos: Point,
    pub button: Button,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            pos: Point::new(x, y),
            button: Button::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn secondary(x: f64, y: f64) -> Self {
        Self {
            button: Button::Secondary,
            ..Self::primary(x, y)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Secondary button, or primary with ctrl
    pub(super) fn is_context(&self) -> bool {
        self.button == Button::Secondary || self.modifiers.ctrl
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Which edge a resize gesture is dragging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// A note's position at gesture start
#[derive(Clone, Copy, Debug)]
pub(super) struct Grabbed {
    pub id: NoteId,
    pub start: u64,
    pub pitch: u8,
    pub duration: u64,
}

impl Grabbed {
    pub fn end(&self) -> u64 {
        self.start + self.duration
    }
}

impl From<&Note> for Grabbed {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            start: note.start_tick,
            pitch: note.pitch,
            duration: note.duration_ticks,
        }
    }
}

/// The single active pointer operation
#[derive(Clone, Debug, Default)]
pub(super) enum Operation {
    #[default]
    Idle,
    /// Rigid group move of the selection
    Move {
        anchor_tick: f64,
        anchor_row: i32,
        grabbed: Vec<Grabbed>,
        /// Store contents at gesture start; each step re-applies deltas to it
        base: Vec<Note>,
    },
    /// Resize of the selection by the same edge delta
    Resize {
        edge: Edge,
        reference: Grabbed,
        grabbed: Vec<Grabbed>,
        base: Vec<Note>,
    },
    /// Rubber-band selection; `secondary` opens the global menu on a click
    AreaSelect {
        from: Point,
        to: Point,
        from_hit: Hit,
        to_hit: Hit,
        secondary: bool,
    },
    /// Pan/zoom of the time axis
    TimeAxis {
        origin: Point,
        anchor: f64,
        offset: f64,
        range: f64,
    },
    /// Pan/zoom of the pitch axis
    PitchAxis {
        origin: Point,
        anchor: f64,
        offset: f64,
        range: f64,
        row: i32,
    },
    MarkerDrag {
        marker: Marker,
        origin_x: f64,
        origin_tick: u64,
    },
    /// Grid mode: paint cells under the pointer
    GridPaint,
    /// Grid mode: erase notes under the pointer
    GridErase,
    /// Draw mode: paint cells along the pointer path
    Draw,
    /// Gesture belongs to the open menu
    Menu { opened_here: bool },
}

/// Pointer-down bookkeeping for long-press promotion
#[derive(Clone, Debug)]
pub(super) struct Press {
    pub pos: Point,
    pub hit: Hit,
    pub snapshot: Vec<Note>,
    pub ticks: u32,
}
