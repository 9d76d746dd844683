//! Edit mode policy: insertion style × polyphony

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::KeyrollError;
use crate::note::{Note, NoteId};
use crate::store::NoteStore;

/// How pointer presses on empty space create notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertStyle {
    /// Click creates a note and hands it straight to an end-resize
    #[default]
    Drag,
    /// Click toggles a fixed-length note on the snapped cell
    Grid,
    /// Dragging paints a run of fixed-length notes along the pointer path
    Draw,
}

/// Whether insertion clears the target cell first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polyphony {
    #[default]
    Poly,
    Mono,
}

/// Active editing behavior, serialized as one of the combined mode names
/// (`dragpoly`, `gridmono`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EditMode {
    pub style: InsertStyle,
    pub polyphony: Polyphony,
}

impl EditMode {
    pub const fn new(style: InsertStyle, polyphony: Polyphony) -> Self {
        Self { style, polyphony }
    }

    pub fn is_mono(&self) -> bool {
        self.polyphony == Polyphony::Mono
    }

    pub fn is_grid(&self) -> bool {
        self.style == InsertStyle::Grid
    }

    /// Place a fixed-length note on a cell. Mono modes cut the cell out of any
    /// same-pitch notes first. Returns `None` when the pitch or tick is out of
    /// range.
    pub fn place_cell(
        &self,
        store: &mut NoteStore,
        start_tick: i64,
        pitch: i32,
        length: u64,
        velocity: u8,
    ) -> Option<NoteId> {
        if start_tick < 0 || !(0..=127).contains(&pitch) {
            return None;
        }
        if self.is_mono() {
            store.clear_span(start_tick as u64, length, pitch as u8);
        }
        trace!(start_tick, pitch, length, "place cell");
        store.add_note(start_tick, pitch, length as i64, velocity)
    }

    /// Start a drag-style insertion: the new note is appended selected and
    /// left unconstrained until the gesture commits.
    pub(crate) fn begin_drag_insert(
        &self,
        store: &mut NoteStore,
        start_tick: u64,
        pitch: u8,
        length: u64,
        velocity: u8,
    ) -> NoteId {
        if self.is_mono() {
            store.clear_span(start_tick, length, pitch);
        }
        store.clear_selection();
        store.push_unconstrained(Note::new(start_tick, pitch, length, velocity).selected(true))
    }
}

impl FromStr for EditMode {
    type Err = KeyrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (style, rest) = if let Some(rest) = s.strip_prefix("drag") {
            (InsertStyle::Drag, rest)
        } else if let Some(rest) = s.strip_prefix("grid") {
            (InsertStyle::Grid, rest)
        } else if let Some(rest) = s.strip_prefix("draw") {
            (InsertStyle::Draw, rest)
        } else {
            return Err(KeyrollError::InvalidConfig(format!("unknown edit mode '{s}'")));
        };
        let polyphony = match rest {
            "poly" => Polyphony::Poly,
            "mono" => Polyphony::Mono,
            _ => return Err(KeyrollError::InvalidConfig(format!("unknown edit mode '{s}'"))),
        };
        Ok(Self { style, polyphony })
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.style {
            InsertStyle::Drag => "drag",
            InsertStyle::Grid => "grid",
            InsertStyle::Draw => "draw",
        };
        let polyphony = match self.polyphony {
            Polyphony::Poly => "poly",
            Polyphony::Mono => "mono",
        };
        write!(f, "{style}{polyphony}")
    }
}

impl TryFrom<String> for EditMode {
    type Error = KeyrollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EditMode> for String {
    fn from(mode: EditMode) -> Self {
        mode.to_string()
    }
}
