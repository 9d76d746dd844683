//! keyroll-core: Note model, editing engine and playback scheduling for a
//! piano-roll sequencer

pub mod config;
mod edit_mode;
pub mod editor;
mod error;
pub mod notation;
mod note;
pub mod overlap;
pub mod playback;
mod store;
pub mod transform;
mod transport;
pub mod view;

pub use config::{EditorConfig, GridResolution};
pub use edit_mode::{EditMode, InsertStyle, Polyphony};
pub use editor::{Button, Editor, EditorAction, Key, KeyEvent, MenuItem, Modifiers, PointerEvent};
pub use error::{KeyrollError, Result};
pub use notation::{Decoded, Notation};
pub use note::{Note, NoteId, MAX_PITCH, MAX_TICK};
pub use playback::{NoteSink, PlaybackScheduler, ScheduledNote, SchedulerConfig};
pub use store::NoteStore;
pub use transform::Target;
pub use transport::Transport;
pub use view::{Hit, HitKind, Marker, Point, Rect, View};
