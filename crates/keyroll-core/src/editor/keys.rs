use tracing::debug;

use super::types::{EditorAction, Key, KeyEvent};
use super::Editor;
use crate::transform::{self, Target};

impl Editor {
    /// Keyboard shortcuts. Ignored while disabled or mid-gesture.
    pub fn key_down(&mut self, ev: KeyEvent) -> EditorAction {
        if !self.config.enabled || !self.is_idle() {
            return EditorAction::None;
        }
        let shift = ev.modifiers.shift;
        match ev.key {
            Key::Char('a') | Key::Char('A') if ev.modifiers.ctrl => {
                self.store.select_all();
                EditorAction::Redraw
            }
            Key::Delete | Key::Backspace => self.delete_selected(),
            Key::Left | Key::Right => {
                if !self.store.has_selection() {
                    return EditorAction::None;
                }
                let step = if shift { 1 } else { self.grid_ticks() as i64 };
                let delta = if ev.key == Key::Left { -step } else { step };
                debug!(delta, "nudge");
                transform::nudge_selected(&mut self.store, delta);
                EditorAction::NotesChanged
            }
            Key::Up | Key::Down => {
                if !self.store.has_selection() {
                    return EditorAction::None;
                }
                let step = if shift { 12 } else { 1 };
                let delta = if ev.key == Key::Down { -step } else { step };
                debug!(delta, "transpose");
                transform::transpose_selected(&mut self.store, delta);
                EditorAction::NotesChanged
            }
            Key::Char('d') if !ev.modifiers.ctrl => self.duplicate(Target::Selection),
            Key::Char('q') if !ev.modifiers.ctrl => self.quantize(Target::Selection),
            _ => EditorAction::None,
        }
    }
}
