//! Keyboard shortcuts of the canvas.
//!
//! Keys are matched by their `KeyboardEvent.key` style names (`"n"`,
//! `"Escape"`, `"Delete"`). Letter keys compare case-insensitively.

use serde::{Deserialize, Serialize};

/// Editor command triggered by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    /// Enter box or polygon creation, depending on the QC mode
    StartCreation,
    /// Abort creation or the active drag
    Cancel,
    /// Delete the selected vertex or shape
    Delete,
}

/// Cancel is always bound to this key.
pub const CANCEL_KEY: &str = "Escape";

/// Delete is always bound to these keys.
pub const DELETE_KEYS: [&str; 2] = ["Delete", "Backspace"];

/// Configurable keybindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Hotkey for starting shape creation
    #[serde(default = "default_start_creation")]
    pub start_creation: String,
}

fn default_start_creation() -> String {
    "n".to_string()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            start_creation: default_start_creation(),
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the action that corresponds to a key press, if any.
    pub fn action_for_key(&self, key: &str) -> Option<EditorAction> {
        if key == CANCEL_KEY {
            Some(EditorAction::Cancel)
        } else if DELETE_KEYS.contains(&key) {
            Some(EditorAction::Delete)
        } else if key.eq_ignore_ascii_case(&self.start_creation) {
            Some(EditorAction::StartCreation)
        } else {
            None
        }
    }
}
