//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives in
//! Rust so the browser host and native tests resolve keys identically.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Leave arrow-linking mode, dropping any picked source.
    Cancel,
    /// Remove the selected company and its arrows.
    DeleteSelected,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// Returns `None` if the key combo has no binding. Combos with Ctrl, ⌘
    /// or Alt are left to the host (copy, reload and so on). While a text
    /// field has focus only Escape is bound; Delete belongs to the field.
    pub fn resolve(key: &str, modifiers: Modifiers, editing_text: bool) -> Option<ShortcutAction> {
        if modifiers.command() || modifiers.alt {
            return None;
        }
        match key {
            "Escape" => Some(ShortcutAction::Cancel),
            "Delete" if !editing_text => Some(ShortcutAction::DeleteSelected),
            _ => None,
        }
    }
}
