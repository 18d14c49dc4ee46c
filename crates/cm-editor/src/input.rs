//! Input abstraction layer.
//!
//! Normalizes host mouse and keyboard events into a unified `InputEvent`
//! consumed by the interaction controller. Pointer coordinates are in screen
//! space (client pixels); the controller converts them where needed.

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown { x: f64, y: f64 },

    /// Pointer moved anywhere in the window.
    PointerMove { x: f64, y: f64 },

    /// Pointer released, possibly outside the canvas.
    PointerUp { x: f64, y: f64 },

    /// `key` is the `KeyboardEvent.key` value (e.g. `"Escape"`, `"Delete"`).
    /// `editing_text` is set when focus is in a host text field.
    Key {
        key: String,
        modifiers: Modifiers,
        editing_text: bool,
    },
}

impl InputEvent {
    pub fn from_pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn from_pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn from_pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(key: impl Into<String>, modifiers: Modifiers, editing_text: bool) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
            editing_text,
        }
    }
}
