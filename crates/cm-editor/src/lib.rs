pub mod editor;
pub mod input;
pub mod interaction;
pub mod shortcuts;

pub use editor::{Editor, EditorConfig, EditorError};
pub use input::{InputEvent, Modifiers};
pub use interaction::{
    InteractionController, LinkState, Mode, PromptRequest, Repaint, Response, StatusHint,
};
pub use shortcuts::{ShortcutAction, ShortcutMap};
