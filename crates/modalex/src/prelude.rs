//! # Common types
//!
//! Usually you will just want to import everything in this module via:
//!
//! ```
//! use modalex::prelude::*;
//! ```
pub use crate::action::{Action, ActionContext};
pub use crate::config::{CursorStyle, KeymapLayers, Preset, Settings};
pub use crate::editor::Editor;
pub use crate::errors::{
    CommandError,
    CommandResult,
    ConfigError,
    ModalError,
    ModalResult,
    ParseError,
    ParseErrorKind,
};
pub use crate::host::{EditorHost, ModeSwitch};
pub use crate::keymap::{Binding, Keymap, WeakKeymap};
pub use crate::modal::{
    EnterOptions,
    ModeType,
    Resolution,
    SearchDirection,
    SearchQuery,
    SearchRange,
    VisualType,
};
pub use crate::parser::parse_keymap;
