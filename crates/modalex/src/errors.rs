//! # Error Types
//!
//! ## Overview
//!
//! This module contains the errors returned while compiling keymaps, while dispatching keys,
//! and while applying settings.
//!
//! Keymap compilation failures are reported with the path of configuration keys that led to
//! the bad value, so that they can be shown to the user alongside the offending layer.
use std::fmt;

/// Errors returned when a binding violates the keymap contract.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum KeymapError {
    /// A key symbol must be exactly one code point.
    #[error("Key must be a single character, but {0:?} was given")]
    NotSingleKey(String),
}

/// Errors produced by the host while executing commands, or by function actions.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum CommandError {
    /// The host does not know this command.
    #[error("Unknown command: {0}")]
    Unknown(String),

    /// The command was given arguments it cannot use.
    #[error("Invalid arguments for {0}")]
    InvalidArgument(String),

    /// Generic failure.
    #[error("Error: {0}")]
    Failed(String),
}

/// Errors returned while dispatching keys and switching modes.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum ModalError {
    /// Failure to find a mode with the requested name.
    #[error("Mode {0:?} not found")]
    ModeNotFound(String),

    /// Failure while running an action, a handler, or a search confirmation.
    #[error("Failed command: {0}")]
    Command(#[from] CommandError),
}

/// Position of a value within a keymap configuration object.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyPath(pub Vec<String>);

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }

        let parts: Vec<String> = self.0.iter().map(|k| format!("{k:?}")).collect();

        write!(f, "{}", parts.join(" > "))
    }
}

/// The different ways a keymap configuration can be malformed.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// A key range like `"a-z"` or `"a,c,e-g"` could not be parsed.
    #[error("Failed to parse keys {keys:?} at offset {offset}")]
    InvalidKeys {
        /// The configuration key text.
        keys: String,
        /// Character offset of the first unexpected input.
        offset: usize,
    },

    /// A value that should have been a keymap object was something else.
    #[error("Invalid keymap: {0}")]
    InvalidKeymap(String),

    /// A binding value that is none of the supported shapes.
    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    /// The `help` field was not a string.
    #[error("Invalid help: {0}")]
    InvalidHelp(String),

    /// The `id` field was not a string.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// A command's `args` was neither an object nor a string.
    #[error("Invalid args: {0}")]
    InvalidArgs(String),

    /// A command name was empty.
    #[error("Empty command name")]
    EmptyCommand,

    /// A back reference must be zero or negative.
    #[error("Back reference must be 0 or negative, but {0} was given")]
    PositiveBackReference(i64),

    /// A back reference must be an integer.
    #[error("Back reference must be an integer, but {0} was given")]
    InvalidBackReference(String),

    /// A back reference pointed above the outermost keymap.
    #[error("Back reference {index} is out of range (depth {depth})")]
    BackReferenceOutOfRange {
        /// The requested index.
        index: i64,
        /// How many keymaps were being compiled at that point.
        depth: usize,
    },
}

/// Failure to compile a keymap configuration.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[error("{kind} (at {path})")]
pub struct ParseError {
    /// Where in the configuration the failure happened.
    pub path: KeyPath,

    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(path: &[String], kind: ParseErrorKind) -> Self {
        ParseError { path: KeyPath(path.to_vec()), kind }
    }
}

/// A keymap layer that failed to compile while applying settings.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[error("{layer} {mode} keymaps: {error}")]
pub struct LayerError {
    /// Which configuration layer failed (for example, `"preset"` or `"inline"`).
    pub layer: String,

    /// Which mode the layer was for.
    pub mode: String,

    /// The compilation failure.
    pub error: ParseError,
}

/// Errors returned while reading and applying [Settings](crate::config::Settings).
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The settings document was not valid.
    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    /// One or more keymap layers failed to compile, and were skipped.
    #[error("{} keymap layer(s) failed to compile: {}", .0.len(), display_layers(.0))]
    Layers(Vec<LayerError>),
}

fn display_layers(errs: &[LayerError]) -> String {
    errs.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Common result type for key dispatch.
pub type ModalResult<V> = Result<V, ModalError>;

/// Common result type for host commands and function actions.
pub type CommandResult = Result<(), CommandError>;
