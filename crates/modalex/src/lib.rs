//! # modalex
//!
//! ## Overview
//!
//! This crate implements Vim-style modal key dispatch for text editors. Keys get routed to the
//! active mode, where they are matched against a trie of bindings, and resolved bindings run
//! commands in the host editor.
//!
//! The main pieces are:
//!
//! - [keymap::Keymap], a trie of bindings that later layers can be merged into
//! - [action::Action], what a binding does once it's been typed
//! - [parser::parse_keymap], which compiles declarative JSON configuration into keymaps
//! - [modal::Modal], the per-mode state machines
//! - [editor::Editor], which owns a modal for each mode and switches between them
//!
//! The engine never touches buffers itself: everything it resolves to gets passed to an
//! [host::EditorHost].
//!
//! ## Timeouts
//!
//! When a binding like `j` is also the prefix of a longer one like `jk`, a mode can be given a
//! timeout after which the typed prefix is handed to its timeout handler. Timeouts are
//! deadlines, so the embedding program should wait for input for at most
//! [editor::Editor::poll_timeout], and call [editor::Editor::check_timeout] when nothing
//! arrives.

// Require docs for public APIs, and disable the more annoying clippy lints.
#![deny(missing_docs)]
#![allow(clippy::bool_to_int_with_if)]
#![allow(clippy::field_reassign_with_default)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::needless_return)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod action;
pub mod config;
pub mod editor;
pub mod errors;
pub mod host;
pub mod keymap;
pub mod modal;
pub mod parser;
pub mod prelude;
pub mod presets;
