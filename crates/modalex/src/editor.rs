//! # Editor
//!
//! ## Overview
//!
//! An [Editor] owns one [Modal] for each [ModeType], tracks which one is active, and routes
//! keys to it. Commands that bindings resolve to are passed on to the [EditorHost].
//!
//! Switching modes always follows the same protocol:
//!
//! 1. The active modal's `will_leave` hook runs.
//! 2. The target modal's `will_enter` hook runs, and latches the [EnterOptions].
//! 3. All four modals are reset, discarding partially typed sequences and pending timeouts.
//! 4. The target becomes the active mode.
//! 5. The target modal's `did_enter` hook runs.
//! 6. Every [subscriber](Editor::subscribe) gets sent the new [ModeType].
//!
//! Re-entering the mode that's already active runs the full protocol as well.
//!
//! Actions run against the editor itself, so a built-in mode command in the middle of a
//! [Sequence](crate::action::Action::Sequence) completes the whole protocol before the next
//! step runs. The modal that resolved the action is reset once the action has finished.
//!
//! ## Example
//!
//! ```
//! use modalex::prelude::*;
//! use serde_json::Value;
//!
//! let mut commands = vec![];
//! let host = |cmd: &str, _: Option<&Value>, _: &mut ModeSwitch<'_>| -> CommandResult {
//!     commands.push(cmd.to_string());
//!     Ok(())
//! };
//!
//! let mut editor = Editor::new(host);
//! let keymap = parse_keymap(&serde_json::json!({
//!     "i": "modalex.enterInsert",
//!     "g": { "g": "cursorTop" },
//! }))
//! .unwrap();
//! editor.normal_mut().update_keymap(&keymap);
//!
//! editor.input_keys("gg").unwrap();
//! assert!(editor.is_normal());
//!
//! editor.input_keys("i").unwrap();
//! assert!(editor.is_insert());
//!
//! drop(editor);
//! assert_eq!(commands, vec!["cursorTop"]);
//! ```
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::action::{ActionContext, ActionTarget};
use crate::config::{KeymapLayers, Preset, Settings};
use crate::errors::{CommandResult, ConfigError, LayerError, ModalResult};
use crate::host::{EditorHost, ModeRequest, ModeSwitch};
use crate::modal::{EnterOptions, Modal, ModeType, Resolution, SearchQuery, VisualType};
use crate::presets;

/// Routes keys to the modal of the active mode.
pub struct Editor<H: EditorHost> {
    normal: Modal,
    insert: Modal,
    visual: Modal,
    search: Modal,

    mode: ModeType,
    host: H,
    subscribers: Vec<mpsc::Sender<ModeType>>,
}

impl<H: EditorHost> Editor<H> {
    /// Create an editor in Normal mode, with empty keymaps and no timeouts.
    pub fn new(host: H) -> Self {
        Editor {
            normal: Modal::keymap("normal"),
            insert: Modal::keymap("insert"),
            visual: Modal::visual("visual"),
            search: Modal::search("search"),

            mode: ModeType::Normal,
            host,
            subscribers: vec![],
        }
    }

    /// The host that commands get sent to.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The active mode.
    pub fn mode(&self) -> ModeType {
        self.mode
    }

    /// The modal for `mode`.
    pub fn modal(&self, mode: ModeType) -> &Modal {
        match mode {
            ModeType::Normal => &self.normal,
            ModeType::Insert => &self.insert,
            ModeType::Visual => &self.visual,
            ModeType::Search => &self.search,
        }
    }

    /// Mutable access to the modal for `mode`.
    pub fn modal_mut(&mut self, mode: ModeType) -> &mut Modal {
        match mode {
            ModeType::Normal => &mut self.normal,
            ModeType::Insert => &mut self.insert,
            ModeType::Visual => &mut self.visual,
            ModeType::Search => &mut self.search,
        }
    }

    /// The modal of the active mode.
    pub fn current(&self) -> &Modal {
        self.modal(self.mode)
    }

    /// The Normal mode modal.
    pub fn normal(&self) -> &Modal {
        &self.normal
    }

    /// The Insert mode modal.
    pub fn insert(&self) -> &Modal {
        &self.insert
    }

    /// The Visual mode modal.
    pub fn visual(&self) -> &Modal {
        &self.visual
    }

    /// The Search mode modal.
    pub fn search(&self) -> &Modal {
        &self.search
    }

    /// Mutable access to the Normal mode modal.
    pub fn normal_mut(&mut self) -> &mut Modal {
        &mut self.normal
    }

    /// Mutable access to the Insert mode modal.
    pub fn insert_mut(&mut self) -> &mut Modal {
        &mut self.insert
    }

    /// Mutable access to the Visual mode modal.
    pub fn visual_mut(&mut self) -> &mut Modal {
        &mut self.visual
    }

    /// Mutable access to the Search mode modal.
    pub fn search_mut(&mut self) -> &mut Modal {
        &mut self.search
    }

    /// Get notified of every completed mode switch.
    ///
    /// Dropping the [Receiver](mpsc::Receiver) unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ModeType> {
        let (tx, rx) = mpsc::channel();

        self.subscribers.push(tx);

        return rx;
    }

    /// Switch to `mode`.
    pub fn enter_mode(&mut self, mode: ModeType, options: EnterOptions) {
        let from = self.mode;

        tracing::debug!(%from, to = %mode, ?options, "entering mode");

        self.host.will_leave(from);
        self.modal_mut(from).will_leave();

        self.modal_mut(mode).will_enter(&options);
        self.host.will_enter(mode, &options);

        self.reset_all();
        self.mode = mode;

        self.modal_mut(mode).did_enter();
        self.host.did_enter(mode);

        self.subscribers.retain(|tx| tx.send(mode).is_ok());
    }

    /// Switch to the mode named `name`.
    pub fn enter_mode_named(&mut self, name: &str, options: EnterOptions) -> ModalResult<()> {
        let mode = name.parse::<ModeType>()?;

        self.enter_mode(mode, options);

        Ok(())
    }

    fn apply_requests(&mut self, requests: Vec<ModeRequest>) {
        for ModeRequest { mode, options } in requests {
            self.enter_mode(mode, options);
        }
    }

    fn resolve(&mut self, source: ModeType, resolution: Resolution) -> CommandResult {
        match resolution {
            Resolution::Pending => Ok(()),
            Resolution::Unhandled => {
                self.modal_mut(source).reset();

                Ok(())
            },
            Resolution::Run(action) => {
                let keys = self.modal(source).key_seq().to_vec();
                let name = self.modal(source).name().to_string();

                let res = action.exec(&mut ActionContext::new(self, &name), &keys);

                // The action may have switched modes, but the keys it consumed belong to source.
                self.modal_mut(source).reset();

                res
            },
            Resolution::Search(query) => {
                let mut requests = vec![];
                let res = self.host.search(&query, &mut ModeSwitch::new(self.mode, &mut requests));

                self.apply_requests(requests);

                res
            },
        }
    }

    /// Process a key typed at `now`.
    ///
    /// Mode switches requested by an action take effect before its next step runs, and stay in
    /// effect when a later step fails. The failure is then returned.
    pub fn input_key_at(&mut self, key: char, now: Instant) -> ModalResult<()> {
        tracing::trace!(mode = %self.mode, ?key, "key");

        let source = self.mode;
        let resolution = self.modal_mut(source).on_key(key, now);

        Ok(self.resolve(source, resolution)?)
    }

    /// Process a key typed now.
    pub fn input_key(&mut self, key: char) -> ModalResult<()> {
        self.input_key_at(key, Instant::now())
    }

    /// Process each character of `keys` in order, stopping at the first failure.
    pub fn input_keys(&mut self, keys: &str) -> ModalResult<()> {
        for key in keys.chars() {
            self.input_key(key)?;
        }

        Ok(())
    }

    /// Fire the active modal's pending timeout if it has expired by `now`.
    ///
    /// Returns whether it fired.
    pub fn check_timeout_at(&mut self, now: Instant) -> ModalResult<bool> {
        let source = self.mode;
        let Some(resolution) = self.modal_mut(source).on_timeout(now) else {
            return Ok(false);
        };

        self.resolve(source, resolution)?;

        Ok(true)
    }

    /// Fire the active modal's pending timeout if it has expired.
    pub fn check_timeout(&mut self) -> ModalResult<bool> {
        self.check_timeout_at(Instant::now())
    }

    /// When the active modal's pending timeout expires.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.current().deadline()
    }

    /// How long a caller can wait for the next key before calling
    /// [check_timeout](Editor::check_timeout).
    pub fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        self.next_deadline().map(|deadline| deadline.saturating_duration_since(now))
    }

    /// The keys typed in the active mode since the last binding resolved.
    pub fn current_key_seq(&self) -> &[char] {
        self.current().key_seq()
    }

    /// Whether the editor is in Normal mode.
    pub fn is_normal(&self) -> bool {
        self.mode == ModeType::Normal
    }

    /// Whether the editor is in Insert mode.
    pub fn is_insert(&self) -> bool {
        self.mode == ModeType::Insert
    }

    /// Whether the editor is in Visual mode, optionally with a specific selection shape.
    pub fn is_visual(&self, visual_type: Option<VisualType>) -> bool {
        if self.mode != ModeType::Visual {
            return false;
        }

        match visual_type {
            None => true,
            Some(vt) => self.visual.visual_type() == Some(vt),
        }
    }

    /// Whether the editor is in Search mode.
    pub fn is_search(&self) -> bool {
        self.mode == ModeType::Search
    }

    /// Reset the active modal.
    pub fn reset_current(&mut self) {
        self.modal_mut(self.mode).reset();
    }

    /// Reset every modal.
    pub fn reset_all(&mut self) {
        for mode in ModeType::ALL {
            self.modal_mut(mode).reset();
        }
    }

    /// Remove every binding from the Normal, Insert and Visual keymaps.
    pub fn clear_keymaps_all(&mut self) {
        self.normal.clear_keymap();
        self.insert.clear_keymap();
        self.visual.clear_keymap();
    }

    fn update_layer(&mut self, layer: &str, layers: &KeymapLayers, errors: &mut Vec<LayerError>) {
        for (mode, keymap) in layers.compile(layer, errors) {
            tracing::debug!(layer, %mode, keys = keymap.len(), "merging keymap layer");

            self.modal_mut(mode).update_keymap(&keymap);
        }
    }

    /// Merge keymaps into the Normal, Insert and Visual modals.
    ///
    /// Each mode's configuration is compiled on its own, so one that fails doesn't stop the
    /// others from being merged.
    pub fn update_keymaps(&mut self, layers: &KeymapLayers) -> Result<(), ConfigError> {
        let mut errors = vec![];

        self.update_layer("keymaps", layers, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Layers(errors))
        }
    }

    /// Merge a built-in preset's keymaps.
    pub fn apply_preset(&mut self, preset: Preset) -> Result<(), ConfigError> {
        let mut errors = vec![];

        if let Some(layers) = presets::layers(preset) {
            self.update_layer("preset", &layers, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Layers(errors))
        }
    }

    /// Replace the keymaps and Insert mode timeout with those described by `settings`.
    ///
    /// Layers that fail to compile are skipped, and reported together once the rest have
    /// been applied.
    pub fn update_from_settings(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        let mut errors = vec![];

        self.insert.set_timeout(settings.insert_timeout());
        self.clear_keymaps_all();

        if let Some(layers) = presets::layers(settings.preset) {
            self.update_layer("preset", &layers, &mut errors);
        }

        if let Some(layers) = &settings.custom_keymaps {
            self.update_layer("custom", layers, &mut errors);
        }

        self.update_layer("inline", &settings.inline_keymaps(), &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Layers(errors))
        }
    }

    /// The active modal's message: the pending keys, or the search text.
    pub fn message(&self) -> String {
        self.current().message()
    }

    /// Text for a status line, like `-- NORMAL --` or `-- SEARCH --: foo`.
    pub fn status_text(&self) -> String {
        let mode = self.mode.as_str().to_uppercase();
        let msg = self.message();

        if msg.is_empty() {
            format!("-- {mode} --")
        } else {
            format!("-- {mode} --: {msg}")
        }
    }

    /// The last search confirmed in Search mode.
    pub fn last_search(&self) -> Option<&SearchQuery> {
        self.search.last_search()
    }
}

impl<H: EditorHost> ActionTarget for Editor<H> {
    fn mode(&self) -> ModeType {
        self.mode
    }

    fn run_command(&mut self, command: &str, args: Option<&Value>) -> CommandResult {
        let mut requests = vec![];
        let res = self.host.execute(command, args, &mut ModeSwitch::new(self.mode, &mut requests));

        self.apply_requests(requests);

        res
    }

    fn switch_mode(&mut self, mode: ModeType, options: EnterOptions) {
        Editor::enter_mode(self, mode, options);
    }
}
