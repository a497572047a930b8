//! # Modal State Machines
//!
//! ## Overview
//!
//! A [Modal] is the runtime state of a single mode. There are three kinds:
//!
//! - Sequence-matching modals walk a [Keymap] trie one key at a time, and use an optional
//!   timeout to disambiguate keys that are both a complete binding and the prefix of a longer
//!   one.
//! - Visual modals match keys the same way, and additionally remember the [VisualType] they
//!   were entered with.
//! - Search modals collect typed text until it gets confirmed.
//!
//! A modal only decides what a key or timeout resolves to, and returns it as a [Resolution].
//! Running the resolved action is left to the [Editor](crate::editor::Editor), so that the
//! action can switch modes while it runs. The modal is reset once the action has finished.
//!
//! Timers are represented as deadlines. Nothing fires on its own: the embedding program is
//! expected to call [Editor::check_timeout_at](crate::editor::Editor::check_timeout_at) once
//! [Modal::deadline] has passed.
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::action::Action;
use crate::errors::ModalError;
use crate::keymap::{Binding, Keymap};

/// The four roles an [Editor](crate::editor::Editor) can be in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ModeType {
    /// Normal mode.
    #[default]
    Normal,

    /// Insert mode.
    Insert,

    /// Visual mode.
    Visual,

    /// Search mode.
    Search,
}

impl ModeType {
    /// All modes, in the order that they get reset during a transition.
    pub const ALL: [ModeType; 4] =
        [ModeType::Normal, ModeType::Insert, ModeType::Visual, ModeType::Search];

    /// The lowercase name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeType::Normal => "normal",
            ModeType::Insert => "insert",
            ModeType::Visual => "visual",
            ModeType::Search => "search",
        }
    }
}

impl fmt::Display for ModeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeType {
    type Err = ModalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ModeType::Normal),
            "insert" => Ok(ModeType::Insert),
            "visual" => Ok(ModeType::Visual),
            "search" => Ok(ModeType::Search),
            _ => Err(ModalError::ModeNotFound(s.to_string())),
        }
    }
}

/// The shape of a visual selection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VisualType {
    /// Character-wise selection.
    #[default]
    #[serde(alias = "normal")]
    Plain,

    /// Line-wise selection.
    Line,

    /// Block-wise selection.
    Block,
}

/// How much of the buffer a search covers.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SearchRange {
    /// Only the current line.
    Line,

    /// The whole document.
    #[default]
    Document,
}

/// Which way a search goes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
    /// Search before the cursor.
    Before,

    /// Search after the cursor.
    #[default]
    After,

    /// Search from the start of the range.
    Start,

    /// Search in the opposite direction of the last search.
    Reverse,
}

/// Options passed along when entering a mode.
///
/// Every field is optional. Fields that a mode doesn't use are ignored, and fields that are
/// missing take their default value.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EnterOptions {
    /// The selection shape to use in Visual mode.
    pub visual_type: Option<VisualType>,

    /// The range to search over in Search mode.
    pub search_range: Option<SearchRange>,

    /// The direction to search in Search mode.
    pub search_direction: Option<SearchDirection>,

    /// Whether Search mode should confirm after a single character.
    pub single_char: Option<bool>,
}

/// A search confirmed in Search mode.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchQuery {
    /// The text to search for.
    pub text: String,

    /// The range to search over.
    pub range: SearchRange,

    /// The direction to search in.
    pub direction: SearchDirection,
}

/// What a key or an expired timeout resolved to.
#[derive(Debug)]
pub enum Resolution {
    /// The key was consumed, and nothing needs to run yet.
    Pending,

    /// Run this action with the modal's [key sequence](Modal::key_seq), then reset the modal.
    Run(Rc<Action>),

    /// The keys matched nothing and there is no handler for them. Reset the modal.
    Unhandled,

    /// Hand a confirmed search to the host. The modal is left as it is.
    Search(SearchQuery),
}

#[derive(Default)]
struct KeymapState {
    root: Keymap,
    layers: Vec<Keymap>,
    current: Option<Keymap>,
    deadline: Option<Instant>,
    on_default: Option<Rc<Action>>,
    on_timeout: Option<Rc<Action>>,
}

impl KeymapState {
    fn reset(&mut self) {
        self.current = None;
        self.deadline = None;
    }

    fn unmatched(&self, timeout: bool) -> Resolution {
        let handler = if timeout {
            self.on_timeout.as_ref().or(self.on_default.as_ref())
        } else {
            self.on_default.as_ref()
        };

        match handler {
            Some(action) => Resolution::Run(action.clone()),
            None => Resolution::Unhandled,
        }
    }
}

#[derive(Default)]
struct SearchState {
    text: String,
    range: SearchRange,
    direction: SearchDirection,
    single_char: bool,
    last: Option<SearchQuery>,
}

impl SearchState {
    fn latch(&mut self, options: &EnterOptions) {
        self.text.clear();
        self.range = options.search_range.unwrap_or_default();
        self.direction = options.search_direction.unwrap_or_default();
        self.single_char = options.single_char.unwrap_or(false);
    }
}

enum ModalKind {
    Keymap(KeymapState),
    Visual(KeymapState, VisualType),
    Search(SearchState),
}

/// The runtime state of a single mode.
pub struct Modal {
    name: String,
    timeout: Option<Duration>,
    key_seq: Vec<char>,
    kind: ModalKind,
}

impl Modal {
    fn new(name: &str, kind: ModalKind) -> Self {
        Modal { name: name.to_string(), timeout: None, key_seq: vec![], kind }
    }

    /// Create a sequence-matching modal with an empty keymap.
    pub fn keymap(name: &str) -> Self {
        Modal::new(name, ModalKind::Keymap(KeymapState::default()))
    }

    /// Create a visual modal with an empty keymap.
    pub fn visual(name: &str) -> Self {
        Modal::new(name, ModalKind::Visual(KeymapState::default(), VisualType::default()))
    }

    /// Create a search modal.
    pub fn search(name: &str) -> Self {
        Modal::new(name, ModalKind::Search(SearchState::default()))
    }

    /// Set how long to wait for a following key after typing a prefix.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The name of this modal.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// How long to wait for a following key after typing a prefix.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Change the timeout. This only affects prefixes typed afterwards.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// The keys typed since the last binding resolved.
    pub fn key_seq(&self) -> &[char] {
        self.key_seq.as_slice()
    }

    /// A short message to show the user: the pending keys, or the search text.
    pub fn message(&self) -> String {
        match &self.kind {
            ModalKind::Search(state) => state.text.clone(),
            _ => self.key_seq.iter().collect(),
        }
    }

    fn state(&self) -> Option<&KeymapState> {
        match &self.kind {
            ModalKind::Keymap(state) | ModalKind::Visual(state, _) => Some(state),
            ModalKind::Search(_) => None,
        }
    }

    fn state_mut(&mut self) -> Option<&mut KeymapState> {
        match &mut self.kind {
            ModalKind::Keymap(state) | ModalKind::Visual(state, _) => Some(state),
            ModalKind::Search(_) => None,
        }
    }

    /// The root keymap, for modals that match key sequences.
    pub fn keymap_root(&self) -> Option<&Keymap> {
        self.state().map(|state| &state.root)
    }

    /// Replace the root keymap, and drop any merged layers.
    pub fn set_keymap(&mut self, keymap: Keymap) {
        self.reset();

        if let Some(state) = self.state_mut() {
            state.root = keymap;
            state.layers.clear();
        }
    }

    /// Merge `keymap` into the root keymap.
    ///
    /// The modal holds on to `keymap` until its keymaps are cleared or replaced, so that back
    /// references pointing into it keep resolving.
    pub fn update_keymap(&mut self, keymap: &Keymap) {
        if let Some(state) = self.state_mut() {
            state.root.merge(keymap);
            state.layers.push(keymap.clone());
        }
    }

    /// Remove every binding from the root keymap, and drop any merged layers.
    pub fn clear_keymap(&mut self) {
        self.reset();

        if let Some(state) = self.state_mut() {
            state.root.clear();
            state.layers.clear();
        }
    }

    /// Set the action to run with the typed keys when they don't match any binding.
    pub fn set_default_handler(&mut self, action: Option<Action>) {
        if let Some(state) = self.state_mut() {
            state.on_default = action.map(Rc::new);
        }
    }

    /// Set the action to run with the typed keys when a prefix times out.
    ///
    /// When unset, the default handler runs instead.
    pub fn set_timeout_handler(&mut self, action: Option<Action>) {
        if let Some(state) = self.state_mut() {
            state.on_timeout = action.map(Rc::new);
        }
    }

    /// When the pending prefix will time out.
    pub fn deadline(&self) -> Option<Instant> {
        self.state().and_then(|state| state.deadline)
    }

    /// Whether a prefix has been typed and is waiting for more keys.
    pub fn is_pending(&self) -> bool {
        self.state().map_or(false, |state| state.current.is_some())
    }

    /// The selection shape, for visual modals.
    pub fn visual_type(&self) -> Option<VisualType> {
        match &self.kind {
            ModalKind::Visual(_, vt) => Some(*vt),
            _ => None,
        }
    }

    /// Change the selection shape of a visual modal.
    pub fn set_visual_type(&mut self, visual_type: VisualType) {
        if let ModalKind::Visual(_, vt) = &mut self.kind {
            *vt = visual_type;
        }
    }

    fn search_state(&self) -> Option<&SearchState> {
        match &self.kind {
            ModalKind::Search(state) => Some(state),
            _ => None,
        }
    }

    /// The text typed so far, for search modals.
    pub fn search_text(&self) -> Option<&str> {
        self.search_state().map(|state| state.text.as_str())
    }

    /// The range that the next search will cover.
    pub fn search_range(&self) -> Option<SearchRange> {
        self.search_state().map(|state| state.range)
    }

    /// The direction that the next search will go in.
    pub fn search_direction(&self) -> Option<SearchDirection> {
        self.search_state().map(|state| state.direction)
    }

    /// Whether the next key will confirm the search on its own.
    pub fn is_single_char(&self) -> bool {
        self.search_state().map_or(false, |state| state.single_char)
    }

    /// The last search that was confirmed.
    pub fn last_search(&self) -> Option<&SearchQuery> {
        self.search_state().and_then(|state| state.last.as_ref())
    }

    /// Forget any partially typed key sequence and cancel the pending timeout.
    ///
    /// Options latched on entry (the visual shape and search options) are kept.
    pub fn reset(&mut self) {
        self.key_seq.clear();

        if let Some(state) = self.state_mut() {
            state.reset();
        }
    }

    /// Called before this modal becomes the active one.
    pub fn will_enter(&mut self, options: &EnterOptions) {
        match &mut self.kind {
            ModalKind::Keymap(_) => {},
            ModalKind::Visual(_, vt) => {
                *vt = options.visual_type.unwrap_or_default();
            },
            ModalKind::Search(state) => {
                state.latch(options);
            },
        }
    }

    /// Called after this modal has become the active one.
    pub fn did_enter(&mut self) {
        tracing::trace!(modal = %self.name, "entered");
    }

    /// Called before this modal stops being the active one.
    pub fn will_leave(&mut self) {
        if let ModalKind::Search(state) = &mut self.kind {
            state.latch(&EnterOptions::default());
        }
    }

    /// Process a key typed at `now`.
    ///
    /// Whenever this returns [Resolution::Run] or [Resolution::Unhandled], the caller must
    /// [reset](Modal::reset) the modal afterwards, whether or not running the action succeeded.
    pub fn on_key(&mut self, key: char, now: Instant) -> Resolution {
        let timeout = self.timeout;

        match &mut self.kind {
            ModalKind::Keymap(state) | ModalKind::Visual(state, _) => {
                state.deadline = None;
                self.key_seq.push(key);

                let binding = match &state.current {
                    Some(keymap) => keymap.get_key(key),
                    None => state.root.get_key(key),
                };

                match binding {
                    Some(Binding::Keymap(keymap)) => {
                        state.current = Some(keymap);
                        state.deadline = timeout.map(|t| now + t);

                        tracing::trace!(
                            modal = %self.name,
                            keys = ?self.key_seq,
                            "waiting for more keys"
                        );

                        Resolution::Pending
                    },
                    Some(Binding::Action(action)) => {
                        state.current = None;

                        tracing::trace!(
                            modal = %self.name,
                            keys = ?self.key_seq,
                            "binding resolved"
                        );

                        Resolution::Run(action)
                    },
                    None => {
                        state.current = None;

                        tracing::trace!(
                            modal = %self.name,
                            keys = ?self.key_seq,
                            "no binding"
                        );

                        state.unmatched(false)
                    },
                }
            },
            ModalKind::Search(state) => {
                if key != '\n' {
                    if !state.single_char {
                        state.text.push(key);

                        return Resolution::Pending;
                    }

                    state.text = key.to_string();
                }

                let query = SearchQuery {
                    text: state.text.clone(),
                    range: state.range,
                    direction: state.direction,
                };
                state.last = Some(query.clone());

                tracing::debug!(modal = %self.name, text = %query.text, "search confirmed");

                Resolution::Search(query)
            },
        }
    }

    /// Check whether the pending timeout has expired by `now`.
    ///
    /// Returns `None` if it hasn't. Otherwise the timer is cleared, and the caller must run the
    /// resolution and then [reset](Modal::reset) the modal.
    pub fn on_timeout(&mut self, now: Instant) -> Option<Resolution> {
        let state = self.state_mut()?;

        match state.deadline {
            Some(deadline) if deadline <= now => {
                state.deadline = None;
                state.current = None;
            },
            _ => return None,
        }

        let resolution = state.unmatched(true);

        tracing::trace!(modal = %self.name, keys = ?self.key_seq, "prefix timed out");

        return Some(resolution);
    }
}

impl fmt::Debug for Modal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Modal")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("key_seq", &self.key_seq)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! ms {
        ($n: expr) => {
            Duration::from_millis($n)
        };
    }

    fn command(resolution: &Resolution) -> Option<String> {
        match resolution {
            Resolution::Run(action) => {
                match action.as_ref() {
                    Action::Command { name, .. } => Some(name.clone()),
                    Action::Function(_) => Some("<fn>".into()),
                    Action::Sequence(_) => Some("<seq>".into()),
                }
            },
            _ => None,
        }
    }

    fn gg_modal(timeout: Option<Duration>) -> Modal {
        let g = Keymap::new();
        g.set_key('g', Action::command("A"));

        let root = Keymap::new();
        root.set_key('g', g);
        root.set_key('x', Action::command("X"));

        let mut modal = Modal::keymap("normal").with_timeout(timeout);
        modal.set_keymap(root);
        modal.set_default_handler(Some(Action::command("default")));
        modal
    }

    #[test]
    fn test_resolve_action() {
        let mut modal = gg_modal(None);
        let now = Instant::now();

        let res = modal.on_key('x', now);
        assert_eq!(command(&res), Some("X".into()));

        // The keys stay visible until the caller has run the action.
        assert_eq!(modal.key_seq(), &['x']);
        assert!(!modal.is_pending());

        modal.reset();
        assert!(modal.key_seq().is_empty());
    }

    #[test]
    fn test_prefix_without_timeout_blocks() {
        let mut modal = gg_modal(None);
        let now = Instant::now();

        assert!(matches!(modal.on_key('g', now), Resolution::Pending));
        assert_eq!(modal.key_seq(), &['g']);
        assert_eq!(modal.deadline(), None);
        assert!(modal.on_timeout(now + ms!(10_000)).is_none());
        assert!(modal.is_pending());
    }

    #[test]
    fn test_prefix_timeout_fires_default_once() {
        let mut modal = gg_modal(Some(ms!(50)));
        let now = Instant::now();

        modal.on_key('g', now);
        assert_eq!(modal.deadline(), Some(now + ms!(50)));
        assert!(modal.on_timeout(now + ms!(49)).is_none());

        let res = modal.on_timeout(now + ms!(60)).unwrap();
        assert_eq!(command(&res), Some("default".into()));
        assert_eq!(modal.key_seq(), &['g']);
        assert_eq!(modal.deadline(), None);
        assert!(!modal.is_pending());

        modal.reset();

        // Already fired.
        assert!(modal.on_timeout(now + ms!(100)).is_none());

        // A fresh sequence can start immediately.
        assert_eq!(command(&modal.on_key('x', now + ms!(101))), Some("X".into()));
    }

    #[test]
    fn test_timeout_handler_preferred() {
        let mut modal = gg_modal(Some(ms!(50)));
        modal.set_timeout_handler(Some(Action::command("timeout")));

        let now = Instant::now();
        modal.on_key('g', now);

        let res = modal.on_timeout(now + ms!(50)).unwrap();
        assert_eq!(command(&res), Some("timeout".into()));
    }

    #[test]
    fn test_timeout_without_handlers() {
        let mut modal = gg_modal(Some(ms!(50)));
        modal.set_default_handler(None);

        let now = Instant::now();
        modal.on_key('g', now);

        assert!(matches!(modal.on_timeout(now + ms!(50)), Some(Resolution::Unhandled)));
    }

    #[test]
    fn test_disambiguation_by_extension() {
        let mut modal = gg_modal(Some(ms!(50)));
        let now = Instant::now();

        modal.on_key('g', now);
        let res = modal.on_key('g', now + ms!(20));

        assert_eq!(command(&res), Some("A".into()));
        assert_eq!(modal.deadline(), None);
        assert_eq!(modal.key_seq(), &['g', 'g']);

        modal.reset();
        assert!(modal.on_timeout(now + ms!(200)).is_none());
    }

    #[test]
    fn test_unbound_key_runs_default_with_sequence() {
        let mut modal = gg_modal(None);
        let now = Instant::now();

        modal.on_key('g', now);
        let res = modal.on_key('q', now);

        assert_eq!(command(&res), Some("default".into()));
        assert_eq!(modal.key_seq(), &['g', 'q']);

        modal.set_default_handler(None);
        modal.reset();
        assert!(matches!(modal.on_key('z', now), Resolution::Unhandled));
    }

    #[test]
    fn test_reset_cancels_timer() {
        let mut modal = gg_modal(Some(ms!(50)));
        let now = Instant::now();

        modal.on_key('g', now);
        modal.reset();

        assert!(modal.on_timeout(now + ms!(60)).is_none());
        assert_eq!(command(&modal.on_key('x', now)), Some("X".into()));
    }

    #[test]
    fn test_message() {
        let mut modal = gg_modal(None);

        modal.on_key('g', Instant::now());
        assert_eq!(modal.message(), "g");
    }

    #[test]
    fn test_layers_kept_until_cleared() {
        let mut modal = Modal::keymap("normal");
        let layer = Keymap::new();
        let z = Keymap::new();
        z.set_key('j', Action::command("scrollDown"));
        z.set_alias('z', &z);
        layer.set_key('z', z);

        let weak = layer.downgrade();
        modal.update_keymap(&layer);
        drop(layer);

        assert!(weak.upgrade().is_some());

        let now = Instant::now();
        modal.on_key('z', now);
        modal.on_key('z', now);
        assert_eq!(command(&modal.on_key('j', now)), Some("scrollDown".into()));

        modal.clear_keymap();
        assert!(weak.upgrade().is_none());
        assert!(modal.keymap_root().unwrap().is_empty());
    }

    #[test]
    fn test_visual_type_latched() {
        let mut modal = Modal::visual("visual");
        assert_eq!(modal.visual_type(), Some(VisualType::Plain));

        let options = EnterOptions { visual_type: Some(VisualType::Block), ..Default::default() };
        modal.will_enter(&options);
        modal.reset();
        modal.did_enter();
        assert_eq!(modal.visual_type(), Some(VisualType::Block));

        modal.will_enter(&EnterOptions::default());
        assert_eq!(modal.visual_type(), Some(VisualType::Plain));

        assert_eq!(Modal::keymap("normal").visual_type(), None);
    }

    #[test]
    fn test_search_accumulates_and_confirms() {
        let mut modal = Modal::search("search");
        modal.will_enter(&EnterOptions {
            search_direction: Some(SearchDirection::Before),
            ..Default::default()
        });

        let now = Instant::now();

        for c in "foo".chars() {
            assert!(matches!(modal.on_key(c, now), Resolution::Pending));
        }

        assert_eq!(modal.message(), "foo");

        let query = SearchQuery {
            text: "foo".into(),
            range: SearchRange::Document,
            direction: SearchDirection::Before,
        };

        match modal.on_key('\n', now) {
            Resolution::Search(q) => assert_eq!(q, query),
            other => panic!("expected a search, got {other:?}"),
        }

        assert_eq!(modal.search_text(), Some("foo"));
        assert_eq!(modal.last_search(), Some(&query));

        modal.will_leave();
        assert_eq!(modal.search_text(), Some(""));
        assert_eq!(modal.search_direction(), Some(SearchDirection::After));
        assert_eq!(modal.last_search(), Some(&query));
    }

    #[test]
    fn test_search_single_char() {
        let mut modal = Modal::search("search");
        modal.will_enter(&EnterOptions {
            search_range: Some(SearchRange::Line),
            single_char: Some(true),
            ..Default::default()
        });
        assert!(modal.is_single_char());

        match modal.on_key('x', Instant::now()) {
            Resolution::Search(q) => {
                assert_eq!(q.text, "x");
                assert_eq!(q.range, SearchRange::Line);
            },
            other => panic!("expected a search, got {other:?}"),
        }
    }

    #[test]
    fn test_mode_type_names() {
        for mode in ModeType::ALL {
            assert_eq!(mode.as_str().parse::<ModeType>(), Ok(mode));
        }

        assert_eq!(
            "replace".parse::<ModeType>(),
            Err(ModalError::ModeNotFound("replace".into()))
        );
        assert_eq!(ModeType::Visual.to_string(), "visual");
    }

    #[test]
    fn test_enter_options_deserialize() {
        let options: EnterOptions = serde_json::from_value(serde_json::json!({
            "visualType": "line",
            "searchRange": "line",
            "singleChar": true,
        }))
        .unwrap();

        assert_eq!(options.visual_type, Some(VisualType::Line));
        assert_eq!(options.search_range, Some(SearchRange::Line));
        assert_eq!(options.search_direction, None);
        assert_eq!(options.single_char, Some(true));
    }
}
