//! # Keymap tries
//!
//! ## Overview
//!
//! A [Keymap] maps single key symbols to either another [Keymap] or to a leaf [Action]. Modes
//! walk these tries one key at a time while matching a multi-key binding.
//!
//! [Keymap] values are handles: cloning one produces another reference to the same node, so
//! sub-tries copied in by [Keymap::merge] share identity with the keymaps they came from.
//!
//! Back references created by the [parser](crate::parser) are bound with [Keymap::set_alias].
//! An alias resolves to the same node as the keymap it points at, but doesn't keep that node
//! alive, so a keymap that refers back to one of its ancestors never forms an ownership cycle.
//!
//! ## Merging
//!
//! Later layers override earlier ones key by key. A leaf is always replaced by whatever is
//! merged over it, a sub-trie is replaced by an incoming leaf, and two sub-tries are merged
//! recursively, so sibling bindings survive as long as both sides agree that a key starts a
//! longer sequence.
//!
//! ```
//! use modalex::{action::Action, keymap::{Binding, Keymap}};
//!
//! let base = Keymap::new();
//! let d = Keymap::new();
//! d.set_key('d', Action::command("deleteLine"));
//! d.set_key('w', Action::command("deleteWordRight"));
//! base.set_key('d', d);
//!
//! let custom = Keymap::new();
//! let d = Keymap::new();
//! d.set_key('b', Action::command("deleteWordLeft"));
//! custom.set_key('d', d);
//!
//! base.merge(&custom);
//!
//! let d = base.get_key('d').and_then(Binding::into_keymap).unwrap();
//! assert_eq!(d.keys(), vec!['b', 'd', 'w']);
//! ```
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::Action;
use crate::errors::KeymapError;

/// What a key is bound to within a [Keymap].
#[derive(Clone)]
pub enum Binding {
    /// The key starts a longer sequence.
    Keymap(Keymap),

    /// The key completes a binding.
    Action(Rc<Action>),
}

impl Binding {
    /// Returns the bound sub-trie, if this is one.
    pub fn into_keymap(self) -> Option<Keymap> {
        match self {
            Binding::Keymap(km) => Some(km),
            Binding::Action(_) => None,
        }
    }

    /// Returns the bound action, if this is one.
    pub fn into_action(self) -> Option<Rc<Action>> {
        match self {
            Binding::Keymap(_) => None,
            Binding::Action(act) => Some(act),
        }
    }

    /// Whether this binding is a leaf [Action].
    pub fn is_action(&self) -> bool {
        matches!(self, Binding::Action(_))
    }

    /// Whether both bindings refer to the same node or the same action.
    pub fn ptr_eq(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::Keymap(a), Binding::Keymap(b)) => a.ptr_eq(b),
            (Binding::Action(a), Binding::Action(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Keymap(km) => km.fmt(f),
            Binding::Action(act) => act.fmt(f),
        }
    }
}

impl From<Keymap> for Binding {
    fn from(km: Keymap) -> Self {
        Binding::Keymap(km)
    }
}

impl From<Action> for Binding {
    fn from(act: Action) -> Self {
        Binding::Action(Rc::new(act))
    }
}

impl From<Rc<Action>> for Binding {
    fn from(act: Rc<Action>) -> Self {
        Binding::Action(act)
    }
}

#[derive(Clone)]
enum Slot {
    Bound(Binding),
    Alias(WeakKeymap),
}

impl Slot {
    fn resolve(&self) -> Option<Binding> {
        match self {
            Slot::Bound(binding) => Some(binding.clone()),
            Slot::Alias(weak) => weak.upgrade().map(Binding::Keymap),
        }
    }
}

#[derive(Default)]
struct KeymapNode {
    id: Option<String>,
    help: Option<String>,
    maps: BTreeMap<char, Slot>,
}

/// A shared node in a trie of key bindings.
#[derive(Clone, Default)]
pub struct Keymap(Rc<RefCell<KeymapNode>>);

impl Keymap {
    /// Create a new, empty keymap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, empty keymap with metadata attached.
    pub fn with_meta(id: Option<String>, help: Option<String>) -> Self {
        let node = KeymapNode { id, help, maps: BTreeMap::new() };

        Keymap(Rc::new(RefCell::new(node)))
    }

    /// The identifier given to this keymap in its configuration, if any.
    pub fn id(&self) -> Option<String> {
        self.0.borrow().id.clone()
    }

    /// The help text given to this keymap in its configuration, if any.
    pub fn help(&self) -> Option<String> {
        self.0.borrow().help.clone()
    }

    /// Bind a key, replacing whatever it was previously bound to.
    pub fn set_key<B: Into<Binding>>(&self, key: char, value: B) {
        self.0.borrow_mut().maps.insert(key, Slot::Bound(value.into()));
    }

    /// Bind a key to `target` without keeping `target` alive.
    ///
    /// Looking the key up returns `target` itself for as long as some other handle to it
    /// exists, and nothing afterwards.
    pub fn set_alias(&self, key: char, target: &Keymap) {
        self.0.borrow_mut().maps.insert(key, Slot::Alias(target.downgrade()));
    }

    /// Bind a key given as a string, which must hold exactly one code point.
    pub fn try_set_key<B: Into<Binding>>(&self, key: &str, value: B) -> Result<(), KeymapError> {
        let mut chars = key.chars();

        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                self.set_key(c, value);

                return Ok(());
            },
            _ => {
                return Err(KeymapError::NotSingleKey(key.to_string()));
            },
        }
    }

    /// Look up what a key is bound to.
    pub fn get_key(&self, key: char) -> Option<Binding> {
        self.0.borrow().maps.get(&key).and_then(Slot::resolve)
    }

    /// The keys bound in this node, in sorted order.
    pub fn keys(&self) -> Vec<char> {
        self.0.borrow().maps.keys().copied().collect()
    }

    /// The number of keys bound in this node.
    pub fn len(&self) -> usize {
        self.0.borrow().maps.len()
    }

    /// Whether this node has no bindings.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().maps.is_empty()
    }

    /// Remove every binding from this node.
    pub fn clear(&self) {
        self.0.borrow_mut().maps.clear();
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Keymap) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Create a handle that doesn't keep this node alive.
    pub fn downgrade(&self) -> WeakKeymap {
        WeakKeymap(Rc::downgrade(&self.0))
    }

    /// Merge the bindings of `other` into this keymap, in place.
    pub fn merge(&self, other: &Keymap) {
        let mut seen = HashSet::new();

        self.merge_inner(other, &mut seen);
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn merge_inner(&self, other: &Keymap, seen: &mut HashSet<(usize, usize)>) {
        if self.ptr_eq(other) || !seen.insert((self.addr(), other.addr())) {
            return;
        }

        // Snapshot first, since other may be reachable from self.
        let incoming: Vec<(char, Slot)> =
            other.0.borrow().maps.iter().map(|(k, v)| (*k, v.clone())).collect();

        for (key, theirs) in incoming {
            match (self.get_key(key), theirs.resolve()) {
                (Some(Binding::Keymap(ours)), Some(Binding::Keymap(resolved))) => {
                    ours.merge_inner(&resolved, seen);
                },
                _ => {
                    // Aliases are copied as aliases, so they stay weak.
                    self.0.borrow_mut().maps.insert(key, theirs);
                },
            }
        }
    }
}

/// A handle to a [Keymap] node that doesn't keep it alive.
#[derive(Clone)]
pub struct WeakKeymap(Weak<RefCell<KeymapNode>>);

impl WeakKeymap {
    /// Get the keymap back, if it is still alive.
    pub fn upgrade(&self) -> Option<Keymap> {
        self.0.upgrade().map(Keymap)
    }
}

impl fmt::Debug for WeakKeymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakKeymap(..)")
    }
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tries may be cyclic, so only show this level.
        let node = self.0.borrow();

        f.debug_struct("Keymap")
            .field("id", &node.id)
            .field("help", &node.help)
            .field("keys", &node.maps.keys().collect::<Vec<_>>())
            .finish()
    }
}
