//! # Keymap Configuration
//!
//! ## Overview
//!
//! This module compiles declarative keymap configuration, given as JSON, into [Keymap] tries.
//!
//! Every key in a configuration object is either a single character, or a shorthand naming
//! several characters at once: `"a-z"` is an inclusive range (the bounds may be given in either
//! order), and `"a,c,e-g"` is a comma-separated list of characters and ranges. All of the keys
//! named by a shorthand share the same compiled value. The keys `"id"` and `"help"` are reserved
//! for metadata, and must have string values.
//!
//! Each value can be one of:
//!
//! - `"name"`: run a command without arguments
//! - `{"command": "name", "args": ...}`: run a command with arguments, which must be an object or
//!   a string
//! - `["a", {"command": "b"}, ...]`: run several commands in order (lists may be nested)
//! - `{...}`: a nested keymap, for multi-key bindings
//! - `0`, `-1`, `-2`...: reuse a keymap that encloses this value, where `0` is the object
//!   containing the key, `-1` is its parent, and so on
//!
//! Back references are bound with [Keymap::set_alias], so they only resolve while the keymap
//! they point at is alive. Keeping the returned root around keeps all of them valid.
//!
//! ## Example
//!
//! ```
//! use modalex::keymap::Binding;
//! use modalex::parser::parse_keymap;
//! use serde_json::json;
//!
//! let keymap = parse_keymap(&json!({
//!     "h": "cursorLeft",
//!     "1-9": "count",
//!     "d": {
//!         "help": "delete",
//!         "d": ["deleteLine", "modalex.enterNormal"],
//!         "2-9": -1,
//!     },
//! }))
//! .unwrap();
//!
//! let d = keymap.get_key('d').and_then(Binding::into_keymap).unwrap();
//! assert_eq!(d.help().as_deref(), Some("delete"));
//!
//! // "d2" loops back to the root keymap.
//! let d2 = d.get_key('2').and_then(Binding::into_keymap).unwrap();
//! assert!(d2.ptr_eq(&keymap));
//! ```
use serde_json::{Map, Number, Value};

use crate::action::Action;
use crate::errors::{ParseError, ParseErrorKind};
use crate::keymap::{Binding, Keymap};

mod keys;

pub use self::keys::parse_keys;

/// Compile a keymap configuration object.
///
/// A failure compiles nothing: no partially built keymap is returned.
pub fn parse_keymap(config: &Value) -> Result<Keymap, ParseError> {
    KeymapParser::default().parse_object(config)
}

enum Compiled {
    Binding(Binding),
    Alias(Keymap),
}

#[derive(Default)]
struct KeymapParser {
    stack: Vec<Keymap>,
    path: Vec<String>,
}

impl KeymapParser {
    fn fail(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(&self.path, kind)
    }

    fn meta(
        &self,
        obj: &Map<String, Value>,
        field: &str,
        kind: fn(String) -> ParseErrorKind,
    ) -> Result<Option<String>, ParseError> {
        match obj.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v) => Err(self.fail(kind(v.to_string()))),
        }
    }

    fn parse_object(&mut self, config: &Value) -> Result<Keymap, ParseError> {
        let Value::Object(obj) = config else {
            return Err(self.fail(ParseErrorKind::InvalidKeymap(config.to_string())));
        };

        let id = self.meta(obj, "id", ParseErrorKind::InvalidId)?;
        let help = self.meta(obj, "help", ParseErrorKind::InvalidHelp)?;
        let keymap = Keymap::with_meta(id, help);

        self.stack.push(keymap.clone());
        let res = self.parse_entries(&keymap, obj);
        self.stack.pop();

        res.map(|()| keymap)
    }

    fn parse_entries(
        &mut self,
        keymap: &Keymap,
        obj: &Map<String, Value>,
    ) -> Result<(), ParseError> {
        for (k, v) in obj {
            if k == "id" || k == "help" {
                continue;
            }

            self.path.push(k.clone());

            let keys = parse_keys(k).map_err(|kind| self.fail(kind))?;
            let compiled = self.parse_binding(v)?;

            for key in keys {
                match &compiled {
                    Compiled::Binding(binding) => keymap.set_key(key, binding.clone()),
                    Compiled::Alias(target) => keymap.set_alias(key, target),
                }
            }

            self.path.pop();
        }

        Ok(())
    }

    fn parse_binding(&mut self, v: &Value) -> Result<Compiled, ParseError> {
        match v {
            Value::Number(n) => self.parse_backref(n).map(Compiled::Alias),
            Value::Object(obj) if !obj.contains_key("command") => {
                self.parse_object(v).map(|km| Compiled::Binding(km.into()))
            },
            Value::String(_) | Value::Array(_) | Value::Object(_) => {
                self.parse_action(v).map(|act| Compiled::Binding(act.into()))
            },
            Value::Null | Value::Bool(_) => {
                Err(self.fail(ParseErrorKind::InvalidBinding(v.to_string())))
            },
        }
    }

    fn parse_backref(&self, n: &Number) -> Result<Keymap, ParseError> {
        let index = match n.as_i64() {
            Some(i) => i,
            None => {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => f as i64,
                    _ => return Err(self.fail(ParseErrorKind::InvalidBackReference(n.to_string()))),
                }
            },
        };

        if index > 0 {
            return Err(self.fail(ParseErrorKind::PositiveBackReference(index)));
        }

        let depth = self.stack.len();
        let pos = (depth as i64 - 1).checked_add(index).filter(|pos| *pos >= 0);

        match pos.and_then(|pos| self.stack.get(pos as usize)) {
            Some(keymap) => Ok(keymap.clone()),
            None => Err(self.fail(ParseErrorKind::BackReferenceOutOfRange { index, depth })),
        }
    }

    fn parse_action(&self, v: &Value) -> Result<Action, ParseError> {
        match v {
            Value::String(name) => {
                if name.is_empty() {
                    return Err(self.fail(ParseErrorKind::EmptyCommand));
                }

                Ok(Action::command(name.as_str()))
            },
            Value::Object(obj) => {
                let name = match obj.get("command") {
                    Some(Value::String(name)) if name.is_empty() => {
                        return Err(self.fail(ParseErrorKind::EmptyCommand));
                    },
                    Some(Value::String(name)) => name.clone(),
                    _ => return Err(self.fail(ParseErrorKind::InvalidBinding(v.to_string()))),
                };

                match obj.get("args") {
                    None | Some(Value::Null) => Ok(Action::command(name)),
                    Some(args @ (Value::Object(_) | Value::String(_))) => {
                        Ok(Action::command_with_args(name, args.clone()))
                    },
                    Some(args) => Err(self.fail(ParseErrorKind::InvalidArgs(args.to_string()))),
                }
            },
            Value::Array(items) => {
                let acts = items.iter().map(|item| self.parse_action(item));

                acts.collect::<Result<Vec<_>, _>>().map(Action::Sequence)
            },
            _ => Err(self.fail(ParseErrorKind::InvalidBinding(v.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::KeyPath;
    use serde_json::json;

    fn sub(keymap: &Keymap, key: char) -> Keymap {
        keymap.get_key(key).and_then(Binding::into_keymap).unwrap()
    }

    fn command(keymap: &Keymap, key: char) -> String {
        match keymap.get_key(key).and_then(Binding::into_action).as_deref() {
            Some(Action::Command { name, .. }) => name.clone(),
            other => panic!("expected command at {key:?}, got {other:?}"),
        }
    }

    macro_rules! fails {
        ($config: expr, [$($p: expr),*], $kind: expr) => {
            assert_eq!(parse_keymap(&$config).unwrap_err(), ParseError {
                path: KeyPath(vec![$($p.to_string()),*]),
                kind: $kind,
            })
        };
    }

    #[test]
    fn test_commands() {
        let keymap = parse_keymap(&json!({
            "h": "cursorLeft",
            "p": { "command": "paste", "args": { "before": false } },
            "/": { "command": "find", "args": "forward" },
            "o": ["lineBreakInsert", { "command": "cursorDown" }, ["modalex.enterInsert"]],
        }))
        .unwrap();

        assert_eq!(keymap.keys(), vec!['/', 'h', 'o', 'p']);
        assert_eq!(command(&keymap, 'h'), "cursorLeft");

        let p = keymap.get_key('p').and_then(Binding::into_action).unwrap();
        assert!(matches!(
            p.as_ref(),
            Action::Command { name, args: Some(args) }
                if name == "paste" && args == &json!({ "before": false })
        ));

        let find = keymap.get_key('/').and_then(Binding::into_action).unwrap();
        assert!(matches!(
            find.as_ref(),
            Action::Command { args: Some(Value::String(s)), .. } if s == "forward"
        ));

        let o = keymap.get_key('o').and_then(Binding::into_action).unwrap();
        let Action::Sequence(acts) = o.as_ref() else {
            panic!("expected a sequence, got {o:?}");
        };
        assert_eq!(acts.len(), 3);
        assert!(matches!(&acts[2], Action::Sequence(inner) if inner.len() == 1));
    }

    #[test]
    fn test_range_shares_action() {
        let keymap = parse_keymap(&json!({ "a-z": "X" })).unwrap();

        assert_eq!(keymap.len(), 26);

        let a = keymap.get_key('a').unwrap();
        assert!(a.is_action());

        for key in 'a'..='z' {
            let b = keymap.get_key(key).unwrap();
            assert!(a.ptr_eq(&b), "{key} doesn't share the action");
        }
    }

    #[test]
    fn test_list_shares_keymap() {
        let keymap = parse_keymap(&json!({ "c,e-g": { "x": "X" } })).unwrap();

        assert_eq!(keymap.keys(), vec!['c', 'e', 'f', 'g']);
        assert!(sub(&keymap, 'c').ptr_eq(&sub(&keymap, 'g')));
    }

    #[test]
    fn test_metadata() {
        let keymap = parse_keymap(&json!({
            "id": "normal",
            "help": "normal mode",
            "g": { "help": "goto", "g": "cursorTop" },
        }))
        .unwrap();

        assert_eq!(keymap.id().as_deref(), Some("normal"));
        assert_eq!(keymap.help().as_deref(), Some("normal mode"));
        assert_eq!(keymap.keys(), vec!['g']);

        let g = sub(&keymap, 'g');
        assert_eq!(g.id(), None);
        assert_eq!(g.help().as_deref(), Some("goto"));
        assert_eq!(g.keys(), vec!['g']);
    }

    #[test]
    fn test_backref_zero_aliases_self() {
        let keymap = parse_keymap(&json!({
            "z": { "j": "scrollDown", "z": 0 },
        }))
        .unwrap();

        let z = sub(&keymap, 'z');
        let zz = sub(&z, 'z');
        assert!(zz.ptr_eq(&z));

        // Bindings added afterwards are visible through the alias.
        z.set_key('k', Action::command("scrollUp"));
        assert_eq!(command(&zz, 'k'), "scrollUp");
    }

    #[test]
    fn test_backref_does_not_own() {
        let keymap = parse_keymap(&json!({
            "z": { "j": "scrollDown", "z": 0, "r": -1 },
        }))
        .unwrap();

        let z = sub(&keymap, 'z').downgrade();
        let root = keymap.downgrade();

        drop(keymap);
        assert!(root.upgrade().is_none());
        assert!(z.upgrade().is_none());
    }

    #[test]
    fn test_backref_ancestors() {
        let keymap = parse_keymap(&json!({
            "d": {
                "d": "deleteLine",
                "i": { "w": "deleteWord", "d": -1, "r": -2 },
            },
        }))
        .unwrap();

        let d = sub(&keymap, 'd');
        let i = sub(&d, 'i');

        assert!(sub(&i, 'd').ptr_eq(&d));
        assert!(sub(&i, 'r').ptr_eq(&keymap));
        assert_eq!(command(&sub(&i, 'd'), 'd'), "deleteLine");
    }

    #[test]
    fn test_backref_errors() {
        fails!(json!({ "g": 1 }), ["g"], ParseErrorKind::PositiveBackReference(1));
        fails!(json!({ "g": -1 }), ["g"], ParseErrorKind::BackReferenceOutOfRange {
            index: -1,
            depth: 1
        });
        fails!(json!({ "g": { "g": -2 } }), ["g", "g"], ParseErrorKind::BackReferenceOutOfRange {
            index: -2,
            depth: 2
        });
        fails!(json!({ "g": -0.5 }), ["g"], ParseErrorKind::InvalidBackReference("-0.5".into()));
    }

    #[test]
    fn test_shape_errors() {
        fails!(json!([]), [], ParseErrorKind::InvalidKeymap("[]".into()));
        fails!(json!({ "x": "" }), ["x"], ParseErrorKind::EmptyCommand);
        fails!(json!({ "x": ["a", ""] }), ["x"], ParseErrorKind::EmptyCommand);
        fails!(json!({ "x": true }), ["x"], ParseErrorKind::InvalidBinding("true".into()));
        fails!(json!({ "x": null }), ["x"], ParseErrorKind::InvalidBinding("null".into()));
        fails!(json!({ "x": [1] }), ["x"], ParseErrorKind::InvalidBinding("1".into()));
        fails!(
            json!({ "x": { "command": 5 } }),
            ["x"],
            ParseErrorKind::InvalidBinding("{\"command\":5}".into())
        );
        fails!(
            json!({ "x": { "command": "a", "args": 5 } }),
            ["x"],
            ParseErrorKind::InvalidArgs("5".into())
        );
        fails!(json!({ "help": 5 }), [], ParseErrorKind::InvalidHelp("5".into()));
        fails!(json!({ "g": { "id": [] } }), ["g"], ParseErrorKind::InvalidId("[]".into()));
    }

    #[test]
    fn test_key_errors() {
        fails!(json!({ "d": { "a-": "x" } }), ["d", "a-"], ParseErrorKind::InvalidKeys {
            keys: "a-".into(),
            offset: 1,
        });
        fails!(json!({ "ab": "x" }), ["ab"], ParseErrorKind::InvalidKeys {
            keys: "ab".into(),
            offset: 1,
        });
    }
}
