//! # Settings
//!
//! ## Overview
//!
//! [Settings] describes how an [Editor](crate::editor::Editor) should be configured, and is
//! typically loaded from a JSON document like:
//!
//! ```json
//! {
//!     "preset": "simple",
//!     "insertTimeout": 200,
//!     "insertKeymaps": { "j": { "k": "modalex.enterNormal" } },
//!     "normalCursorStyle": "block"
//! }
//! ```
//!
//! Keymaps get layered in order: the preset, then `customKeymaps`, and finally the inline
//! `normalKeymaps`, `insertKeymaps` and `visualKeymaps`. Later layers override earlier ones
//! following the rules of [Keymap::merge].
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ConfigError, LayerError};
use crate::keymap::Keymap;
use crate::modal::ModeType;
use crate::parser::parse_keymap;

/// Built-in keymap sets.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// No built-in keymaps.
    #[default]
    None,

    /// A small set of Vim-like keymaps.
    Simple,
}

/// Cursor shapes that a host can show for each mode.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CursorStyle {
    /// A filled block.
    Block,

    /// An outlined block.
    BlockOutline,

    /// A vertical bar.
    Line,

    /// A thin vertical bar.
    LineThin,

    /// An underline.
    Underline,

    /// A thin underline.
    UnderlineThin,
}

/// Keymap configuration for each of the key-matching modes.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeymapLayers {
    /// Normal mode keymaps.
    pub normal: Option<Value>,

    /// Insert mode keymaps.
    pub insert: Option<Value>,

    /// Visual mode keymaps.
    pub visual: Option<Value>,
}

impl KeymapLayers {
    /// The configuration for `mode`, if any.
    pub fn get(&self, mode: ModeType) -> Option<&Value> {
        match mode {
            ModeType::Normal => self.normal.as_ref(),
            ModeType::Insert => self.insert.as_ref(),
            ModeType::Visual => self.visual.as_ref(),
            ModeType::Search => None,
        }
    }

    /// Compile each configured mode.
    ///
    /// Modes that fail to compile are left out of the result, and their errors are added to
    /// `errors` tagged with the `layer` name.
    pub fn compile(&self, layer: &str, errors: &mut Vec<LayerError>) -> Vec<(ModeType, Keymap)> {
        let mut keymaps = vec![];

        for mode in [ModeType::Normal, ModeType::Insert, ModeType::Visual] {
            let Some(config) = self.get(mode) else {
                continue;
            };

            match parse_keymap(config) {
                Ok(keymap) => keymaps.push((mode, keymap)),
                Err(error) => {
                    tracing::debug!(layer, %mode, %error, "skipping keymap layer");

                    errors.push(LayerError {
                        layer: layer.to_string(),
                        mode: mode.to_string(),
                        error,
                    });
                },
            }
        }

        return keymaps;
    }
}

/// Editor settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Which built-in keymaps to start from.
    pub preset: Preset,

    /// How long Insert mode waits after a prefix, in milliseconds.
    ///
    /// A missing value, or one under a millisecond, means waiting until the next key. Fractions
    /// of a millisecond are dropped.
    pub insert_timeout: Option<f64>,

    /// Keymaps layered on top of the preset.
    pub custom_keymaps: Option<KeymapLayers>,

    /// Normal mode keymaps layered on top of everything else.
    pub normal_keymaps: Option<Value>,

    /// Insert mode keymaps layered on top of everything else.
    pub insert_keymaps: Option<Value>,

    /// Visual mode keymaps layered on top of everything else.
    pub visual_keymaps: Option<Value>,

    /// Cursor shape in Normal mode.
    pub normal_cursor_style: CursorStyle,

    /// Cursor shape in Insert mode.
    pub insert_cursor_style: CursorStyle,

    /// Cursor shape in Visual mode.
    pub visual_cursor_style: CursorStyle,

    /// Cursor shape in Search mode.
    pub search_cursor_style: CursorStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preset: Preset::None,
            insert_timeout: None,
            custom_keymaps: None,
            normal_keymaps: None,
            insert_keymaps: None,
            visual_keymaps: None,
            normal_cursor_style: CursorStyle::Block,
            insert_cursor_style: CursorStyle::Line,
            visual_cursor_style: CursorStyle::Block,
            search_cursor_style: CursorStyle::Underline,
        }
    }
}

impl Settings {
    /// Read settings from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// The Insert mode timeout.
    pub fn insert_timeout(&self) -> Option<Duration> {
        match self.insert_timeout {
            Some(ms) if ms.is_finite() && ms >= 1.0 => Some(Duration::from_millis(ms as u64)),
            _ => None,
        }
    }

    /// The inline keymap layer.
    pub fn inline_keymaps(&self) -> KeymapLayers {
        KeymapLayers {
            normal: self.normal_keymaps.clone(),
            insert: self.insert_keymaps.clone(),
            visual: self.visual_keymaps.clone(),
        }
    }

    /// The cursor shape to show in `mode`.
    pub fn cursor_style(&self, mode: ModeType) -> CursorStyle {
        match mode {
            ModeType::Normal => self.normal_cursor_style,
            ModeType::Insert => self.insert_cursor_style,
            ModeType::Visual => self.visual_cursor_style,
            ModeType::Search => self.search_cursor_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseErrorKind;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.insert_timeout(), None);
        assert_eq!(settings.cursor_style(ModeType::Normal), CursorStyle::Block);
        assert_eq!(settings.cursor_style(ModeType::Insert), CursorStyle::Line);
        assert_eq!(settings.cursor_style(ModeType::Visual), CursorStyle::Block);
        assert_eq!(settings.cursor_style(ModeType::Search), CursorStyle::Underline);
    }

    #[test]
    fn test_read() {
        let settings = Settings::from_json_str(
            r#"{
                "preset": "simple",
                "insertTimeout": 150,
                "customKeymaps": { "visual": { "y": "copy" } },
                "insertKeymaps": { "j": { "k": "modalex.enterNormal" } },
                "searchCursorStyle": "underline-thin"
            }"#,
        )
        .unwrap();

        assert_eq!(settings.preset, Preset::Simple);
        assert_eq!(settings.insert_timeout(), Some(Duration::from_millis(150)));
        assert_eq!(settings.cursor_style(ModeType::Search), CursorStyle::UnderlineThin);

        let custom = settings.custom_keymaps.as_ref().unwrap();
        assert_eq!(custom.get(ModeType::Visual), Some(&json!({ "y": "copy" })));
        assert_eq!(custom.get(ModeType::Normal), None);

        let inline = settings.inline_keymaps();
        assert!(inline.get(ModeType::Insert).is_some());
        assert!(inline.get(ModeType::Normal).is_none());
    }

    #[test]
    fn test_insert_timeout_disabled() {
        for ms in ["0", "-1", "0.5", "-2.5"] {
            let s = format!("{{ \"insertTimeout\": {ms} }}");
            let settings = Settings::from_json_str(&s).unwrap();

            assert_eq!(settings.insert_timeout(), None);
        }
    }

    #[test]
    fn test_invalid() {
        let err = Settings::from_json_str(r#"{ "preset": "emacs" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));

        let err = Settings::from_json_str(r#"{ "normalCursorStyle": "bar" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_compile_skips_failures() {
        let layers = KeymapLayers {
            normal: Some(json!({ "h": "cursorLeft" })),
            insert: Some(json!({ "j": 1 })),
            visual: None,
        };

        let mut errors = vec![];
        let keymaps = layers.compile("custom", &mut errors);

        assert_eq!(keymaps.len(), 1);
        assert_eq!(keymaps[0].0, ModeType::Normal);
        assert_eq!(keymaps[0].1.keys(), vec!['h']);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].layer, "custom");
        assert_eq!(errors[0].mode, "insert");
        assert_eq!(errors[0].error.kind, ParseErrorKind::PositiveBackReference(1));
    }

    #[test]
    fn test_insert_timeout_fractional() {
        let settings = Settings::from_json_str(r#"{ "insertTimeout": 150.5 }"#).unwrap();
        assert_eq!(settings.insert_timeout, Some(150.5));
        assert_eq!(settings.insert_timeout(), Some(Duration::from_millis(150)));

        let settings = Settings::from_json_str(r#"{ "insertTimeout": 1.99 }"#).unwrap();
        assert_eq!(settings.insert_timeout(), Some(Duration::from_millis(1)));
    }
}
