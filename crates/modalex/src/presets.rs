//! # Presets
//!
//! Built-in keymap layers that [Settings](crate::config::Settings) can start from.
use serde_json::json;

use crate::config::{KeymapLayers, Preset};

/// The keymap layers for `preset`.
pub fn layers(preset: Preset) -> Option<KeymapLayers> {
    match preset {
        Preset::None => None,
        Preset::Simple => Some(simple()),
    }
}

fn simple() -> KeymapLayers {
    let normal = json!({
        "i": "modalex.enterInsert",
        "a": ["cursorRight", "modalex.enterInsert"],
        "h": "cursorLeft",
        "j": "cursorDown",
        "k": "cursorUp",
        "l": "cursorRight",
        "w,W": "cursorWordStartRight",
        "b,B": "cursorWordStartLeft",
        "e,E": "cursorWordEndRight",
        "x": "deleteRight",
        "X": "deleteLeft",
        "o": ["editor.action.insertLineAfter", "modalex.enterInsert"],
        "O": ["editor.action.insertLineBefore", "modalex.enterInsert"],
        "d": {
            "help": "delete",
            "d": "modalex.action.deleteAndYankLine",
            "b": "deleteWordLeft",
            "e,w": "deleteWordRight",
        },
        "y": {
            "help": "yank",
            "y": "modalex.action.yankLine",
        },
        "p": "modalex.action.paste",
        "P": { "command": "modalex.action.paste", "args": { "before": true } },
        "v": "modalex.enterVisual",
        "V": "modalex.enterVisualLine",
        "f": "modalex.enterSearchCharLineAfter",
        "F": "modalex.enterSearchCharLineBefore",
        "/": "modalex.enterSearchAfter",
        "?": "modalex.enterSearchBefore",
        "n": "modalex.searchNext",
        "N": "modalex.searchPrev",
        "u": "undo",
    });

    let visual = json!({
        "h": "modalex.action.cursorLeftSelect",
        "l": "modalex.action.cursorRightSelect",
        "j": "modalex.action.cursorDownSelect",
        "k": "modalex.action.cursorUpSelect",
        "I": "modalex.enterInsert",
        "A": ["cursorRight", "modalex.enterInsert"],
        "w": "cursorWordStartRightSelect",
        "e": "cursorWordRightSelect",
        "b": "cursorWordLeftSelect",
        "y,Y": ["editor.action.clipboardCopyAction", "modalex.enterNormal"],
        "p": ["modalex.action.paste", "modalex.enterNormal"],
        "d,x": ["editor.action.clipboardCutAction", "modalex.enterNormal"],
        "f": "modalex.enterSearchCharLineAfter",
        "F": "modalex.enterSearchCharLineBefore",
        "s": ["editor.action.clipboardCutAction", "modalex.enterInsert"],
    });

    KeymapLayers { normal: Some(normal), insert: Some(json!({})), visual: Some(visual) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Binding;
    use crate::modal::ModeType;

    #[test]
    fn test_none() {
        assert_eq!(layers(Preset::None), None);
    }

    #[test]
    fn test_simple_compiles() {
        let mut errors = vec![];
        let keymaps = layers(Preset::Simple).unwrap().compile("preset", &mut errors);

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(keymaps.len(), 3);

        let (mode, normal) = &keymaps[0];
        assert_eq!(*mode, ModeType::Normal);

        let d = normal.get_key('d').and_then(Binding::into_keymap).unwrap();
        assert_eq!(d.help().as_deref(), Some("delete"));
        assert_eq!(d.keys(), vec!['b', 'd', 'e', 'w']);

        assert!(normal.get_key('w').unwrap().ptr_eq(&normal.get_key('W').unwrap()));
        assert!(keymaps[1].1.is_empty());
    }
}
