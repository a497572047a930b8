//! # Host Integration
//!
//! ## Overview
//!
//! The engine never interprets command names itself (aside from a handful of built-in mode
//! switching commands). Instead, everything gets forwarded to an [EditorHost], which is
//! expected to be the text editor that the engine is embedded in.
//!
//! Hosts request mode switches through a [ModeSwitch]. The host is borrowed by the editor
//! while it runs a command, so the requests are queued and applied as soon as the host call
//! returns, before the next step of a [Sequence](crate::action::Action::Sequence) runs.
//! Built-in commands and function actions switch modes right away.
//!
//! ## Built-in commands
//!
//! | Command                              | Effect                                        |
//! | ------------------------------------ | --------------------------------------------- |
//! | `modalex.enterNormal`                | Enter Normal mode                             |
//! | `modalex.enterInsert`                | Enter Insert mode                             |
//! | `modalex.enterVisual`                | Enter Visual mode (character-wise)            |
//! | `modalex.enterVisualLine`            | Enter Visual mode (line-wise)                 |
//! | `modalex.enterVisualBlock`           | Enter Visual mode (block-wise)                |
//! | `modalex.enterSearchAfter`           | Search forward through the document           |
//! | `modalex.enterSearchBefore`          | Search backward through the document          |
//! | `modalex.enterSearchCharLineAfter`   | Capture one character, search forward in line |
//! | `modalex.enterSearchCharLineBefore`  | Capture one character, search back in line    |
//! | `modalex.enterMode`                  | Enter the mode named by the `mode` argument   |
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{CommandError, CommandResult, ModalResult};
use crate::modal::{EnterOptions, ModeType, SearchDirection, SearchQuery, SearchRange, VisualType};

/// Prefix shared by the commands that the engine handles itself.
pub const COMMAND_PREFIX: &str = "modalex.";

/// The editor that the engine dispatches commands to.
pub trait EditorHost {
    /// Run a command.
    fn execute(
        &mut self,
        command: &str,
        args: Option<&Value>,
        modes: &mut ModeSwitch<'_>,
    ) -> CommandResult;

    /// Run a search that was confirmed in Search mode.
    fn search(&mut self, query: &SearchQuery, modes: &mut ModeSwitch<'_>) -> CommandResult {
        let _ = (query, modes);

        Ok(())
    }

    /// Called before the editor leaves `mode`.
    fn will_leave(&mut self, mode: ModeType) {
        let _ = mode;
    }

    /// Called before the editor enters `mode`, with the options it is being entered with.
    fn will_enter(&mut self, mode: ModeType, options: &EnterOptions) {
        let _ = (mode, options);
    }

    /// Called after the editor has entered `mode`.
    fn did_enter(&mut self, mode: ModeType) {
        let _ = mode;
    }
}

impl<F> EditorHost for F
where
    F: FnMut(&str, Option<&Value>, &mut ModeSwitch<'_>) -> CommandResult,
{
    fn execute(
        &mut self,
        command: &str,
        args: Option<&Value>,
        modes: &mut ModeSwitch<'_>,
    ) -> CommandResult {
        (self)(command, args, modes)
    }
}

/// A queued request to switch modes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModeRequest {
    /// The mode to switch to.
    pub mode: ModeType,

    /// Options for entering the mode.
    pub options: EnterOptions,
}

/// Handle for requesting mode switches while a key is being processed.
pub struct ModeSwitch<'a> {
    current: ModeType,
    pending: &'a mut Vec<ModeRequest>,
}

impl<'a> ModeSwitch<'a> {
    /// Create a handle that queues requests made while `current` is active into `pending`.
    pub fn new(current: ModeType, pending: &'a mut Vec<ModeRequest>) -> Self {
        ModeSwitch { current, pending }
    }

    /// The mode that is processing the current key.
    pub fn current(&self) -> ModeType {
        self.current
    }

    /// Queue a switch to `mode`, to be applied once the host call returns.
    ///
    /// If several switches are requested, they are all applied in order.
    pub fn enter(&mut self, mode: ModeType, options: EnterOptions) {
        self.pending.push(ModeRequest { mode, options });
    }

    /// Queue a switch to the mode named `name`.
    pub fn enter_named(&mut self, name: &str, options: EnterOptions) -> ModalResult<()> {
        let mode = name.parse::<ModeType>()?;

        self.enter(mode, options);

        Ok(())
    }

    /// The switches requested so far.
    pub fn pending(&self) -> &[ModeRequest] {
        self.pending.as_slice()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnterModeArgs {
    mode: String,

    #[serde(flatten)]
    options: EnterOptions,
}

fn visual(visual_type: VisualType) -> ModeRequest {
    let options = EnterOptions { visual_type: Some(visual_type), ..Default::default() };

    ModeRequest { mode: ModeType::Visual, options }
}

fn search(range: SearchRange, direction: SearchDirection, single_char: bool) -> ModeRequest {
    let options = EnterOptions {
        search_range: Some(range),
        search_direction: Some(direction),
        single_char: Some(single_char),
        ..Default::default()
    };

    ModeRequest { mode: ModeType::Search, options }
}

/// Map a built-in command to the mode switch it requests.
///
/// Returns `Ok(None)` for commands that should be passed to the host.
pub fn builtin_request(
    command: &str,
    args: Option<&Value>,
) -> Result<Option<ModeRequest>, CommandError> {
    let Some(name) = command.strip_prefix(COMMAND_PREFIX) else {
        return Ok(None);
    };

    let req = match name {
        "enterNormal" => ModeRequest { mode: ModeType::Normal, ..Default::default() },
        "enterInsert" => ModeRequest { mode: ModeType::Insert, ..Default::default() },
        "enterVisual" => visual(VisualType::Plain),
        "enterVisualLine" => visual(VisualType::Line),
        "enterVisualBlock" => visual(VisualType::Block),
        "enterSearchAfter" => search(SearchRange::Document, SearchDirection::After, false),
        "enterSearchBefore" => search(SearchRange::Document, SearchDirection::Before, false),
        "enterSearchCharLineAfter" => search(SearchRange::Line, SearchDirection::After, true),
        "enterSearchCharLineBefore" => search(SearchRange::Line, SearchDirection::Before, true),
        "enterMode" => {
            let args = args.ok_or_else(|| CommandError::InvalidArgument(command.into()))?;
            let args = EnterModeArgs::deserialize(args)
                .map_err(|_| CommandError::InvalidArgument(command.into()))?;
            let mode = args
                .mode
                .parse::<ModeType>()
                .map_err(|_| CommandError::InvalidArgument(command.into()))?;

            ModeRequest { mode, options: args.options }
        },
        _ => return Ok(None),
    };

    Ok(Some(req))
}
