use std::fmt::Display;
use std::io::Write;

use serde_json::Value;

use modalex::errors::{CommandError, CommandResult};
use modalex::host::{EditorHost, ModeSwitch};
use modalex::modal::{EnterOptions, ModeType, SearchQuery};

/// Command used to echo keys that didn't match an Insert mode binding.
pub const TYPE_COMMAND: &str = "type";

/// An [EditorHost] that prints the commands it receives.
pub struct TermHost<W: Write> {
    out: W,
    last_search: Option<SearchQuery>,
}

impl<W: Write> TermHost<W> {
    pub fn new(out: W) -> Self {
        TermHost { out, last_search: None }
    }

    pub fn line<T: Display>(&mut self, msg: T) -> CommandResult {
        write!(self.out, "{msg}\r\n")
            .and_then(|()| self.out.flush())
            .map_err(|e| CommandError::Failed(e.to_string()))
    }

    /// Print a line that isn't the result of a command.
    ///
    /// Failures are logged instead of returned. Returns whether the line was written.
    pub fn echo<T: Display>(&mut self, msg: T) -> bool {
        match self.line(msg) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "failed to write to the terminal");
                false
            },
        }
    }

    fn repeat_search(&mut self, command: &str, reverse: bool) -> CommandResult {
        let Some(query) = &self.last_search else {
            return Err(CommandError::Failed(format!("{command}: no previous search")));
        };

        let direction = if reverse { "reverse" } else { "same" };
        let msg = format!("search {:?} again ({direction} direction)", query.text);

        self.line(msg)
    }
}

impl<W: Write> EditorHost for TermHost<W> {
    fn execute(
        &mut self,
        command: &str,
        args: Option<&Value>,
        _: &mut ModeSwitch<'_>,
    ) -> CommandResult {
        match (command, args) {
            (TYPE_COMMAND, args) => {
                let text = args
                    .and_then(|args| args.get("text"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| CommandError::InvalidArgument(command.into()))?;

                self.line(format!("type {text:?}"))
            },
            ("modalex.searchNext", _) => self.repeat_search(command, false),
            ("modalex.searchPrev", _) => self.repeat_search(command, true),
            (_, Some(args)) => self.line(format!("{command} {args}")),
            (_, None) => self.line(command),
        }
    }

    fn search(&mut self, query: &SearchQuery, modes: &mut ModeSwitch<'_>) -> CommandResult {
        let msg = format!("search {:?} ({:?}, {:?})", query.text, query.range, query.direction);

        self.last_search = Some(query.clone());
        modes.enter(ModeType::Normal, EnterOptions::default());

        self.line(msg)
    }
}
