//! # Actions
//!
//! ## Overview
//!
//! An [Action] is the leaf of a [Keymap](crate::keymap::Keymap) trie, and describes what to do
//! once a binding has been fully typed:
//!
//! - [Action::Command] asks the host to run a named command with optional arguments
//! - [Action::Function] runs a host-supplied callback
//! - [Action::Sequence] runs several actions in order
//!
//! Actions run against an [ActionContext], which identifies the mode that resolved the binding
//! and gives access to the host's command hook and to mode switching. Mode switches take
//! effect immediately, so the rest of a [Sequence](Action::Sequence) runs in the new mode.
use std::fmt;
use std::rc::Rc;

use serde_json::{json, Value};

use crate::errors::CommandResult;
use crate::host::builtin_request;
use crate::modal::{EnterOptions, ModeType};

/// Callback type for [Action::Function].
pub type ActionFn = Rc<dyn Fn(&mut ActionContext<'_>, &[char]) -> CommandResult>;

/// Something to do after a key binding has been typed.
#[derive(Clone)]
pub enum Action {
    /// Run a named host command.
    Command {
        /// The command name, which is opaque to the engine.
        name: String,

        /// Arguments passed along with the command.
        args: Option<Value>,
    },

    /// Run a callback, which receives the keys that were typed.
    Function(ActionFn),

    /// Run each action in order.
    ///
    /// If one of them fails, the ones after it are not run.
    Sequence(Vec<Action>),
}

impl Action {
    /// Create an action that runs a command without arguments.
    pub fn command<T: Into<String>>(name: T) -> Self {
        Action::Command { name: name.into(), args: None }
    }

    /// Create an action that runs a command with arguments.
    pub fn command_with_args<T: Into<String>>(name: T, args: Value) -> Self {
        Action::Command { name: name.into(), args: Some(args) }
    }

    /// Create an action that runs a callback.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>, &[char]) -> CommandResult + 'static,
    {
        Action::Function(Rc::new(f))
    }

    /// Create an action that runs several actions in order.
    pub fn sequence<I: IntoIterator<Item = Action>>(acts: I) -> Self {
        Action::Sequence(acts.into_iter().collect())
    }

    /// Create an action that passes the typed keys to `command` as `{"text": ...}`.
    ///
    /// This is typically used as the default and timeout handler of an Insert mode, so that
    /// keys which don't complete a binding get typed literally.
    pub fn type_keys<T: Into<String>>(command: T) -> Self {
        let command = command.into();

        Action::function(move |ctx, keys| {
            let text: String = keys.iter().collect();

            ctx.execute(&command, Some(&json!({ "text": text })))
        })
    }

    /// Run this action for the given key sequence.
    pub fn exec(&self, ctx: &mut ActionContext<'_>, keys: &[char]) -> CommandResult {
        match self {
            Action::Command { name, args } => ctx.execute(name, args.as_ref()),
            Action::Function(f) => f(ctx, keys),
            Action::Sequence(acts) => {
                for act in acts {
                    act.exec(ctx, keys)?;
                }

                Ok(())
            },
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Command { name, args: None } => f.debug_tuple("Command").field(name).finish(),
            Action::Command { name, args: Some(args) } => {
                f.debug_tuple("Command").field(name).field(args).finish()
            },
            Action::Function(_) => write!(f, "Function(..)"),
            Action::Sequence(acts) => f.debug_tuple("Sequence").field(acts).finish(),
        }
    }
}

/// What an [ActionContext] runs commands and mode switches against.
pub(crate) trait ActionTarget {
    /// The active mode.
    fn mode(&self) -> ModeType;

    /// Pass a command to the host.
    fn run_command(&mut self, command: &str, args: Option<&Value>) -> CommandResult;

    /// Run the full mode transition protocol.
    fn switch_mode(&mut self, mode: ModeType, options: EnterOptions);
}

/// The environment an [Action] runs in.
pub struct ActionContext<'a> {
    target: &'a mut dyn ActionTarget,
    name: &'a str,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(target: &'a mut dyn ActionTarget, name: &'a str) -> Self {
        ActionContext { target, name }
    }

    /// The active mode.
    ///
    /// This changes as soon as an action switches modes.
    pub fn mode(&self) -> ModeType {
        self.target.mode()
    }

    /// The name of the modal whose binding is running.
    pub fn modal_name(&self) -> &str {
        self.name
    }

    /// Run a command.
    ///
    /// Built-in mode commands (see [builtin_request]) switch modes right away, and everything
    /// else is passed to the host.
    pub fn execute(&mut self, command: &str, args: Option<&Value>) -> CommandResult {
        if let Some(req) = builtin_request(command, args)? {
            tracing::trace!(command, mode = %req.mode, "built-in mode command");
            self.target.switch_mode(req.mode, req.options);

            return Ok(());
        }

        tracing::trace!(command, "executing command");

        self.target.run_command(command, args)
    }

    /// Switch to another mode.
    pub fn enter_mode(&mut self, mode: ModeType, options: EnterOptions) {
        self.target.switch_mode(mode, options);
    }
}
