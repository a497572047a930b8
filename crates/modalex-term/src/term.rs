use std::io::{self, Write};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::{
    cursor::SetCursorStyle,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal,
};

use modalex::action::Action;
use modalex::config::{CursorStyle, Settings};
use modalex::editor::Editor;
use modalex::errors::ModalResult;
use modalex::modal::{EnterOptions, ModeType};

use crate::host::{TermHost, TYPE_COMMAND};

/// How long to wait for input when no timeout is pending.
const IDLE_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Eq, PartialEq)]
enum Input {
    Key(char),
    Escape,
    Quit,
    Ignore,
}

fn key_input(ke: &KeyEvent) -> Input {
    if ke.kind != KeyEventKind::Press {
        return Input::Ignore;
    }

    match ke.code {
        KeyCode::Char('c') if ke.modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
        KeyCode::Char(_) if ke.modifiers.contains(KeyModifiers::CONTROL) => Input::Ignore,
        KeyCode::Char(c) => Input::Key(c),
        KeyCode::Enter => Input::Key('\n'),
        KeyCode::Tab => Input::Key('\t'),
        KeyCode::Esc => Input::Escape,
        _ => Input::Ignore,
    }
}

fn cursor_shape(style: CursorStyle) -> SetCursorStyle {
    match style {
        CursorStyle::Block => SetCursorStyle::SteadyBlock,
        CursorStyle::BlockOutline => SetCursorStyle::BlinkingBlock,
        CursorStyle::Line => SetCursorStyle::SteadyBar,
        CursorStyle::LineThin => SetCursorStyle::BlinkingBar,
        CursorStyle::Underline => SetCursorStyle::SteadyUnderScore,
        CursorStyle::UnderlineThin => SetCursorStyle::BlinkingUnderScore,
    }
}

type TermEditor = Editor<TermHost<io::Stdout>>;

fn report(editor: &mut TermEditor, res: ModalResult<impl Sized>) {
    if let Err(e) = res {
        tracing::warn!(error = %e, "key dispatch failed");

        editor.host_mut().echo(format!("error: {e}"));
    }
}

struct Session<'a> {
    editor: TermEditor,
    settings: &'a Settings,
    modes: Receiver<ModeType>,
    status: String,
}

impl<'a> Session<'a> {
    fn new(settings: &'a Settings) -> Self {
        let mut editor = Editor::new(TermHost::new(io::stdout()));

        editor.insert_mut().set_default_handler(Some(Action::type_keys(TYPE_COMMAND)));
        editor.insert_mut().set_timeout_handler(Some(Action::type_keys(TYPE_COMMAND)));

        if let Err(e) = editor.update_from_settings(settings) {
            tracing::warn!(error = %e, "some keymaps were skipped");
            eprintln!("warning: {e}");
        }

        let modes = editor.subscribe();

        Session { editor, settings, modes, status: String::new() }
    }

    fn redraw(&mut self) -> io::Result<()> {
        for mode in self.modes.try_iter() {
            execute!(io::stdout(), cursor_shape(self.settings.cursor_style(mode)))?;
        }

        let status = self.editor.status_text();

        if status != self.status {
            self.editor.host_mut().echo(format!("[{status}]"));
            self.status = status;
        }

        Ok(())
    }

    fn step(&mut self) -> io::Result<bool> {
        self.redraw()?;

        let wait = self.editor.poll_timeout(Instant::now()).unwrap_or(IDLE_POLL);
        let ready = event::poll(wait)?;

        // Expired prefixes resolve before any newly arrived key is looked at.
        let res = self.editor.check_timeout();
        report(&mut self.editor, res);

        if !ready {
            return Ok(true);
        }

        if let Event::Key(ke) = event::read()? {
            match key_input(&ke) {
                Input::Quit => return Ok(false),
                Input::Escape => self.editor.enter_mode(ModeType::Normal, EnterOptions::default()),
                Input::Key(c) => {
                    let res = self.editor.input_key(c);
                    report(&mut self.editor, res);
                },
                Input::Ignore => {},
            }
        }

        Ok(true)
    }
}

/// Run until the user presses `Ctrl-C`.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let mut session = Session::new(settings);

    terminal::enable_raw_mode()?;

    session.editor.enter_mode(ModeType::Normal, EnterOptions::default());

    let res = loop {
        match session.step() {
            Ok(true) => continue,
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    terminal::disable_raw_mode()?;
    execute!(io::stdout(), SetCursorStyle::DefaultUserShape)?;
    io::stdout().flush()?;

    Ok(res?)
}
