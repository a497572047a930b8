//! # modalex-term
//!
//! A small terminal program for trying out keymaps. Every command that a binding resolves to
//! gets printed instead of being run, and text typed in Insert mode is echoed back.
//!
//! Press `Esc` to return to Normal mode, and `Ctrl-C` to quit.
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use modalex::config::{Preset, Settings};

mod host;
mod logging;
mod term;

/// Try out modalex keymaps in the terminal.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON settings file to load keymaps from. Uses the "simple" preset when omitted.
    #[arg(short, long, env = "MODALEX_SETTINGS")]
    settings: Option<PathBuf>,

    /// File to write logs to.
    #[arg(long, env = "MODALEX_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings { preset: Preset::Simple, ..Default::default() });
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let settings = Settings::from_json_str(&text)
        .with_context(|| format!("invalid settings in {}", path.display()))?;

    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let guard = logging::init(cli.log_file)?;

    tracing::info!(log_file = %guard.log_file.display(), "starting");

    let settings = load_settings(cli.settings.as_deref())?;

    term::run(&settings)
}
