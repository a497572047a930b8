//! Logging goes to a file, since the terminal is in raw mode while the program runs.
//!
//! The filter comes from `MODALEX_LOG`, then `RUST_LOG`, and otherwise defaults to `warn`.
//! A bare level in `MODALEX_LOG` (like `MODALEX_LOG=trace`) only applies to the modalex crates.
use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the background log writer alive.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

pub fn init(path: Option<PathBuf>) -> anyhow::Result<LogGuard> {
    let (dir, name) = resolve_log_path(path);

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, &name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(create_filter());

    tracing_subscriber::registry().with(layer).try_init()?;

    Ok(LogGuard { _file_guard: guard, log_file: dir.join(name) })
}

fn resolve_log_path(path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("modalex-term-{}.log", std::process::id());

    match path {
        Some(path) if path.extension().is_some() => {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);

            (dir, name)
        },
        Some(dir) => (dir, filename),
        None => (env::temp_dir(), filename),
    }
}

fn create_filter() -> EnvFilter {
    if let Ok(level) = env::var("MODALEX_LOG") {
        return EnvFilter::new(expand_modalex_log(&level));
    }

    if let Ok(directives) = env::var("RUST_LOG") {
        return EnvFilter::new(directives);
    }

    EnvFilter::new("warn")
}

fn expand_modalex_log(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }

    format!("warn,modalex={level},modalex_term={level}")
}
