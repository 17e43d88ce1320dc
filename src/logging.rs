//! Tracing setup for the two ways kindred runs.
//!
//! The interactive chat owns the terminal for the transcript, so its
//! diagnostics go to a JSON file under `~/.kindred/logs/` ([`init_chat`]).
//! One-shot subcommands print nothing but their result on stdout and log
//! human-readable lines to stderr ([`init_cli`]).
//!
//! Both honour `RUST_LOG` and fall back to `info`.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "kindred.log";

/// Keeps the chat log writer alive; pending lines are flushed on drop.
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Route turn diagnostics to `{logs_dir}/kindred.log.<date>`, one file per day.
///
/// Hold the returned guard until the chat ends.
///
/// # Errors
///
/// Returns an error if `logs_dir` cannot be created.
pub fn init_chat(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .init();

    Ok(LoggingGuard { _writer: guard })
}

/// Log to stderr for `ask`, `persona`, `profile` and `reset`.
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .init();
}
