//! Tracing setup. The TUI owns the terminal, so it logs to a daily rolling
//! file; the proxy logs to stderr.

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::project_dirs;

const DEFAULT_FILTER: &str = "amfilter=info";

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn log_dir() -> PathBuf {
  project_dirs().map(|dirs| dirs.data_local_dir().join("logs")).unwrap_or_else(|| std::env::temp_dir().join("amfilter"))
}

/// Log to `<data dir>/logs/amfilter.log.<date>`. Keep the guard alive for the
/// whole run or buffered lines are lost on exit.
pub fn init_file() -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir).map_err(|e| anyhow!(e).context(format!("Failed to create {}", dir.display())))?;
  let appender = tracing_appender::rolling::daily(&dir, "amfilter.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;
  Ok(guard)
}

pub fn init_stderr() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(env_filter())
    .with_writer(std::io::stderr)
    .try_init()
    .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}
