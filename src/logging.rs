//! File logging. The TUI owns the terminal, so events go to
//! `<data dir>/daynotes.log` through a non-blocking writer.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DAYNOTES_LOG";
const LOG_FILE: &str = "daynotes.log";

/// Installs the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(log_dir: &Path, default_filter: &str) -> Result<WorkerGuard> {
    let filter = filter_from(std::env::var(LOG_ENV).ok().as_deref(), default_filter)?;
    let file = open_log_file(log_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("installing log subscriber: {err}"))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        "logging started"
    );
    Ok(guard)
}

/// Per-user data directory; logs stay out of project stores.
pub fn default_dir() -> Result<PathBuf> {
    Ok(crate::storage::project_dirs()?.data_dir().to_path_buf())
}

fn open_log_file(log_dir: &Path) -> Result<File> {
    fs::create_dir_all(log_dir).with_context(|| format!("creating {:?}", log_dir))?;
    let path = log_dir.join(LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))
}

fn filter_from(env_value: Option<&str>, default_filter: &str) -> Result<EnvFilter> {
    let directive = env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default_filter);
    EnvFilter::try_new(directive).with_context(|| format!("invalid log filter {:?}", directive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn env_value_overrides_config() {
        let filter = filter_from(Some("debug"), "info").expect("filter");
        assert_eq!(filter.to_string(), "debug");
        let filter = filter_from(Some("  "), "warn").expect("filter");
        assert_eq!(filter.to_string(), "warn");
        let filter = filter_from(None, "daynotes=trace").expect("filter");
        assert_eq!(filter.to_string(), "daynotes=trace");
    }

    #[test]
    fn rejects_garbage_directives() {
        assert!(filter_from(Some("daynotes=loudest"), "info").is_err());
    }

    #[test]
    fn logs_live_in_the_user_data_dir() {
        let dir = default_dir().expect("data dir");
        let dirs = crate::storage::project_dirs().expect("project dirs");
        assert_eq!(dir, dirs.data_dir());
        assert!(dir
            .components()
            .all(|part| part.as_os_str() != ".daynotes"));
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join(LOG_FILE)).expect("mkdir");
        let err = init(dir.path(), "info").expect_err("log path is a directory");
        assert!(err.to_string().starts_with("opening log file"));
    }

    #[test]
    fn reopening_keeps_earlier_lines() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("logs");
        open_log_file(&nested).expect("create");
        fs::write(nested.join(LOG_FILE), "first\n").expect("write");
        drop(open_log_file(&nested).expect("reopen"));
        let kept = fs::read_to_string(nested.join(LOG_FILE)).expect("read");
        assert_eq!(kept, "first\n");
    }
}
