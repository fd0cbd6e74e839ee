//! Logging and tracing initialization.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// Console output goes to stderr. When `config.file` is set, a second layer
/// writes to that file through a non-blocking appender; keep the returned
/// guard alive until exit so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_writer, guard) = match config.file.as_deref().and_then(split_log_path) {
        Some((dir, name)) => {
            let _ = std::fs::create_dir_all(&dir);
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
        let file_layer =
            file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false));
        let subscriber = registry
            .with(console_layer.json())
            .with(file_layer.map(|layer| layer.json()));
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
        let file_layer =
            file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false));
        let subscriber = registry.with(console_layer).with(file_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    guard
}

/// `logs/clipforge.log` to (`logs`, `clipforge.log`); a bare file name logs
/// to the working directory.
fn split_log_path(path: &Path) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}
