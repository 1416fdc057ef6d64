//! Installation of a [tracing] subscriber for applications built on this crate.
//!
//! The library itself only emits spans and events; nothing is printed until a
//! subscriber is installed, either with [init] or by the application itself.

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::{SubscriberInitExt as _, TryInitError};
use tracing_subscriber::{fmt, Layer};

use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset or unparsable
    pub default_level: LevelFilter,
    /// Events are additionally appended to this file through a non-blocking writer
    pub log_file: Option<PathBuf>,
    /// Write console output through the test harness capture
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::INFO,
            log_file: None,
            test_writer: false,
        }
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Io {
            path: path.to_owned(),
            source,
        })
}

/// Installs the global subscriber. The returned guard flushes the log file
/// when dropped, so keep it alive for as long as logging is needed
pub fn init(config: LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.default_level.into())
        .from_env_lossy();

    let mut layers = Vec::new();

    let console = if config.test_writer {
        fmt::layer().with_test_writer().compact().boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).compact().boxed()
    };
    layers.push(console);

    let mut guard = None;
    if let Some(path) = &config.log_file {
        let (writer, file_guard) = tracing_appender::non_blocking(open_log_file(path)?);

        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
        );
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(log_file = ?config.log_file, "logging initialized");

    Ok(guard)
}
