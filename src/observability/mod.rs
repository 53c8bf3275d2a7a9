//! Observability: logging setup and request correlation.
//!
//! Metrics are emitted through the `metrics` facade at the call sites; installing a
//! recorder is the host's concern.

mod request_context;

pub use request_context::{
    RequestContext, RequestContextGuard, current_request_id, enter_request_context,
    record_request_id, scope_request_context,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber.
///
/// Logs go to stderr, or are appended to `config.file` when set. The filter directive
/// comes from `config.filter`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an invalid filter directive and [`Error::Backend`]
/// if logging is already initialized or the log file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::backend("logging_init", "logging already initialized"));
    }

    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| Error::Validation(format!("invalid log filter '{}': {e}", config.filter)))?;
    let writer = match &config.file {
        Some(path) => BoxMakeWriter::new(open_log_file(path)?),
        None => BoxMakeWriter::new(io::stderr),
    };
    let ansi = config.file.is_none();

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            )
            .with(filter)
            .try_init(),
    };
    installed.map_err(|e| Error::backend("logging_init", e))?;

    LOGGING_INIT
        .set(())
        .map_err(|()| Error::backend("logging_init", "logging already initialized"))
}

/// Thread-safe append-only log file.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::backend("create_log_dir", e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::backend("open_log_file", format!("{}: {e}", path.display())))?;
    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}
