use crate::attribution::{AttributionConfig, CallerAttributionHook};
use crate::formatter::LineFormatter;
use crate::layer::LineLogLayer;
use crate::level::{Level, LevelParseError};
use crate::logger::Logger;
use crate::sink::FileSink;
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Level name that turns logging off entirely.
pub const LOG_LEVEL_DISABLED: &str = "NONE";

/// Log file used when none is configured.
pub const DEFAULT_LOG_FILE: &str = "grv.log";

/// Logging configuration, read once at startup.
///
/// **Fields**
/// - `level`: one of `PANIC`, `FATAL`, `ERROR`, `WARN`, `INFO`, `DEBUG`,
///   or [`LOG_LEVEL_DISABLED`].
/// - `file`: log file path; created, or truncated if it exists.
/// - `attribution`: stack scan parameters for caller attribution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: PathBuf,
    pub attribution: AttributionConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LOG_LEVEL_DISABLED.to_string(),
            file: PathBuf::from(DEFAULT_LOG_FILE),
            attribution: AttributionConfig::default(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self { level: level.into(), file: file.into(), ..Self::default() }
    }

    pub fn is_disabled(&self) -> bool {
        self.level == LOG_LEVEL_DISABLED
    }
}

/// Error type returned when logging cannot be set up.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("Invalid logLevel: {0}")]
    InvalidLevel(String),

    #[error("Unable to open log file {} for writing: {source}", .path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}

impl From<LevelParseError> for InitError {
    fn from(e: LevelParseError) -> Self {
        InitError::InvalidLevel(e.0)
    }
}

/// Build the process logger described by `config`.
///
/// **Behavior**
/// - [`LOG_LEVEL_DISABLED`]: returns [`Logger::disabled`] without touching
///   the file system.
/// - Otherwise the level is parsed, the log file is created or truncated,
///   and the logger is assembled with a [`FileSink`], the
///   [`LineFormatter`] and a [`CallerAttributionHook`].
///
/// **Returns**
/// - `Err(InitError::InvalidLevel)` for an unknown level name.
/// - `Err(InitError::OpenLogFile)` if the file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> Result<Logger, InitError> {
    if config.is_disabled() {
        return Ok(Logger::disabled());
    }

    let level: Level = config.level.parse()?;

    let sink = FileSink::create(&config.file).map_err(|source| InitError::OpenLogFile {
        path: config.file.clone(),
        source,
    })?;

    Ok(Logger::builder()
        .level(level)
        .sink(Arc::new(sink))
        .formatter(LineFormatter)
        .hook(CallerAttributionHook::new(&config.attribution))
        .build())
}

/// Like [`init_logging`], but a configuration error prints a diagnostic on
/// stderr and exits the process with status 1.
pub fn init_logging_or_exit(config: &LoggingConfig) -> Logger {
    match init_logging(config) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Install `logger` as the sink of every `tracing` event in the process.
///
/// This sets a [`Registry`] combined with a [`LineLogLayer`] as the global
/// default subscriber. It can succeed only once per process.
pub fn install_tracing(logger: &Logger) -> Result<(), InitError> {
    let subscriber = Registry::default().with(LineLogLayer::new(logger.clone()));
    tracing::subscriber::set_global_default(subscriber).map_err(|_| InitError::SubscriberAlreadySet)
}
