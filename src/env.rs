//! Environment variable names used by this crate for convenient
//! configuration of logging from command-line tools.
//!
//! These are purely helpers; [`LoggingConfig`] itself stays decoupled from
//! environment access.

use crate::init::LoggingConfig;
use std::path::PathBuf;

/// Log level name, e.g. `INFO`, or `NONE` to disable logging.
pub const LINE_LOG_LEVEL_ENV: &str = "LINE_LOG_LEVEL";

/// Path of the log file.
pub const LINE_LOG_FILE_ENV: &str = "LINE_LOG_FILE";

/// Frames skipped before caller attribution starts scanning.
pub const LINE_LOG_STACK_SKIP_ENV: &str = "LINE_LOG_STACK_SKIP";

/// Number of frames caller attribution inspects.
pub const LINE_LOG_STACK_WINDOW_ENV: &str = "LINE_LOG_STACK_WINDOW";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}

impl LoggingConfig {
    /// Defaults overridden by any `LINE_LOG_*` variables that are set.
    ///
    /// Numeric variables that do not parse are ignored.
    pub fn from_env() -> Self {
        let mut config = LoggingConfig::default();
        config.level = env_or(LINE_LOG_LEVEL_ENV, &config.level);
        if let Ok(file) = std::env::var(LINE_LOG_FILE_ENV) {
            config.file = PathBuf::from(file);
        }
        if let Some(skip) = env_usize(LINE_LOG_STACK_SKIP_ENV) {
            config.attribution.skip = skip;
        }
        if let Some(window) = env_usize(LINE_LOG_STACK_WINDOW_ENV) {
            config.attribution.window = window;
        }
        config
    }
}
