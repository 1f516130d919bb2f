use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a [`LogRecord`](crate::record::LogRecord).
///
/// Variants are declared from most verbose to most severe, so the derived
/// ordering reads `Debug < Info < Warn < Error < Fatal < Panic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    /// Upper-case name as it appears in formatted lines and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not one of the six known names.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid log level: {0}")]
pub struct LevelParseError(pub String);

impl FromStr for Level {
    type Err = LevelParseError;

    /// Names are matched exactly, upper case only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PANIC" => Ok(Level::Panic),
            "FATAL" => Ok(Level::Fatal),
            "ERROR" => Ok(Level::Error),
            "WARN" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            other => Err(LevelParseError(other.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            // No TRACE level here; it folds into the most verbose one.
            tracing::Level::DEBUG | tracing::Level::TRACE => Level::Debug,
        }
    }
}
