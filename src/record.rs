use crate::level::Level;
use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::Location;
use std::path::Path;

/// Metadata key under which the attributed call site is stored.
pub const FILE_KEY: &str = "file";

/// Source location an emitter knows about before any stack is walked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSite {
    /// Recorded at compile time by the emitting macro; trusted over the stack.
    Declared { file: String, line: u32 },
    /// Where a `Logger` method was called; used when the stack scan finds
    /// nothing, e.g. in builds without line tables.
    Caller(&'static Location<'static>),
}

impl CallSite {
    /// `<base-filename>:<line>`.
    pub fn location(&self) -> String {
        match self {
            CallSite::Declared { file, line } => format!("{}:{}", base_name(Path::new(file)), line),
            CallSite::Caller(at) => format!("{}:{}", base_name(Path::new(at.file())), at.line()),
        }
    }
}

/// A single log event as it travels through hooks and the formatter.
///
/// Hooks receive it mutably and may annotate `metadata`; the formatter
/// only reads it.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub level: Level,
    pub message: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    pub call_site: Option<CallSite>,
}

impl LogRecord {
    /// Build a record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            level,
            message: message.into(),
            metadata: BTreeMap::new(),
            call_site: None,
        }
    }

    /// The attributed `file:line`, if a hook stored one as a string.
    pub fn file(&self) -> Option<&str> {
        self.metadata.get(FILE_KEY).and_then(|v| v.as_str())
    }
}

/// Base name of `path` as used in locations.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
