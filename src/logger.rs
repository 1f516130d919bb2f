use crate::formatter::{Formatter, LineFormatter};
use crate::hook::Hook;
use crate::level::Level;
use crate::noop_sink::NoopSink;
use crate::record::{CallSite, LogRecord, FILE_KEY};
use crate::sink::LogSink;
use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::Arc;

/// Structured fields attached to a record.
pub type Fields = BTreeMap<String, serde_json::Value>;

/// Cloneable handle to a configured logging pipeline.
///
/// Each emitted record is filtered by the minimum level, annotated by every
/// hook registered for its level, rendered by the formatter and written to
/// the sink as one line. Emitting never fails: hook, formatter and sink
/// errors are reported on stderr.
///
/// The emitting methods are `#[track_caller]`: each record carries the
/// location of the call as a [`CallSite::Caller`] for hooks to fall back on.
///
/// A disabled logger (see [`Logger::disabled`]) has no sink, formatter or
/// hooks and drops everything.
#[derive(Clone)]
pub struct Logger {
    state: Arc<State>,
}

enum State {
    Disabled,
    Enabled(Pipeline),
}

struct Pipeline {
    level: Level,
    sink: Arc<dyn LogSink>,
    formatter: Box<dyn Formatter>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl Pipeline {
    fn emit(&self, mut record: LogRecord) -> LogRecord {
        let level = record.level;
        for hook in self.hooks.iter().filter(|h| h.levels().contains(&level)) {
            if let Err(e) = hook.fire(&mut record) {
                eprintln!("failed to fire log hook: {}", e);
            }
        }

        match self.formatter.format(&record) {
            Ok(line) => {
                if let Err(e) = self.sink.write_line(&line) {
                    eprintln!("failed to write log line: {}", e);
                }
            }
            Err(e) => eprintln!("failed to format log record: {}", e),
        }

        record
    }
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Logger that discards every record without running hooks or the
    /// formatter.
    pub fn disabled() -> Self {
        Self { state: Arc::new(State::Disabled) }
    }

    /// Minimum level written, or `None` when disabled.
    pub fn level(&self) -> Option<Level> {
        match &*self.state {
            State::Disabled => None,
            State::Enabled(pipeline) => Some(pipeline.level),
        }
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.level().is_some_and(|min| level >= min)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Log at [`Level::Fatal`], flush the sink and exit the process with
    /// status 1.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        self.emit(Level::Fatal, message.into(), Fields::new(), Some(caller()));
        self.exit_fatal()
    }

    /// Log at [`Level::Panic`], then panic with the message.
    #[track_caller]
    pub fn panic(&self, message: impl Into<String>) -> ! {
        let message = self.emit(Level::Panic, message.into(), Fields::new(), Some(caller()));
        panic!("{}", message)
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_with(level, message, Fields::new());
    }

    /// Emit a record carrying `fields` as metadata.
    ///
    /// The reserved [`FILE_KEY`] is owned by attribution hooks; a field of
    /// that name is dropped.
    #[track_caller]
    pub fn log_with(&self, level: Level, message: impl Into<String>, fields: Fields) {
        self.log_from(Some(caller()), level, message, fields);
    }

    /// Emit a record whose call site the emitter already knows, e.g. from
    /// `tracing` event metadata.
    ///
    /// `Fatal` and `Panic` records terminate the process or panic after
    /// being written, whether or not the level filter let them through.
    pub fn log_from(
        &self,
        call_site: Option<CallSite>,
        level: Level,
        message: impl Into<String>,
        mut fields: Fields,
    ) {
        fields.remove(FILE_KEY);
        let message = self.emit(level, message.into(), fields, call_site);
        match level {
            Level::Fatal => self.exit_fatal(),
            Level::Panic => panic!("{}", message),
            _ => {}
        }
    }

    /// Run the pipeline for one record and hand the message back.
    fn emit(&self, level: Level, message: String, fields: Fields, call_site: Option<CallSite>) -> String {
        match &*self.state {
            State::Enabled(pipeline) if level >= pipeline.level => {
                let mut record = LogRecord::new(level, message);
                record.metadata = fields;
                record.call_site = call_site;
                pipeline.emit(record).message
            }
            _ => message,
        }
    }

    pub fn flush(&self) {
        if let State::Enabled(pipeline) = &*self.state {
            if let Err(e) = pipeline.sink.flush() {
                eprintln!("failed to flush log sink: {}", e);
            }
        }
    }

    fn exit_fatal(&self) -> ! {
        self.flush();
        std::process::exit(1)
    }
}

#[track_caller]
fn caller() -> CallSite {
    CallSite::Caller(Location::caller())
}

/// Assembles an enabled [`Logger`].
///
/// Defaults: minimum level `Info`, [`NoopSink`], [`LineFormatter`], no
/// hooks.
pub struct LoggerBuilder {
    level: Level,
    sink: Arc<dyn LogSink>,
    formatter: Box<dyn Formatter>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: Level::Info,
            sink: Arc::new(NoopSink),
            formatter: Box::new(LineFormatter),
            hooks: Vec::new(),
        }
    }
}

impl LoggerBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Register a hook; hooks fire in registration order.
    pub fn hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            state: Arc::new(State::Enabled(Pipeline {
                level: self.level,
                sink: self.sink,
                formatter: self.formatter,
                hooks: self.hooks,
            })),
        }
    }
}
