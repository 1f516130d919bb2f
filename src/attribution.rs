//! Caller attribution: find the first stack frame outside the logging
//! machinery and record it as `file:line` on the record.
//!
//! Frames come from a [`FrameSource`], so the scan can run against the live
//! stack ([`BacktraceSource`]) or against a synthetic one. Which frames count
//! as "internal" is decided by an injected [`InternalPredicate`] over the
//! frame's module path.

use crate::hook::Hook;
use crate::level::Level;
use crate::record::{base_name, CallSite, LogRecord, FILE_KEY};
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Frames skipped before the scan window starts.
pub const DEFAULT_SKIP: usize = 0;

/// Maximum number of frames inspected per record.
pub const DEFAULT_WINDOW: usize = 32;

/// Module prefixes treated as internal unless configured otherwise.
pub const DEFAULT_INTERNAL_MODULES: &[&str] = &[
    env!("CARGO_CRATE_NAME"),
    "backtrace",
    "tracing",
    "tracing_core",
    "tracing_subscriber",
    "std",
    "core",
    "alloc",
];

/// Decides whether a module path belongs to the logging machinery.
pub type InternalPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One resolved logical stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Fully qualified, demangled function name without the hash suffix.
    pub function: String,
    pub file: PathBuf,
    pub line: u32,
}

impl StackFrame {
    pub fn new(function: impl Into<String>, file: impl Into<PathBuf>, line: u32) -> Self {
        Self { function: function.into(), file: file.into(), line }
    }

    /// `<base-filename>:<line>`.
    pub fn location(&self) -> String {
        format!("{}:{}", base_name(&self.file), self.line)
    }

    fn from_symbol(symbol: &backtrace::Symbol) -> Option<Self> {
        let function = format!("{:#}", symbol.name()?);
        let file = symbol.filename()?;
        let line = symbol.lineno()?;
        Some(Self::new(function, file, line))
    }
}

/// Supplies the frames above the current call.
pub trait FrameSource: Send + Sync {
    /// Return at most `window` frames after skipping `skip`, innermost
    /// first. `None` marks a frame whose symbol could not be resolved.
    fn capture(&self, skip: usize, window: usize) -> Vec<Option<StackFrame>>;
}

/// Walks the live stack of the calling thread.
///
/// Inlined functions are reported as separate logical frames, so the
/// skip/window counts are in logical frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceSource;

impl FrameSource for BacktraceSource {
    fn capture(&self, skip: usize, window: usize) -> Vec<Option<StackFrame>> {
        let mut frames = Vec::with_capacity(window);
        if window == 0 {
            return frames;
        }

        let mut seen = 0usize;
        backtrace::trace(|frame| {
            let mut logical = Vec::new();
            backtrace::resolve_frame(frame, |symbol| logical.push(StackFrame::from_symbol(symbol)));
            if logical.is_empty() {
                logical.push(None);
            }

            for resolved in logical {
                if seen >= skip {
                    frames.push(resolved);
                    if frames.len() == window {
                        return false;
                    }
                }
                seen += 1;
            }
            true
        });

        frames
    }
}

/// Scan parameters for [`CallerAttributionHook`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub skip: usize,
    pub window: usize,
    /// Module path prefixes whose frames are never attributed.
    pub internal_modules: Vec<String>,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP,
            window: DEFAULT_WINDOW,
            internal_modules: DEFAULT_INTERNAL_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Hook that stores the first non-internal caller as `file:line` under
/// [`FILE_KEY`].
///
/// A [`CallSite::Declared`] location on the record is used as is, without
/// walking the stack. Otherwise the stack is scanned; when no frame in the
/// window qualifies (or none resolves, as in builds without line tables) a
/// [`CallSite::Caller`] location is used instead, and without one the record
/// is left unattributed. The hook never fails.
pub struct CallerAttributionHook<S = BacktraceSource> {
    source: S,
    skip: usize,
    window: usize,
    is_internal: InternalPredicate,
}

impl CallerAttributionHook<BacktraceSource> {
    /// Live-stack hook configured from `config`.
    pub fn new(config: &AttributionConfig) -> Self {
        Self::with_source(
            BacktraceSource,
            config.skip,
            config.window,
            module_prefix_predicate(config.internal_modules.clone()),
        )
    }
}

impl Default for CallerAttributionHook<BacktraceSource> {
    fn default() -> Self {
        Self::new(&AttributionConfig::default())
    }
}

impl<S: FrameSource> CallerAttributionHook<S> {
    pub fn with_source(source: S, skip: usize, window: usize, is_internal: InternalPredicate) -> Self {
        Self { source, skip, window, is_internal }
    }

    /// Location of the first frame in the window that is not internal.
    pub fn attribute(&self) -> Option<String> {
        self.source
            .capture(self.skip, self.window)
            .into_iter()
            .flatten()
            .find(|frame| !(self.is_internal)(module_path_of(&frame.function)))
            .map(|frame| frame.location())
    }
}

impl<S: FrameSource> Hook for CallerAttributionHook<S> {
    fn levels(&self) -> &[Level] {
        &Level::ALL
    }

    fn fire(&self, record: &mut LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let location = match &record.call_site {
            Some(site @ CallSite::Declared { .. }) => Some(site.location()),
            site => self.attribute().or_else(|| site.as_ref().map(CallSite::location)),
        };
        if let Some(location) = location {
            record.metadata.insert(FILE_KEY.to_string(), serde_json::Value::String(location));
        }
        Ok(())
    }
}

/// Predicate matching module paths equal to, or nested under, any prefix.
pub fn module_prefix_predicate(prefixes: Vec<String>) -> InternalPredicate {
    Arc::new(move |module: &str| prefixes.iter().any(|prefix| is_within(module, prefix)))
}

fn is_within(module: &str, prefix: &str) -> bool {
    match module.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

/// Module path enclosing a demangled function name.
///
/// - `a::b::f` gives `a::b`
/// - `a::b::f::{{closure}}` gives `a::b`
/// - `<a::b::T as c::Trait>::f` gives `a::b`
/// - `<dyn Fn() as core::ops::Fn>::call` gives `core::ops`
pub fn module_path_of(function: &str) -> &str {
    let path = match function.strip_prefix('<') {
        Some(inner) => {
            let self_type = leading_path(inner);
            match inner.find(" as ") {
                Some(at) if !self_type.contains("::") => leading_path(&inner[at + 4..]),
                _ => self_type,
            }
        }
        None => leading_path(function),
    };
    // the last segment names the function itself (or the impl's type)
    match path.rfind("::") {
        Some(at) => &path[..at],
        None => "",
    }
}

fn leading_path(s: &str) -> &str {
    let s = s.strip_prefix("dyn ").unwrap_or(s);
    let end = s.find([' ', '<', '>']).unwrap_or(s.len());
    let s = &s[..end];
    match s.find("::{") {
        Some(at) => &s[..at],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SyntheticStack(Vec<Option<StackFrame>>);

    impl FrameSource for SyntheticStack {
        fn capture(&self, skip: usize, window: usize) -> Vec<Option<StackFrame>> {
            self.0.iter().skip(skip).take(window).cloned().collect()
        }
    }

    fn internal(name: &str, line: u32) -> Option<StackFrame> {
        Some(StackFrame::new(format!("logcore::dispatch::{name}"), "/src/logcore/dispatch.rs", line))
    }

    fn hook(frames: Vec<Option<StackFrame>>, skip: usize, window: usize) -> CallerAttributionHook<SyntheticStack> {
        CallerAttributionHook::with_source(
            SyntheticStack(frames),
            skip,
            window,
            module_prefix_predicate(vec!["logcore".to_string()]),
        )
    }

    fn fire(hook: &CallerAttributionHook<SyntheticStack>) -> LogRecord {
        let mut record = LogRecord::new(Level::Info, "m");
        hook.fire(&mut record).unwrap();
        record
    }

    #[test]
    fn attributes_first_frame_outside_library() {
        let frames = vec![
            internal("fire", 10),
            internal("run_hooks", 20),
            internal("log", 30),
            Some(StackFrame::new("app::commands::run", "/home/u/app/src/commands.rs", 42)),
            Some(StackFrame::new("app::main", "/home/u/app/src/main.rs", 7)),
        ];
        let record = fire(&hook(frames, 0, 5));
        assert_eq!(record.file(), Some("commands.rs:42"));
    }

    #[test]
    fn leaves_file_unset_when_window_is_all_internal() {
        let frames = vec![
            internal("a", 1),
            internal("b", 2),
            internal("c", 3),
            Some(StackFrame::new("app::main", "main.rs", 9)),
        ];
        let record = fire(&hook(frames, 0, 3));
        assert_eq!(record.file(), None);
        assert!(!record.metadata.contains_key(FILE_KEY));
    }

    #[test]
    fn skip_offset_moves_the_window() {
        let frames = vec![
            Some(StackFrame::new("app::helper", "helper.rs", 3)),
            internal("log", 30),
            Some(StackFrame::new("app::main", "main.rs", 9)),
        ];
        assert_eq!(fire(&hook(frames.clone(), 0, 5)).file(), Some("helper.rs:3"));
        assert_eq!(fire(&hook(frames, 1, 5)).file(), Some("main.rs:9"));
    }

    #[test]
    fn unresolved_frames_are_skipped() {
        let frames = vec![None, internal("log", 30), None, Some(StackFrame::new("app::main", "src/main.rs", 12))];
        assert_eq!(fire(&hook(frames, 0, 5)).file(), Some("main.rs:12"));
    }

    #[test]
    fn empty_stack_is_not_an_error() {
        assert_eq!(fire(&hook(Vec::new(), 6, 5)).file(), None);
    }

    #[test]
    fn applies_to_every_level() {
        assert_eq!(hook(Vec::new(), 0, 1).levels(), &Level::ALL);
    }

    #[test]
    fn module_path_handles_plain_closure_and_impl_names() {
        assert_eq!(module_path_of("app::commands::run"), "app::commands");
        assert_eq!(module_path_of("app::commands::run::{{closure}}"), "app::commands");
        assert_eq!(module_path_of("app::run::{closure#0}"), "app");
        assert_eq!(
            module_path_of("<tracing_subscriber::layer::layered::Layered<L,S> as tracing_core::subscriber::Subscriber>::event"),
            "tracing_subscriber::layer::layered"
        );
        assert_eq!(module_path_of("<dyn Fn() as core::ops::function::Fn<()>>::call"), "core::ops::function");
        assert_eq!(module_path_of("main"), "");
    }

    #[test]
    fn prefix_predicate_matches_on_segment_boundaries() {
        let is_internal = module_prefix_predicate(vec!["tracing".to_string()]);
        assert!(is_internal("tracing"));
        assert!(is_internal("tracing::span"));
        assert!(!is_internal("tracing_core::event"));
        assert!(!is_internal("app::tracing"));
    }

    #[test]
    fn location_uses_base_file_name() {
        let frame = StackFrame::new("app::main", "/a/b/c/main.rs", 5);
        assert_eq!(frame.location(), "main.rs:5");
        assert_eq!(base_name(std::path::Path::new("/a/b/c/main.rs")), "main.rs");
    }

    fn fire_with_site(hook: &CallerAttributionHook<SyntheticStack>, site: CallSite) -> LogRecord {
        let mut record = LogRecord::new(Level::Info, "m");
        record.call_site = Some(site);
        hook.fire(&mut record).unwrap();
        record
    }

    #[test]
    fn declared_site_wins_over_the_stack() {
        let frames = vec![Some(StackFrame::new("app::main", "/rust/registry/tracing/src/macros.rs", 905))];
        let site = CallSite::Declared { file: "src/commands.rs".to_string(), line: 17 };
        assert_eq!(fire_with_site(&hook(frames, 0, 5), site).file(), Some("commands.rs:17"));
    }

    #[test]
    fn stack_wins_over_caller_location() {
        let frames = vec![internal("log", 30), Some(StackFrame::new("app::run", "src/run.rs", 4))];
        let site = CallSite::Caller(std::panic::Location::caller());
        assert_eq!(fire_with_site(&hook(frames, 0, 5), site).file(), Some("run.rs:4"));
    }

    #[test]
    fn caller_location_covers_unresolvable_stacks() {
        // stripped or release builds resolve no frames at all
        let frames = vec![None, None, None];
        let line = line!() + 1;
        let site = CallSite::Caller(std::panic::Location::caller());
        let record = fire_with_site(&hook(frames, 0, 5), site);
        assert_eq!(record.file(), Some(format!("attribution.rs:{line}").as_str()));
    }

    #[test]
    fn live_source_respects_window() {
        assert!(BacktraceSource.capture(0, 0).is_empty());
        assert!(BacktraceSource.capture(0, 3).len() <= 3);
    }
}
