pub mod level;
pub mod record;
pub mod hook;
pub mod attribution;
pub mod formatter;
pub mod sink;
pub mod noop_sink;
pub mod logger;
pub mod layer;
pub mod init;
pub mod env;

pub use attribution::{AttributionConfig, CallerAttributionHook};
pub use formatter::{Formatter, LineFormatter};
pub use hook::Hook;
pub use init::{init_logging, init_logging_or_exit, install_tracing, InitError, LoggingConfig};
pub use level::Level;
pub use logger::Logger;
pub use record::LogRecord;
pub use sink::LogSink;
