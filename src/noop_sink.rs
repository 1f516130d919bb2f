use crate::sink::LogSink;
use std::io;

/// A sink that simply drops all lines.
///
/// Default sink of a `LoggerBuilder` that was never given one. Also useful
/// for measuring the cost of attribution and formatting without any I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn write_line(&self, _line: &[u8]) -> io::Result<()> {
        Ok(())
    }
}
