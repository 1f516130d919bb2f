use crate::record::LogRecord;
use std::error::Error;
use std::fmt::Write;

/// Layout of the bracketed timestamp, e.g. `2024-03-05 14:07:09.042+0100`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f%z";

/// Renders a [`LogRecord`] into the bytes written to a sink.
pub trait Formatter: Send + Sync {
    /// Produce one complete output line for `record`.
    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>>;
}

/// Single-line text formatter:
///
/// ```text
/// [2024-03-05 14:07:09.042+0100] [ERROR] [main.rs:42] - message\n
/// ```
///
/// The file bracket is always present, empty when the record carries no
/// attribution. Line feeds in the message become `\n` and other control
/// characters are rendered in caret notation, so every record occupies
/// exactly one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormatter;

impl LineFormatter {
    /// Same as [`Formatter::format`] without the error wrapper; this layout
    /// cannot fail.
    pub fn format_line(&self, record: &LogRecord) -> String {
        let mut line = String::with_capacity(48 + record.message.len());

        // Writing into a String is infallible.
        let _ = write!(line, "[{}] ", record.timestamp.format(TIMESTAMP_FORMAT));
        push_bracketed(&mut line, record.level.as_str());
        push_bracketed(&mut line, record.file().unwrap_or(""));

        line.push_str("- ");
        escape_into(&mut line, &record.message);
        line.push('\n');

        line
    }
}

impl Formatter for LineFormatter {
    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        Ok(self.format_line(record).into_bytes())
    }
}

// Escaped like the message so a bracket never spans lines.
fn push_bracketed(line: &mut String, value: &str) {
    line.push('[');
    escape_into(line, value);
    line.push_str("] ");
}

/// Append `message` to `out` with line feeds and control characters escaped.
pub fn escape_into(out: &mut String, message: &str) {
    for c in message.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if (c as u32) < 0x20 || c == '\x7f' => push_caret(out, c),
            c => out.push(c),
        }
    }
}

/// Escaped copy of `message`.
pub fn escape_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    escape_into(&mut out, message);
    out
}

/// Caret notation for a non-printable character: `^@` for NUL through `^_`
/// for 0x1F, and `^?` for DEL. Printable input is returned unchanged.
pub fn non_printable_placeholder(c: char) -> String {
    let mut out = String::with_capacity(2);
    if (c as u32) < 0x20 || c == '\x7f' {
        push_caret(&mut out, c);
    } else {
        out.push(c);
    }
    out
}

fn push_caret(out: &mut String, c: char) {
    out.push('^');
    // 0x7f ^ 0x40 == '?', 0x00..=0x1f ^ 0x40 == '@'..='_'
    out.push(((c as u8) ^ 0x40) as char);
}
