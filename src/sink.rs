use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination for formatted log lines.
///
/// The logger calls `write_line` once per record with a complete,
/// newline-terminated line. Implementations must make each call atomic with
/// respect to other threads so lines never interleave.
pub trait LogSink: Send + Sync {
    /// Write one formatted line.
    ///
    /// **Returns**
    /// - `Ok(())` once the whole line was handed to the destination.
    /// - `Err(..)` on I/O failure; the logger reports it on stderr and
    ///   drops the line.
    fn write_line(&self, line: &[u8]) -> io::Result<()>;

    /// Flush buffered output. Default implementation is a no-op.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink writing to a file opened with create + truncate semantics.
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Create `path`, or truncate it if it exists, and open it for writing.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        Self { file: Mutex::new(file) }
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        // A panic mid-write leaves at worst a partial line; keep logging.
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for FileSink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut file = self.lock();
        file.write_all(line)?;
        file.flush()
    }

    fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// In-memory sink collecting every line, shareable across clones.
///
/// Handy for tests and for tools that want to inspect their own log output.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for BufferSink {
    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        self.lock().extend_from_slice(line);
        Ok(())
    }
}
