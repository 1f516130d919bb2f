use crate::level::Level;
use crate::record::LogRecord;
use std::error::Error;

/// Callback run on every emitted record before it is formatted.
///
/// Hooks may annotate the record in place. They are invoked synchronously
/// on the emitting thread and must not hold state shared between calls.
pub trait Hook: Send + Sync {
    /// Levels this hook wants to see.
    fn levels(&self) -> &[Level];

    /// Annotate `record`.
    ///
    /// **Returns**
    /// - `Ok(())` when the hook ran (including when it had nothing to add).
    /// - `Err(..)` on failure; the logger reports it on stderr and still
    ///   writes the record.
    fn fire(&self, record: &mut LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}
