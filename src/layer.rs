use crate::level::Level;
use crate::logger::{Fields, Logger};
use crate::record::{CallSite, FILE_KEY};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that routes events through a [`Logger`].
///
/// The event's `message` becomes the record message and every other field
/// except `file` is stored as record metadata. The callsite's file and line
/// travel with the record as a [`CallSite::Declared`]. Levels map as
/// `ERROR`, `WARN`, `INFO` one-to-one, with both `DEBUG` and `TRACE` landing on
/// [`Level::Debug`]. Caller attribution, formatting and writing all
/// happen synchronously on the emitting thread.
pub struct LineLogLayer {
    logger: Logger,
}

impl LineLogLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for LineLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.logger.is_enabled(level) {
            return;
        }

        let call_site = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => Some(CallSite::Declared { file: file.to_string(), line }),
            _ => None,
        };

        let mut fields = Fields::new();
        let mut message = String::new();
        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        self.logger.log_from(call_site, level, message, fields);
    }
}

/// Collects event fields into record metadata.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut String,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        // reserved for attribution
        if field.name() != FILE_KEY {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        // `info!("x = {}", x)` records its message here as format arguments
        if field.name() == "message" {
            *self.message = format!("{:?}", value);
        } else {
            self.insert(field, serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
