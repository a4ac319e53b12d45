//! Captured diagnostics.
//!
//! Provides a [`DiagnosticCollector`] that keeps `tracing` events at or above
//! a minimum level in a bounded ring buffer, and a [`DiagnosticReader`] handle
//! for inspecting them. Hosts use it to surface warnings such as the
//! filtered-value fallback notice next to their own output.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A single captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Event level.
    pub level: Level,
    /// Target module path.
    pub target: String,
    /// The formatted message.
    pub message: String,
    /// Remaining event fields as `name=value` pairs, in record order.
    pub fields: Vec<(String, String)>,
}

impl Diagnostic {
    /// Value of a recorded field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.level, self.target, self.message)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct DiagnosticBuffer {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl DiagnosticBuffer {
    fn push(&mut self, diagnostic: Diagnostic) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }
}

/// A `tracing` layer that captures events into a shared ring buffer.
///
/// Only events at `min_level` or more severe are kept; the default is
/// [`Level::WARN`].
#[derive(Debug, Clone)]
pub struct DiagnosticCollector {
    buffer: Arc<Mutex<DiagnosticBuffer>>,
    min_level: Level,
}

impl DiagnosticCollector {
    /// Create a collector for warnings and errors with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(DiagnosticBuffer {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            })),
            min_level: Level::WARN,
        }
    }

    /// Keep events at `level` or more severe.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Get a reader handle for the captured diagnostics.
    pub fn reader(&self) -> DiagnosticReader {
        DiagnosticReader {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Lower levels compare greater: ERROR < WARN < INFO.
        if *metadata.level() > self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(Diagnostic {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            });
        }
    }
}

/// A read handle for the diagnostic buffer.
#[derive(Debug, Clone)]
pub struct DiagnosticReader {
    buffer: Arc<Mutex<DiagnosticBuffer>>,
}

impl DiagnosticReader {
    /// Snapshot of all captured diagnostics, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.buffer
            .lock()
            .map(|buf| buf.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Captured diagnostics whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<Diagnostic> {
        self.entries()
            .into_iter()
            .filter(|d| d.message.contains(needle))
            .collect()
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.entries.clear();
        }
    }

    /// Number of captured diagnostics.
    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.entries.len()).unwrap_or(0)
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    #[test]
    fn test_collector_keeps_warnings_and_errors() {
        let collector = DiagnosticCollector::new(100);
        let reader = collector.reader();

        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::info!("not kept");
        tracing::warn!(table = "form:t", "a warning");
        tracing::error!("an error");

        let entries = reader.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].message, "a warning");
        assert_eq!(entries[0].field("table"), Some("form:t"));
        assert_eq!(entries[1].level, Level::ERROR);
    }

    #[test]
    fn test_min_level_override() {
        let collector = DiagnosticCollector::new(10).with_min_level(Level::DEBUG);
        let reader = collector.reader();

        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::debug!("kept");
        tracing::trace!("dropped");

        assert_eq!(reader.len(), 1);
        assert_eq!(reader.matching("kept").len(), 1);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let collector = DiagnosticCollector::new(3);
        let reader = collector.reader();

        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::warn!("one");
        tracing::warn!("two");
        tracing::warn!("three");
        tracing::warn!("four");

        let entries = reader.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "two");

        reader.clear();
        assert!(reader.is_empty());
    }

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic {
            level: Level::WARN,
            target: "searchgrid_core::filter".to_string(),
            message: "fallback".to_string(),
            fields: vec![("table".to_string(), "t".to_string())],
        };
        assert_eq!(
            diagnostic.to_string(),
            "WARN searchgrid_core::filter: fallback table=t"
        );
    }
}
