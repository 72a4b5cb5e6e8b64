//! Span exporters.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{FinishedSpan, SpanExporter};

/// Exporter selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// Write spans to the log
    #[default]
    Log,
    /// Discard spans
    None,
}

impl ExporterKind {
    pub fn build(self) -> Arc<dyn SpanExporter> {
        match self {
            ExporterKind::Log => Arc::new(LogExporter),
            ExporterKind::None => Arc::new(NoopExporter),
        }
    }
}

/// Writes each finished span as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn export(&self, span: FinishedSpan) {
        let attributes = span
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");

        tracing::info!(
            tracer = %span.tracer,
            span = %span.name,
            span_id = %span.span_id,
            start = %span.start_time.to_rfc3339(),
            duration = ?span.duration,
            attributes = %attributes,
            "span"
        );
    }
}

/// Discards every span.
#[derive(Debug, Clone, Default)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: FinishedSpan) {}
}

/// Keeps finished spans in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }

    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: FinishedSpan) {
        self.spans.lock().push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    fn finished(name: &str) -> FinishedSpan {
        FinishedSpan {
            tracer: "t".to_string(),
            name: name.to_string(),
            span_id: Uuid::new_v4(),
            start_time: Utc::now(),
            duration: Duration::from_millis(2),
            attributes: vec![("elapse".to_string(), "2".to_string())],
        }
    }

    #[test]
    fn test_memory_exporter_shares_buffer() {
        let exporter = InMemoryExporter::new();
        let clone = exporter.clone();

        clone.export(finished("a"));
        exporter.export(finished("b"));

        assert_eq!(exporter.len(), 2);
        exporter.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_exporter_kind_parses_lowercase() {
        let kind: ExporterKind = serde_yaml::from_str("none").unwrap();
        assert_eq!(kind, ExporterKind::None);
        assert_eq!(ExporterKind::default(), ExporterKind::Log);
    }

    #[test]
    fn test_log_exporter_accepts_span() {
        LogExporter.export(finished("GET /meals"));
    }

    #[test]
    fn test_log_exporter_handles_oversized_duration() {
        let mut span = finished("GET /meals");
        span.duration = Duration::MAX;
        LogExporter.export(span);
    }
}
