//! Request tracing.
//!
//! A [`Tracer`] is built once at startup with [`Tracer::init`], handed to the
//! request pipeline, and shut down explicitly on exit. Each handled request
//! gets a [`Span`]; finished spans go to a [`SpanExporter`].

mod exporters;

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

pub use exporters::{ExporterKind, InMemoryExporter, LogExporter, NoopExporter};

/// Receives spans once they end.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: FinishedSpan);

    /// Flush and release resources. Called once by [`Tracer::shutdown`].
    fn shutdown(&self) {}
}

/// A span that has ended, as handed to exporters.
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub tracer: String,
    pub name: String,
    pub span_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub attributes: Vec<(String, String)>,
}

impl FinishedSpan {
    /// Value of the first attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Explicit tracing context shared by all request handlers.
pub struct Tracer {
    name: String,
    exporter: Arc<dyn SpanExporter>,
    active: AtomicBool,
}

impl Tracer {
    /// Build a tracer that sends finished spans to `exporter`.
    pub fn init(name: impl Into<String>, exporter: Arc<dyn SpanExporter>) -> Arc<Self> {
        let name = name.into();
        info!(tracer = %name, "Tracer initialized");
        Arc::new(Self {
            name,
            exporter,
            active: AtomicBool::new(true),
        })
    }

    /// A tracer that drops every span.
    pub fn noop() -> Arc<Self> {
        Self::init("noop", Arc::new(NoopExporter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start a span. It is exported when ended or dropped.
    pub fn start_span(self: &Arc<Self>, name: impl Into<String>) -> Span {
        Span {
            tracer: Arc::clone(self),
            name: name.into(),
            span_id: Uuid::new_v4(),
            start_time: Utc::now(),
            started: Instant::now(),
            attributes: Vec::new(),
            ended: false,
        }
    }

    /// Stop exporting. Spans ending afterwards are discarded.
    pub fn shutdown(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.exporter.shutdown();
            info!(tracer = %self.name, "Tracer shut down");
        }
    }

    fn export(&self, span: FinishedSpan) {
        if self.is_active() {
            self.exporter.export(span);
        }
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Timing and attribute record for one handled request.
pub struct Span {
    tracer: Arc<Tracer>,
    name: String,
    span_id: Uuid,
    start_time: DateTime<Utc>,
    started: Instant,
    attributes: Vec<(String, String)>,
    ended: bool,
}

impl Span {
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// End the span and hand it to the exporter.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.tracer.export(FinishedSpan {
            tracer: self.tracer.name.clone(),
            name: std::mem::take(&mut self.name),
            span_id: self.span_id,
            start_time: self.start_time,
            duration: self.started.elapsed(),
            attributes: std::mem::take(&mut self.attributes),
        });
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.finish();
    }
}
