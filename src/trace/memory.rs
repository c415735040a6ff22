//! In-memory tracer
//!
//! Records every span, tag and log entry so that embedders and tests can
//! inspect exactly what the pipeline annotated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::error::{Error, Result};

use super::{Span, SpanTag, Tracer};

/// Span recorded by [`MemoryTracer`]
#[derive(Debug)]
pub struct MemorySpan {
    operation: String,
    trace_id: String,
    parent: Option<String>,
    tags: Mutex<Vec<SpanTag>>,
    logs: Mutex<Vec<(String, String)>>,
    finish_calls: AtomicUsize,
}

impl MemorySpan {
    /// Trace id of the context the span was started from
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Operation of the span that was current when this one started
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// All tags in the order they were set
    pub fn tags(&self) -> Vec<SpanTag> {
        self.tags.lock().clone()
    }

    /// Last tag set under `key`
    pub fn tag(&self, key: &str) -> Option<SpanTag> {
        self.tags.lock().iter().rev().find(|t| t.key() == key).cloned()
    }

    /// All key/value logs in the order they were written
    pub fn logs(&self) -> Vec<(String, String)> {
        self.logs.lock().clone()
    }

    /// First log value written under `key`
    pub fn log_value(&self, key: &str) -> Option<String> {
        self.logs
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Number of times `finish` was called
    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }

    /// Whether the span has been finished
    pub fn is_finished(&self) -> bool {
        self.finish_calls() > 0
    }
}

impl Span for MemorySpan {
    fn operation(&self) -> &str {
        &self.operation
    }

    fn set_tag(&self, tag: SpanTag) {
        if !self.is_finished() {
            self.tags.lock().push(tag);
        }
    }

    fn log_kv(&self, key: &str, value: &str) {
        if !self.is_finished() {
            self.logs.lock().push((key.to_string(), value.to_string()));
        }
    }

    fn finish(&self) {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// [`Tracer`] that keeps started spans in memory
#[derive(Debug, Default)]
pub struct MemoryTracer {
    spans: Mutex<Vec<Arc<MemorySpan>>>,
    refuse: bool,
}

impl MemoryTracer {
    /// Create a tracer that records spans
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracer whose span creation always fails
    pub fn refusing() -> Self {
        Self {
            spans: Mutex::new(Vec::new()),
            refuse: true,
        }
    }

    /// All started spans in start order
    pub fn spans(&self) -> Vec<Arc<MemorySpan>> {
        self.spans.lock().clone()
    }

    /// Number of started spans
    pub fn started(&self) -> usize {
        self.spans.lock().len()
    }

    /// Number of spans finished at least once
    pub fn finished(&self) -> usize {
        self.spans.lock().iter().filter(|s| s.is_finished()).count()
    }

    /// Drop all recorded spans
    pub fn clear(&self) {
        self.spans.lock().clear();
    }
}

impl Tracer for MemoryTracer {
    fn start_span(&self, ctx: &ExecutionContext, operation: &str) -> Result<Arc<dyn Span>> {
        if self.refuse {
            return Err(Error::span_start(operation, "tracer refused span"));
        }

        let span = Arc::new(MemorySpan {
            operation: operation.to_string(),
            trace_id: ctx.trace_id().to_string(),
            parent: ctx.span().map(|s| s.operation().to_string()),
            tags: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            finish_calls: AtomicUsize::new(0),
        });
        self.spans.lock().push(span.clone());
        Ok(span)
    }
}
