//! Tracer backed by `tracing` spans
//!
//! Each started span becomes a `tracing` span with the well-known tag fields
//! declared up front; span logs become debug events inside it. Finishing the
//! span drops it, which closes it for every subscriber layer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::Empty;

use crate::context::ExecutionContext;
use crate::error::Result;

use super::{Span, SpanTag, Tracer};

/// [`Tracer`] that maps spans onto the `tracing` ecosystem
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

/// Span produced by [`TracingTracer`]
#[derive(Debug)]
pub struct TracingSpan {
    operation: String,
    span: Mutex<Option<tracing::Span>>,
}

impl TracingSpan {
    fn with_span(&self, f: impl FnOnce(&tracing::Span)) {
        if let Some(span) = self.span.lock().as_ref() {
            f(span);
        }
    }
}

impl Span for TracingSpan {
    fn operation(&self) -> &str {
        &self.operation
    }

    fn set_tag(&self, tag: SpanTag) {
        self.with_span(|span| match &tag {
            SpanTag::Custom { key, value } => span.in_scope(|| {
                tracing::debug!(target: "skein::trace", tag = %key, value = %value, "span tag");
            }),
            declared => {
                span.record(declared.key(), declared.value().as_str());
            }
        });
    }

    fn log_kv(&self, key: &str, value: &str) {
        self.with_span(|span| {
            span.in_scope(|| {
                tracing::debug!(target: "skein::trace", key = %key, value = %value, "span log");
            })
        });
    }

    fn finish(&self) {
        self.span.lock().take();
    }
}

impl Tracer for TracingTracer {
    fn start_span(&self, ctx: &ExecutionContext, operation: &str) -> Result<Arc<dyn Span>> {
        let span = tracing::info_span!(
            target: "skein::trace",
            "span",
            otel.name = %operation,
            trace_id = %ctx.trace_id(),
            span.kind = Empty,
            peer.address = Empty,
            peer.hostname = Empty,
            http.method = Empty,
            http.status_code = Empty,
            error = Empty,
            sampling.priority = Empty,
        );

        Ok(Arc::new(TracingSpan {
            operation: operation.to_string(),
            span: Mutex::new(Some(span)),
        }))
    }
}
