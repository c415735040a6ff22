//! Tracer and span trait definitions
//!
//! Defines the distributed-tracing collaborator used by the call pipeline.

use std::fmt;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Span Tags
// ─────────────────────────────────────────────────────────────────

/// Role of a span in an RPC exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Outbound call
    Client,
    /// Inbound call
    Server,
    /// Local work
    Internal,
}

impl SpanKind {
    /// Get the conventional tag value
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Client => "client",
            SpanKind::Server => "server",
            SpanKind::Internal => "internal",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed span annotation
#[derive(Debug, Clone, PartialEq)]
pub enum SpanTag {
    /// Role marker
    Kind(SpanKind),
    /// Address of the remote node
    PeerAddress(String),
    /// Identifier of the remote node
    PeerHostname(String),
    /// HTTP-style status equivalent
    HttpStatus(u16),
    /// HTTP-style method equivalent
    HttpMethod(String),
    /// Error flag
    Error(bool),
    /// Sampling priority hint (higher means keep)
    SamplingPriority(u16),
    /// Free-form string tag
    Custom { key: String, value: String },
}

impl SpanTag {
    /// Tag key, following OpenTracing semantic conventions
    pub fn key(&self) -> &str {
        match self {
            SpanTag::Kind(_) => "span.kind",
            SpanTag::PeerAddress(_) => "peer.address",
            SpanTag::PeerHostname(_) => "peer.hostname",
            SpanTag::HttpStatus(_) => "http.status_code",
            SpanTag::HttpMethod(_) => "http.method",
            SpanTag::Error(_) => "error",
            SpanTag::SamplingPriority(_) => "sampling.priority",
            SpanTag::Custom { key, .. } => key.as_str(),
        }
    }

    /// Tag value rendered as a string
    pub fn value(&self) -> String {
        match self {
            SpanTag::Kind(kind) => kind.to_string(),
            SpanTag::PeerAddress(v) | SpanTag::PeerHostname(v) | SpanTag::HttpMethod(v) => v.clone(),
            SpanTag::HttpStatus(code) => code.to_string(),
            SpanTag::Error(flag) => flag.to_string(),
            SpanTag::SamplingPriority(p) => p.to_string(),
            SpanTag::Custom { value, .. } => value.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Span & Tracer
// ─────────────────────────────────────────────────────────────────

/// A single timed, annotatable unit of trace data
///
/// Methods take `&self`; spans are shared between the context that carries
/// them and the layer that finishes them.
pub trait Span: Send + Sync + fmt::Debug {
    /// Operation name the span was started with
    fn operation(&self) -> &str;

    /// Attach a typed tag
    fn set_tag(&self, tag: SpanTag);

    /// Attach a key/value log entry
    fn log_kv(&self, key: &str, value: &str);

    /// Finish the span. Calls after the first are ignored.
    fn finish(&self);
}

/// Distributed-tracing backend
pub trait Tracer: Send + Sync {
    /// Start a span as a child of whatever span `ctx` carries
    fn start_span(&self, ctx: &ExecutionContext, operation: &str) -> Result<Arc<dyn Span>>;
}

/// Start a span and return a context carrying it
pub fn start_span_from_context(
    tracer: &dyn Tracer,
    ctx: &ExecutionContext,
    operation: &str,
) -> Result<(ExecutionContext, Arc<dyn Span>)> {
    let span = tracer.start_span(ctx, operation)?;
    Ok((ctx.with_span(span.clone()), span))
}

/// Finishes the wrapped span when dropped, including during unwinding
pub struct FinishOnDrop(pub Arc<dyn Span>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

// ─────────────────────────────────────────────────────────────────
// No-op Implementation
// ─────────────────────────────────────────────────────────────────

/// Tracer that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

/// Span returned by [`NoopTracer`]
#[derive(Debug)]
pub struct NoopSpan {
    operation: String,
}

impl Span for NoopSpan {
    fn operation(&self) -> &str {
        &self.operation
    }

    fn set_tag(&self, _tag: SpanTag) {}

    fn log_kv(&self, _key: &str, _value: &str) {}

    fn finish(&self) {}
}

impl Tracer for NoopTracer {
    fn start_span(&self, _ctx: &ExecutionContext, operation: &str) -> Result<Arc<dyn Span>> {
        Ok(Arc::new(NoopSpan {
            operation: operation.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_keys() {
        assert_eq!(SpanTag::Kind(SpanKind::Client).key(), "span.kind");
        assert_eq!(SpanTag::Kind(SpanKind::Client).value(), "client");
        assert_eq!(SpanTag::PeerAddress("10.0.0.1:9000".into()).key(), "peer.address");
        assert_eq!(SpanTag::SamplingPriority(1).value(), "1");
        let custom = SpanTag::Custom {
            key: "db.instance".into(),
            value: "users".into(),
        };
        assert_eq!(custom.key(), "db.instance");
        assert_eq!(custom.value(), "users");
    }

    #[test]
    fn test_start_span_from_context_attaches_span() {
        let ctx = ExecutionContext::background();
        let (child, span) = start_span_from_context(&NoopTracer, &ctx, "svc.op").unwrap();
        assert_eq!(span.operation(), "svc.op");
        assert_eq!(child.span().map(|s| s.operation().to_string()), Some("svc.op".to_string()));
        assert!(ctx.span().is_none());
    }
}
