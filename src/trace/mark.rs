//! Function trace markers
//!
//! Drops a short span at a call site so that traces show which function a
//! unit of work passed through.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::context::ExecutionContext;
use crate::logger::{Logger, Severity};

use super::{start_span_from_context, Tracer};

static PROJECT_ROOT: OnceLock<String> = OnceLock::new();

fn project_root() -> &'static str {
    PROJECT_ROOT.get_or_init(|| {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .display()
            .to_string()
    })
}

/// Mark the caller's location in the trace
///
/// Starts a span named `name`, logs the caller's `file` and `line` and the
/// process `root`, finishes it and returns a context carrying the span. When
/// the tracer refuses the span the error is logged and `ctx` is returned as-is.
#[track_caller]
pub fn mark(
    ctx: &ExecutionContext,
    tracer: &dyn Tracer,
    logger: &dyn Logger,
    name: &str,
) -> ExecutionContext {
    let location = std::panic::Location::caller();

    let (traced, span) = match start_span_from_context(tracer, ctx, name) {
        Ok(started) => started,
        Err(e) => {
            logger.log(ctx, Severity::Error, &e.to_string());
            return ctx.clone();
        }
    };

    span.log_kv("file", location.file());
    span.log_kv("line", &location.line().to_string());
    span.log_kv("root", project_root());
    span.finish();

    traced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use crate::trace::{MemoryTracer, Span};

    #[test]
    fn test_mark_records_call_site() {
        let tracer = MemoryTracer::new();
        let logger = MemoryLogger::new();
        let ctx = ExecutionContext::background();

        let traced = mark(&ctx, &tracer, &logger, "billing::charge");

        let span = &tracer.spans()[0];
        assert_eq!(span.operation(), "billing::charge");
        assert!(span.log_value("file").unwrap().ends_with("mark.rs"));
        assert!(span.log_value("line").unwrap().parse::<u32>().is_ok());
        assert!(span.log_value("root").is_some());
        assert!(span.is_finished());
        assert_eq!(traced.span().map(|s| s.operation().to_string()).as_deref(), Some("billing::charge"));
        assert!(logger.entries().is_empty());
    }

    #[test]
    fn test_mark_falls_back_on_refusal() {
        let tracer = MemoryTracer::refusing();
        let logger = MemoryLogger::new();
        let ctx = ExecutionContext::background();

        let traced = mark(&ctx, &tracer, &logger, "billing::charge");

        assert!(traced.span().is_none());
        assert_eq!(traced.trace_id(), ctx.trace_id());
        assert_eq!(logger.count(Severity::Error), 1);
    }
}
