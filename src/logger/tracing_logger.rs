//! Logger that forwards to `tracing`

use crate::context::ExecutionContext;
use crate::rpc::CallRecord;

use super::{Logger, Severity};

/// [`Logger`] that emits `tracing` events
///
/// The context's trace id is attached to every event as `trace_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, ctx: &ExecutionContext, severity: Severity, message: &str) {
        let trace_id = ctx.trace_id();
        match severity {
            Severity::Debug => tracing::debug!(trace_id = %trace_id, "{}", message),
            Severity::Info => tracing::info!(trace_id = %trace_id, "{}", message),
            Severity::Warn => tracing::warn!(trace_id = %trace_id, "{}", message),
            Severity::Error => tracing::error!(trace_id = %trace_id, "{}", message),
        }
    }

    fn record_call(&self, ctx: &ExecutionContext, record: &CallRecord) {
        tracing::info!(
            trace_id = %ctx.trace_id(),
            call = %record.name(),
            node = %record.node_id,
            address = %record.node_address,
            params = %record.params(),
            response = %record.response,
            error = %record.error,
            elapsed_ms = record.elapsed_ms(),
            "rpc call finished"
        );
    }
}
