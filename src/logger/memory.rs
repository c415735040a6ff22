//! In-memory logger
//!
//! Keeps every entry so the outcome of fire-and-forget work can be inspected
//! after the fact.

use parking_lot::Mutex;

use crate::context::ExecutionContext;
use crate::rpc::CallRecord;

use super::{Logger, Severity};

/// A captured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity of the entry
    pub severity: Severity,

    /// Formatted message
    pub message: String,

    /// Trace id of the originating context
    pub trace_id: String,

    /// Call summary, for entries emitted through `record_call`
    pub record: Option<CallRecord>,
}

/// [`Logger`] that stores entries in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries at exactly `severity`
    pub fn at(&self, severity: Severity) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }

    /// Number of entries at exactly `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }

    /// Call records emitted through `record_call`
    pub fn records(&self) -> Vec<CallRecord> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.record.clone())
            .collect()
    }

    /// Whether any entry's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, ctx: &ExecutionContext, severity: Severity, message: String, record: Option<CallRecord>) {
        self.entries.lock().push(LogEntry {
            severity,
            message,
            trace_id: ctx.trace_id().to_string(),
            record,
        });
    }
}

impl Logger for MemoryLogger {
    fn log(&self, ctx: &ExecutionContext, severity: Severity, message: &str) {
        self.push(ctx, severity, message.to_string(), None);
    }

    fn record_call(&self, ctx: &ExecutionContext, record: &CallRecord) {
        self.push(ctx, Severity::Info, record.to_string(), Some(record.clone()));
    }
}
