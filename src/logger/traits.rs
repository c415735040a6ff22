//! Logger trait definitions

use std::fmt;

use crate::context::ExecutionContext;
use crate::rpc::CallRecord;

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Get the lowercase level name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured logger collaborator
///
/// Every entry is tied to the context of the work that produced it.
pub trait Logger: Send + Sync {
    /// Emit a formatted message
    fn log(&self, ctx: &ExecutionContext, severity: Severity, message: &str);

    /// Emit the summary line of a finished pipeline call
    fn record_call(&self, ctx: &ExecutionContext, record: &CallRecord) {
        self.log(ctx, Severity::Info, &record.to_string());
    }
}
