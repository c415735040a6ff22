//! Per-call summary record

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Call names containing this fragment (case-insensitive) have their
/// request parameters redacted in the record.
pub const REDACTED_FRAGMENT: &str = "collection";

/// Summary of one finished pipeline call
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub service: String,
    pub endpoint: String,
    pub node_id: String,
    pub node_address: String,

    /// Serialized request body
    pub request: String,

    /// Serialized response body
    pub response: String,

    /// Error text, empty on success
    pub error: String,

    /// Wall-clock time spent in the layers below the observer
    pub elapsed: Duration,

    pub started_at: DateTime<Utc>,
}

impl CallRecord {
    /// Call name: `<service>.<endpoint>`
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.endpoint)
    }

    /// Request parameters as they may be logged
    pub fn params(&self) -> &str {
        if self.name().to_lowercase().contains(REDACTED_FRAGMENT) {
            "*"
        } else {
            &self.request
        }
    }

    /// Elapsed time in fractional milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {:.6}",
            self.name(),
            self.params(),
            self.response,
            self.error,
            self.elapsed_ms()
        )
    }
}
