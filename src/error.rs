//! Error types for skein
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - A split between rejections, contained faults and transport errors
//! - Context-carrying constructors

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::dispatch::ValueKind;

/// Result type alias for skein operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Dispatch errors (3xx)
    NotCallable = 300,
    ArityMismatch = 301,
    ArgumentType = 302,

    // Call errors (4xx)
    Transport = 400,
    CallTimeout = 401,
    CallPanicked = 402,
    NoNode = 403,
    Serialization = 404,

    // Trace errors (5xx)
    SpanStart = 500,

    // Internal errors (9xx)
    InternalError = 900,
    NoRuntime = 901,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Dispatch Rejections
    // ─────────────────────────────────────────────────────────────

    /// The dispatched value is not a function
    #[error("param function is not function ({kind})")]
    NotCallable { kind: ValueKind },

    /// Declared parameter count differs from the supplied argument count
    #[error("param length {expected} not equal to provide length {actual}, func: {function}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// An argument cannot be converted to its declared parameter type
    #[error("argument {index} of {function} expects {expected}, got {actual}")]
    ArgumentType {
        function: String,
        index: usize,
        expected: ValueKind,
        actual: ValueKind,
    },

    // ─────────────────────────────────────────────────────────────
    // Call Errors
    // ─────────────────────────────────────────────────────────────

    /// Transport-level failure reported by the raw call
    #[error("Transport error calling {target}: {message}")]
    Transport { target: String, message: String },

    /// The transport gave up waiting for a reply
    #[error("Call to {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    /// A panic inside the call chain, converted into an error value
    #[error("rpc client exception calling {target}: {message}")]
    CallPanicked { target: String, message: String },

    /// No node is registered for the requested service
    #[error("No node available for service {service}")]
    NoNode { service: String },

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Trace Errors
    // ─────────────────────────────────────────────────────────────

    /// The tracer refused to start a span
    #[error("Failed to start span {operation}: {message}")]
    SpanStart { operation: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// No tokio runtime is available to schedule tasks on
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                // Reads report through IoRead, so bare IO errors come from writes
                _ => ErrorCode::IoWrite,
            },

            Error::NotCallable { .. } => ErrorCode::NotCallable,
            Error::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            Error::ArgumentType { .. } => ErrorCode::ArgumentType,

            Error::Transport { .. } => ErrorCode::Transport,
            Error::Timeout { .. } => ErrorCode::CallTimeout,
            Error::CallPanicked { .. } => ErrorCode::CallPanicked,
            Error::NoNode { .. } => ErrorCode::NoNode,
            Error::Serialization(_) => ErrorCode::Serialization,

            Error::SpanStart { .. } => ErrorCode::SpanStart,

            Error::NoRuntime(_) => ErrorCode::NoRuntime,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable by the caller
    ///
    /// The pipeline itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::Timeout { .. } | Error::Io(_)
        )
    }

    /// Check if the error is a pre-invocation rejection
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::NotCallable { .. } | Error::ArityMismatch { .. } | Error::ArgumentType { .. }
        )
    }

    /// Format the error for logging
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a transport error
    pub fn transport(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transport {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(target: impl Into<String>, timeout_ms: u64) -> Self {
        Error::Timeout {
            target: target.into(),
            timeout_ms,
        }
    }

    /// Create a span start error
    pub fn span_start(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SpanStart {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
