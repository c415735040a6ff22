//! skein - panic-safe task dispatch and traced RPC call pipelines
//!
//! Two independent building blocks for service code:
//!
//! - [`Dispatcher`] launches a callable as a fire-and-forget tokio task. Call
//!   shapes are checked at runtime, nil arguments become zero values, and
//!   panics are contained and logged instead of taking the process down.
//! - [`CallPipeline`] wraps a raw outbound call in an ordered interceptor
//!   chain: fault containment, one span per call, and a structured log
//!   record of every call.
//!
//! Logging, tracing and the transport are collaborators supplied through the
//! [`Logger`], [`Tracer`] and [`Call`] traits.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fault;
pub mod logger;
pub mod logging;
pub mod rpc;
pub mod trace;

pub use config::SkeinConfig;
pub use context::ExecutionContext;
pub use dispatch::{Dispatcher, DynFunction, Value, ValueKind};
pub use error::{Error, ErrorCode, Result};
pub use logger::{Logger, Severity};
pub use rpc::{Call, CallOptions, CallPipeline, CallRecord, Node, Request, Response, RpcClient};
pub use trace::{Span, Tracer};

/// Dispatch a callable with arguments converted through [`Value::from`]
///
/// Prefix the callable with `fn` to erase a typed function or closure:
///
/// ```ignore
/// dispatch!(dispatcher, fn send_welcome, ctx.clone(), "ada@example.com");
/// dispatch!(dispatcher, prepared_value, 1, 2);
/// ```
#[macro_export]
macro_rules! dispatch {
    ($dispatcher:expr, fn $f:expr $(, $arg:expr)* $(,)?) => {
        $dispatcher.dispatch(
            $crate::Value::func($f),
            ::std::vec![$($crate::Value::from($arg)),*],
        )
    };
    ($dispatcher:expr, $callable:expr $(, $arg:expr)* $(,)?) => {
        $dispatcher.dispatch(
            $callable,
            ::std::vec![$($crate::Value::from($arg)),*],
        )
    };
}
