//! Distributed tracing collaborator
//!
//! This module provides the tracer abstraction used by the call pipeline and
//! implementations for different sinks.

mod traits;
mod mark;
mod memory;
mod tracing_tracer;

pub use traits::*;
pub use mark::mark;
pub use memory::{MemorySpan, MemoryTracer};
pub use tracing_tracer::{TracingSpan, TracingTracer};
