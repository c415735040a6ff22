//! Logger collaborator
//!
//! Dispatched tasks and pipeline calls report their outcome only through a
//! [`Logger`]. This module provides the trait and its implementations.

mod traits;
mod memory;
mod tracing_logger;

pub use traits::*;
pub use memory::{LogEntry, MemoryLogger};
pub use tracing_logger::TracingLogger;
