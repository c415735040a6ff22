//! Task dispatcher module
//!
//! Launches callables as fire-and-forget tasks:
//! - Runtime-checked call shapes over dynamic [`Value`]s
//! - Nil arguments coerced to parameter zero values
//! - Panics contained and logged
//! - Typed async tasks through [`Dispatcher::spawn`]

mod dispatcher;
mod function;
mod state;
mod value;

pub use dispatcher::*;
pub use function::*;
pub use state::*;
pub use value::{Param, Reply, Value, ValueKind};
