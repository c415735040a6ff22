//! Outbound call pipeline
//!
//! Wraps a raw call operation in an ordered chain of interceptors:
//! - [`RecoverWrapper`]: panics below become [`Error::CallPanicked`](crate::Error::CallPanicked)
//! - [`SpanWrapper`]: one span per call, always finished
//! - [`ObserveWrapper`]: span annotation, timing and one [`CallRecord`] per call
//!
//! The transport is any [`Call`] implementation supplied by the embedder.

mod call;
mod client;
mod observe;
mod record;
mod recover;
mod selector;
mod span;
mod types;

pub use call::*;
pub use client::*;
pub use observe::*;
pub use record::*;
pub use recover::*;
pub use selector::*;
pub use span::*;
pub use types::*;
