//! Fault containment
//!
//! Converts panics raised inside a protected frame into [`Fault`] values.
//!
//! A process-wide panic hook is installed on first use. While a thread is
//! inside a protected frame the hook records a backtrace of the panicking
//! stack instead of printing the default report; outside a frame it defers
//! to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use futures_util::future::{CatchUnwind, FutureExt};

thread_local! {
    static CONTAINED_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let contained = CONTAINED_DEPTH.try_with(|d| d.get() > 0).unwrap_or(false);
            if contained {
                let backtrace = Backtrace::force_capture().to_string();
                let _ = LAST_BACKTRACE.try_with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as inside a protected frame until dropped
struct Frame;

impl Frame {
    fn enter() -> Self {
        install_hook();
        CONTAINED_DEPTH.with(|d| d.set(d.get() + 1));
        Frame
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        let _ = CONTAINED_DEPTH.try_with(|d| d.set(d.get().saturating_sub(1)));
    }
}

// ─────────────────────────────────────────────────────────────────
// Fault
// ─────────────────────────────────────────────────────────────────

/// A contained panic: its payload and the stack it was raised on
#[derive(Debug, Clone)]
pub struct Fault {
    message: String,
    backtrace: String,
}

impl Fault {
    fn capture(payload: Box<dyn Any + Send>) -> Self {
        let backtrace = LAST_BACKTRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| Backtrace::force_capture().to_string());

        Self {
            message: payload_message(payload.as_ref()),
            backtrace,
        }
    }

    /// Panic payload rendered as text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Full captured backtrace
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }

    /// Backtrace cut to at most `limit` bytes
    pub fn stack(&self, limit: usize) -> &str {
        if self.backtrace.len() <= limit {
            return &self.backtrace;
        }
        let mut end = limit;
        while !self.backtrace.is_char_boundary(end) {
            end -= 1;
        }
        &self.backtrace[..end]
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Protected Frames
// ─────────────────────────────────────────────────────────────────

/// Run `f`, converting a panic into a [`Fault`]
pub fn contain<R>(f: impl FnOnce() -> R) -> Result<R, Fault> {
    let _frame = Frame::enter();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Fault::capture)
}

/// Wrap `future` so that a panic during any poll resolves to a [`Fault`]
pub fn contain_async<F: Future>(future: F) -> Contained<F> {
    Contained {
        inner: AssertUnwindSafe(Box::pin(future)).catch_unwind(),
    }
}

/// Future returned by [`contain_async`]
pub struct Contained<F: Future> {
    inner: CatchUnwind<AssertUnwindSafe<Pin<Box<F>>>>,
}

impl<F: Future> Future for Contained<F> {
    type Output = Result<F::Output, Fault>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _frame = Frame::enter();
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(output)) => Poll::Ready(Ok(output)),
            Poll::Ready(Err(payload)) => Poll::Ready(Err(Fault::capture(payload))),
        }
    }
}
