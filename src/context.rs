//! Execution context propagation
//!
//! An [`ExecutionContext`] is threaded through dispatched tasks and pipeline
//! calls. It carries:
//! - A trace identifier for log correlation
//! - An optional deadline
//! - A cancellation signal shared by all contexts derived from the same root
//! - A small string value bag
//! - The span currently active for this unit of work

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::trace::Span;

/// Cancellation/deadline/value-bag token
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    trace_id: String,
    deadline: Option<Instant>,
    cancel: Arc<watch::Sender<bool>>,
    values: HashMap<String, String>,
    span: Option<Arc<dyn Span>>,
}

impl ExecutionContext {
    /// Create a fresh root context with no deadline, values or span
    pub fn background() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                trace_id: uuid::Uuid::new_v4().simple().to_string(),
                deadline: None,
                cancel: Arc::new(cancel),
                values: HashMap::new(),
                span: None,
            }),
        }
    }

    fn derive(&self, update: impl FnOnce(&mut ContextInner)) -> Self {
        let mut inner = ContextInner {
            trace_id: self.inner.trace_id.clone(),
            deadline: self.inner.deadline,
            cancel: self.inner.cancel.clone(),
            values: self.inner.values.clone(),
            span: self.inner.span.clone(),
        };
        update(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Identifier shared by every context derived from the same root
    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    /// Derive a context with the given trace identifier
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        let trace_id = trace_id.into();
        self.derive(|inner| inner.trace_id = trace_id)
    }

    /// Derive a context that expires at `deadline`
    ///
    /// An earlier deadline already present on the parent is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(|inner| {
            inner.deadline = Some(match inner.deadline {
                Some(existing) if existing < deadline => existing,
                _ => deadline,
            });
        })
    }

    /// Derive a context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context carrying an extra key/value pair
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.derive(|inner| {
            inner.values.insert(key, value);
        })
    }

    /// Derive a context whose current span is `span`
    pub fn with_span(&self, span: Arc<dyn Span>) -> Self {
        self.derive(|inner| inner.span = Some(span))
    }

    /// Look up a value from the bag
    pub fn value(&self, key: &str) -> Option<&str> {
        self.inner.values.get(key).map(String::as_str)
    }

    /// The span active for this context, if any
    pub fn span(&self) -> Option<Arc<dyn Span>> {
        self.inner.span.clone()
    }

    /// Deadline, if one was set
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline (zero once expired)
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel this context and every context derived from the same root
    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
    }

    /// Whether the context was cancelled or its deadline has passed
    pub fn is_done(&self) -> bool {
        *self.inner.cancel.borrow()
            || self
                .inner
                .deadline
                .map(|d| Instant::now() >= d)
                .unwrap_or(false)
    }

    /// Resolve once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        let mut rx = self.inner.cancel.subscribe();
        let cancelled = async move {
            // The sender lives as long as `self`, so this only returns on cancel.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = cancelled => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
            None => cancelled.await,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trace_id", &self.inner.trace_id)
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &*self.inner.cancel.borrow())
            .field("values", &self.inner.values)
            .field("span", &self.inner.span.as_ref().map(|s| s.operation().to_string()))
            .finish()
    }
}
