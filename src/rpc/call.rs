//! Call operation and interceptor composition

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::FaultSettings;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::logger::Logger;
use crate::trace::Tracer;

use super::{CallOptions, Node, ObserveWrapper, RecoverWrapper, Request, Response, SpanWrapper};

// ─────────────────────────────────────────────────────────────────
// Call Traits
// ─────────────────────────────────────────────────────────────────

/// A single outbound call to a node
///
/// The raw transport and every interceptor layer share this signature.
/// A successful call fills `response`.
#[async_trait]
pub trait Call: Send + Sync {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()>;
}

/// Shared handle to a call layer
pub type CallRef = Arc<dyn Call>;

/// Builds one interceptor layer around the next call
pub trait CallWrapper: Send + Sync {
    fn wrap(&self, next: CallRef) -> CallRef;
}

impl<F> CallWrapper for F
where
    F: Fn(CallRef) -> CallRef + Send + Sync,
{
    fn wrap(&self, next: CallRef) -> CallRef {
        self(next)
    }
}

// ─────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────

/// Ordered list of wrappers; the first one added is the outermost
#[derive(Default)]
pub struct PipelineBuilder {
    wrappers: Vec<Arc<dyn CallWrapper>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a wrapper inside the ones already added
    pub fn wrap(mut self, wrapper: impl CallWrapper + 'static) -> Self {
        self.wrappers.push(Arc::new(wrapper));
        self
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Compose the wrappers around `raw`
    pub fn build(self, raw: CallRef) -> CallPipeline {
        let head = self
            .wrappers
            .iter()
            .rev()
            .fold(raw, |next, wrapper| wrapper.wrap(next));

        CallPipeline {
            head,
            layers: self.wrappers.len(),
        }
    }
}

/// A raw call wrapped in its interceptor chain, built once and reused
#[derive(Clone)]
pub struct CallPipeline {
    head: CallRef,
    layers: usize,
}

impl CallPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Fault containment, then span lifecycle, then call observation
    pub fn standard(
        raw: CallRef,
        logger: Arc<dyn Logger>,
        tracer: Arc<dyn Tracer>,
        fault: FaultSettings,
    ) -> Self {
        PipelineBuilder::new()
            .wrap(RecoverWrapper::new(logger.clone(), fault))
            .wrap(SpanWrapper::new(tracer, logger.clone()))
            .wrap(ObserveWrapper::new(logger))
            .build(raw)
    }

    /// Number of interceptor layers around the raw call
    pub fn layers(&self) -> usize {
        self.layers
    }
}

impl fmt::Debug for CallPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPipeline").field("layers", &self.layers).finish()
    }
}

#[async_trait]
impl Call for CallPipeline {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        self.head.call(ctx, node, request, response, options).await
    }
}
