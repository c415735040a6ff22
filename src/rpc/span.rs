//! Span lifecycle layer

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::logger::{Logger, Severity};
use crate::trace::{start_span_from_context, FinishOnDrop, Tracer};

use super::{Call, CallOptions, CallRef, CallWrapper, Node, Request, Response};

/// Starts one span per call named `<service>.<endpoint>`
///
/// The span rides down the chain in the context and is finished on every
/// exit path. If the tracer refuses, the call proceeds untraced.
pub struct SpanWrapper {
    tracer: Arc<dyn Tracer>,
    logger: Arc<dyn Logger>,
}

impl SpanWrapper {
    pub fn new(tracer: Arc<dyn Tracer>, logger: Arc<dyn Logger>) -> Self {
        Self { tracer, logger }
    }
}

impl CallWrapper for SpanWrapper {
    fn wrap(&self, next: CallRef) -> CallRef {
        Arc::new(SpanCall {
            next,
            tracer: self.tracer.clone(),
            logger: self.logger.clone(),
        })
    }
}

struct SpanCall {
    next: CallRef,
    tracer: Arc<dyn Tracer>,
    logger: Arc<dyn Logger>,
}

#[async_trait]
impl Call for SpanCall {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        let name = request.name();

        match start_span_from_context(self.tracer.as_ref(), ctx, &name) {
            Ok((traced, span)) => {
                let _finish = FinishOnDrop(span);
                self.next.call(&traced, node, request, response, options).await
            }
            Err(e) => {
                self.logger.log(ctx, Severity::Warn, &format!("rpc: call {} is untraced: {}", name, e));
                self.next.call(ctx, node, request, response, options).await
            }
        }
    }
}
