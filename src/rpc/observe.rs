//! Trace annotation and call logging layer

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::logger::Logger;
use crate::trace::{SpanKind, SpanTag};

use super::{Call, CallOptions, CallRecord, CallRef, CallWrapper, Node, Request, Response};

/// Annotates the context's span and logs one [`CallRecord`] per call
///
/// Without a span in the context only the record is emitted. The error
/// from the layer below is returned unchanged.
pub struct ObserveWrapper {
    logger: Arc<dyn Logger>,
}

impl ObserveWrapper {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl CallWrapper for ObserveWrapper {
    fn wrap(&self, next: CallRef) -> CallRef {
        Arc::new(ObserveCall {
            next,
            logger: self.logger.clone(),
        })
    }
}

struct ObserveCall {
    next: CallRef,
    logger: Arc<dyn Logger>,
}

#[async_trait]
impl Call for ObserveCall {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        let span = ctx.span();
        let request_body = request.body.to_string();

        if let Some(span) = &span {
            span.set_tag(SpanTag::Kind(SpanKind::Client));
            span.set_tag(SpanTag::PeerAddress(node.address.clone()));
            span.set_tag(SpanTag::PeerHostname(node.id.clone()));
            span.log_kv("request", &request_body);
        }

        let started_at = Utc::now();
        let begin = Instant::now();
        let result = self.next.call(ctx, node, request, response, options).await;
        let elapsed = begin.elapsed();

        let response_body = response.body.to_string();
        let error = match &result {
            Ok(()) => String::new(),
            Err(e) => e.to_string(),
        };

        if let Some(span) = &span {
            if result.is_err() {
                span.set_tag(SpanTag::SamplingPriority(1));
                span.set_tag(SpanTag::Error(true));
                span.log_kv("error_msg", &error);
            }
            span.log_kv("response", &response_body);
        }

        let record = CallRecord {
            service: request.service.clone(),
            endpoint: request.endpoint.clone(),
            node_id: node.id.clone(),
            node_address: node.address.clone(),
            request: request_body,
            response: response_body,
            error,
            elapsed,
            started_at,
        };
        self.logger.record_call(ctx, &record);

        result
    }
}
