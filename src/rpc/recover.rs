//! Fault containment layer

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::FaultSettings;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::fault;
use crate::logger::{Logger, Severity};

use super::{Call, CallOptions, CallRef, CallWrapper, Node, Request, Response};

/// Converts a panic anywhere below into [`Error::CallPanicked`]
///
/// Must be the outermost layer so that panics raised by the other
/// interceptors are contained too.
pub struct RecoverWrapper {
    logger: Arc<dyn Logger>,
    fault: FaultSettings,
}

impl RecoverWrapper {
    pub fn new(logger: Arc<dyn Logger>, fault: FaultSettings) -> Self {
        Self { logger, fault }
    }
}

impl CallWrapper for RecoverWrapper {
    fn wrap(&self, next: CallRef) -> CallRef {
        Arc::new(RecoverCall {
            next,
            logger: self.logger.clone(),
            stack_limit: self.fault.max_stack_bytes,
        })
    }
}

struct RecoverCall {
    next: CallRef,
    logger: Arc<dyn Logger>,
    stack_limit: usize,
}

#[async_trait]
impl Call for RecoverCall {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        // next.call builds its future inside the frame, so eager panics are caught too
        let next = &self.next;
        let contained = fault::contain_async(async move { next.call(ctx, node, request, response, options).await }).await;

        match contained {
            Ok(result) => result,
            Err(fault) => {
                self.logger.log(
                    ctx,
                    Severity::Error,
                    &format!("rpc client exception, {}, {}", fault, fault.stack(self.stack_limit)),
                );
                Err(Error::CallPanicked {
                    target: request.name(),
                    message: fault.message().to_string(),
                })
            }
        }
    }
}
