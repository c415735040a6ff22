//! RPC client
//!
//! Ties node selection, default call options and the standard call
//! pipeline together around a transport.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::SkeinConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::logger::Logger;
use crate::trace::Tracer;

use super::{Call, CallOptions, CallPipeline, CallRef, Request, Response, Selector};

/// Client sending calls through a [`CallPipeline`]
#[derive(Clone)]
pub struct RpcClient {
    pipeline: CallPipeline,
    selector: Arc<dyn Selector>,
    defaults: CallOptions,
}

impl RpcClient {
    /// Build a client with the standard pipeline around `transport`
    pub fn new(
        transport: CallRef,
        selector: Arc<dyn Selector>,
        logger: Arc<dyn Logger>,
        tracer: Arc<dyn Tracer>,
        config: &SkeinConfig,
    ) -> Self {
        let pipeline = CallPipeline::standard(transport, logger, tracer, config.fault.clone());
        Self::with_pipeline(pipeline, selector, config.client.call_options())
    }

    /// Build a client around an already composed pipeline
    pub fn with_pipeline(pipeline: CallPipeline, selector: Arc<dyn Selector>, defaults: CallOptions) -> Self {
        Self {
            pipeline,
            selector,
            defaults,
        }
    }

    /// Options used by [`call`](Self::call)
    pub fn defaults(&self) -> &CallOptions {
        &self.defaults
    }

    pub fn pipeline(&self) -> &CallPipeline {
        &self.pipeline
    }

    /// Send `request` with the default options
    pub async fn call(&self, ctx: &ExecutionContext, request: &Request, response: &mut Response) -> Result<()> {
        self.call_with_options(ctx, request, response, &self.defaults).await
    }

    /// Send `request` to a node selected for its service
    pub async fn call_with_options(
        &self,
        ctx: &ExecutionContext,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        let node = self.selector.select(&request.service)?;
        debug!(
            call = %request.name(),
            node = %node.id,
            address = %node.address,
            trace_id = %ctx.trace_id(),
            "Sending call"
        );
        self.pipeline.call(ctx, &node, request, response, options).await
    }

    /// Send a typed request body and decode the typed reply
    pub async fn invoke<Req, Resp>(
        &self,
        ctx: &ExecutionContext,
        service: &str,
        endpoint: &str,
        body: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let request = Request::from_body(service, endpoint, body)?;
        let mut response = Response::new();
        self.call(ctx, &request, &mut response).await?;
        response.decode()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("pipeline", &self.pipeline)
            .field("defaults", &self.defaults)
            .finish()
    }
}
