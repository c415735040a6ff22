//! Common test utilities and fixtures
//!
//! Scripted transports, pipeline and dispatcher builders shared by the
//! integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use skein::config::FaultSettings;
use skein::logger::MemoryLogger;
use skein::rpc::{Call, CallOptions, CallPipeline, Node, Request, Response};
use skein::trace::{MemoryTracer, Span};
use skein::{Dispatcher, Error, ExecutionContext, Result};

// ─────────────────────────────────────────────────────────────────
// Scripted Transport
// ─────────────────────────────────────────────────────────────────

/// What a [`ScriptedTransport`] does when called
#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(serde_json::Value),
    Fail(String),
    Panic(&'static str),
    Delay(Duration, serde_json::Value),
}

/// One call observed by the transport
#[derive(Debug, Clone)]
pub struct Seen {
    pub node_id: String,
    pub name: String,
    pub trace_id: String,
    pub span_operation: Option<String>,
    pub timeout: Duration,
}

/// Raw call that follows a fixed script and records what it was given
pub struct ScriptedTransport {
    behavior: Behavior,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedTransport {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(body: serde_json::Value) -> Arc<Self> {
        Self::new(Behavior::Reply(body))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Behavior::Fail(message.to_string()))
    }

    pub fn panicking(message: &'static str) -> Arc<Self> {
        Self::new(Behavior::Panic(message))
    }

    pub fn delayed(delay: Duration, body: serde_json::Value) -> Arc<Self> {
        Self::new(Behavior::Delay(delay, body))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Call for ScriptedTransport {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        node: &Node,
        request: &Request,
        response: &mut Response,
        options: &CallOptions,
    ) -> Result<()> {
        self.seen.lock().push(Seen {
            node_id: node.id.clone(),
            name: request.name(),
            trace_id: ctx.trace_id().to_string(),
            span_operation: ctx.span().map(|s| s.operation().to_string()),
            timeout: options.request_timeout,
        });

        match &self.behavior {
            Behavior::Reply(body) => {
                response.body = body.clone();
                Ok(())
            }
            Behavior::Fail(message) => Err(Error::transport(request.name(), message.clone())),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Delay(delay, body) => {
                tokio::time::sleep(*delay).await;
                response.body = body.clone();
                Ok(())
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────

/// Collaborators observed by a test
pub struct Harness {
    pub logger: Arc<MemoryLogger>,
    pub tracer: Arc<MemoryTracer>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            logger: Arc::new(MemoryLogger::new()),
            tracer: Arc::new(MemoryTracer::new()),
        }
    }

    pub fn with_refusing_tracer() -> Self {
        Self {
            logger: Arc::new(MemoryLogger::new()),
            tracer: Arc::new(MemoryTracer::refusing()),
        }
    }

    /// Standard pipeline around `transport`
    pub fn pipeline(&self, transport: Arc<ScriptedTransport>) -> CallPipeline {
        CallPipeline::standard(
            transport,
            self.logger.clone(),
            self.tracer.clone(),
            FaultSettings::default(),
        )
    }

    /// Dispatcher on the current runtime
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher_with(FaultSettings::default())
    }

    pub fn dispatcher_with(&self, fault: FaultSettings) -> Dispatcher {
        Dispatcher::new(self.logger.clone(), fault).expect("tests run inside a tokio runtime")
    }
}

pub fn node() -> Node {
    Node::new("users-1", "10.0.0.7:9000")
}
