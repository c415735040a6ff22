//! Call pipeline tests
//!
//! Tests interceptor ordering, span lifecycle, call records and error
//! propagation through the standard pipeline and the RPC client.

mod common;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use common::{node, Harness, ScriptedTransport};
use skein::config::{FaultSettings, NodeEntry, SkeinConfig};
use skein::rpc::{
    Call, CallOptions, CallPipeline, CallRef, Node, RecoverWrapper, Request, Response, RpcClient,
    StaticSelector,
};
use skein::trace::{SpanKind, SpanTag};
use skein::{Error, ExecutionContext, Result, Severity};

async fn send(pipeline: &CallPipeline, request: &Request) -> (Result<()>, Response) {
    let mut response = Response::new();
    let result = pipeline
        .call(
            &ExecutionContext::background(),
            &node(),
            request,
            &mut response,
            &CallOptions::default(),
        )
        .await;
    (result, response)
}

// ─────────────────────────────────────────────────────────────────
// Successful Calls
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_success_annotates_span_and_logs_record() {
    let harness = Harness::new();
    let transport = ScriptedTransport::replying(json!({"name": "ada"}));
    let pipeline = harness.pipeline(transport.clone());
    assert_eq!(pipeline.layers(), 3);

    let request = Request::new("UserService", "GetUser", json!({"id": 7}));
    let (result, response) = send(&pipeline, &request).await;

    assert!(result.is_ok());
    assert_eq!(response.body, json!({"name": "ada"}));

    // The transport ran inside the call's span
    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].span_operation.as_deref(), Some("UserService.GetUser"));

    let spans = harness.tracer.spans();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.finish_calls(), 1);
    assert_eq!(span.tag("span.kind"), Some(SpanTag::Kind(SpanKind::Client)));
    assert_eq!(span.tag("peer.address"), Some(SpanTag::PeerAddress("10.0.0.7:9000".into())));
    assert_eq!(span.tag("peer.hostname"), Some(SpanTag::PeerHostname("users-1".into())));
    assert_eq!(span.log_value("request").as_deref(), Some(r#"{"id":7}"#));
    assert_eq!(span.log_value("response").as_deref(), Some(r#"{"name":"ada"}"#));
    assert!(span.tag("error").is_none());

    let records = harness.logger.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name(), "UserService.GetUser");
    assert_eq!(record.node_id, "users-1");
    assert_eq!(record.params(), r#"{"id":7}"#);
    assert!(record.error.is_empty());

    let info = harness.logger.at(Severity::Info);
    assert_eq!(info.len(), 1);
    assert!(info[0].message.starts_with(r#"UserService.GetUser, {"id":7}, {"name":"ada"}, , "#));
    assert_eq!(harness.logger.count(Severity::Error), 0);
}

#[tokio::test]
async fn test_collection_calls_are_redacted() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedTransport::replying(json!([])));

    let request = Request::new("Foo", "ListCollections", json!({"secret": "s3"}));
    let (result, _) = send(&pipeline, &request).await;
    assert!(result.is_ok());

    let records = harness.logger.records();
    assert_eq!(records[0].params(), "*");
    let line = &harness.logger.at(Severity::Info)[0].message;
    assert!(line.starts_with("Foo.ListCollections, *, "));
    assert!(!line.contains("s3"));

    // The span still sees the real request
    let span = &harness.tracer.spans()[0];
    assert_eq!(span.log_value("request").as_deref(), Some(r#"{"secret":"s3"}"#));
}

#[tokio::test]
async fn test_elapsed_covers_the_transport() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedTransport::delayed(Duration::from_millis(30), json!(1)));

    let (result, _) = send(&pipeline, &Request::new("svc", "Slow", json!(null))).await;
    assert!(result.is_ok());

    let record = &harness.logger.records()[0];
    assert!(record.elapsed >= Duration::from_millis(30));
    assert!(record.elapsed_ms() >= 30.0);
}

// ─────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_error_is_returned_unchanged() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedTransport::failing("connection reset"));

    let (result, _) = send(&pipeline, &Request::new("svc", "Ep", json!({}))).await;

    match result {
        Err(Error::Transport { target, message }) => {
            assert_eq!(target, "svc.Ep");
            assert_eq!(message, "connection reset");
        }
        other => panic!("expected transport error, got {:?}", other),
    }

    let span = &harness.tracer.spans()[0];
    assert_eq!(span.tag("error"), Some(SpanTag::Error(true)));
    assert_eq!(span.tag("sampling.priority"), Some(SpanTag::SamplingPriority(1)));
    assert!(span.log_value("error_msg").unwrap().contains("connection reset"));
    assert!(span.log_value("response").is_some());
    assert_eq!(span.finish_calls(), 1);

    let record = &harness.logger.records()[0];
    assert!(record.is_error());
    assert!(record.error.contains("connection reset"));
}

#[tokio::test]
async fn test_panic_in_transport_is_contained() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedTransport::panicking("wire melted"));

    let (result, _) = send(&pipeline, &Request::new("svc", "Ep", json!({}))).await;

    match result {
        Err(Error::CallPanicked { target, message }) => {
            assert_eq!(target, "svc.Ep");
            assert_eq!(message, "wire melted");
        }
        other => panic!("expected contained panic, got {:?}", other),
    }

    let errors = harness.logger.at(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("rpc client exception, wire melted, "));

    // The span is finished even though the chain unwound
    assert_eq!(harness.tracer.started(), 1);
    assert_eq!(harness.tracer.spans()[0].finish_calls(), 1);
    assert!(harness.logger.records().is_empty());
}

#[tokio::test]
async fn test_span_refusal_falls_back_to_untraced_call() {
    let harness = Harness::with_refusing_tracer();
    let transport = ScriptedTransport::replying(json!("ok"));
    let pipeline = harness.pipeline(transport.clone());

    let (result, response) = send(&pipeline, &Request::new("svc", "Ep", json!({}))).await;

    assert!(result.is_ok());
    assert_eq!(response.body, json!("ok"));
    assert!(transport.seen()[0].span_operation.is_none());
    assert_eq!(harness.logger.count(Severity::Warn), 1);
    assert_eq!(harness.logger.records().len(), 1);
}

// ─────────────────────────────────────────────────────────────────
// Composition
// ─────────────────────────────────────────────────────────────────

struct Exploding;

#[async_trait]
impl Call for Exploding {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        _node: &Node,
        _request: &Request,
        _response: &mut Response,
        _options: &CallOptions,
    ) -> Result<()> {
        panic!("interceptor bug");
    }
}

#[tokio::test]
async fn test_recover_contains_panics_from_inner_wrappers() {
    let harness = Harness::new();
    let transport = ScriptedTransport::replying(json!(1));

    let pipeline = CallPipeline::builder()
        .wrap(RecoverWrapper::new(harness.logger.clone(), FaultSettings::default()))
        .wrap(|_next: CallRef| -> CallRef { Arc::new(Exploding) })
        .build(transport.clone());

    let (result, _) = send(&pipeline, &Request::new("svc", "Ep", json!({}))).await;

    assert!(matches!(result, Err(Error::CallPanicked { .. })));
    assert!(transport.seen().is_empty());
    assert!(harness.logger.contains("interceptor bug"));
}

/// Call whose `call` panics before it returns a future
struct PanicsBeforeFuture;

impl Call for PanicsBeforeFuture {
    fn call<'life0, 'life1, 'life2, 'life3, 'life4, 'life5, 'async_trait>(
        &'life0 self,
        _ctx: &'life1 ExecutionContext,
        _node: &'life2 Node,
        _request: &'life3 Request,
        _response: &'life4 mut Response,
        _options: &'life5 CallOptions,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        'life2: 'async_trait,
        'life3: 'async_trait,
        'life4: 'async_trait,
        'life5: 'async_trait,
        Self: 'async_trait,
    {
        panic!("eager transport bug");
    }
}

#[tokio::test]
async fn test_recover_contains_panics_raised_while_building_the_call() {
    let harness = Harness::new();
    let pipeline = CallPipeline::builder()
        .wrap(RecoverWrapper::new(harness.logger.clone(), FaultSettings::default()))
        .build(Arc::new(PanicsBeforeFuture));

    let (result, _) = send(&pipeline, &Request::new("svc", "Eager", json!({}))).await;

    match result {
        Err(Error::CallPanicked { target, message }) => {
            assert_eq!(target, "svc.Eager");
            assert_eq!(message, "eager transport bug");
        }
        other => panic!("expected contained panic, got {:?}", other),
    }
    let errors = harness.logger.at(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("rpc client exception, eager transport bug, "));
}

#[tokio::test]
async fn test_pipeline_is_reused_across_concurrent_calls() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(ScriptedTransport::delayed(Duration::from_millis(5), json!({})));

    let requests: Vec<Request> = (0..20)
        .map(|i| Request::new("svc", format!("Op{}", i), json!({ "i": i })))
        .collect();
    let results = join_all(requests.iter().map(|r| send(&pipeline, r))).await;

    assert!(results.iter().all(|(r, _)| r.is_ok()));
    assert_eq!(harness.logger.records().len(), 20);
    assert_eq!(harness.tracer.started(), 20);
    assert!(harness.tracer.spans().iter().all(|s| s.finish_calls() == 1));
}

// ─────────────────────────────────────────────────────────────────
// RPC Client
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GetUser {
    id: u32,
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    name: String,
}

fn client_config() -> SkeinConfig {
    let mut config = SkeinConfig::default();
    config.client.default_timeout_ms = 1500;
    config.registry.nodes = vec![
        NodeEntry {
            service: "UserService".into(),
            id: "users-a".into(),
            address: "10.0.0.1:9000".into(),
        },
        NodeEntry {
            service: "UserService".into(),
            id: "users-b".into(),
            address: "10.0.0.2:9000".into(),
        },
    ];
    config
}

#[tokio::test]
async fn test_client_invoke_round_robin() {
    let harness = Harness::new();
    let config = client_config();
    let transport = ScriptedTransport::replying(json!({"name": "ada"}));
    let client = RpcClient::new(
        transport.clone(),
        Arc::new(StaticSelector::from_settings(&config.registry)),
        harness.logger.clone(),
        harness.tracer.clone(),
        &config,
    );
    let ctx = ExecutionContext::background();

    for _ in 0..3 {
        let user: User = client
            .invoke(&ctx, "UserService", "GetUser", &GetUser { id: 7 })
            .await
            .unwrap();
        assert_eq!(user, User { name: "ada".into() });
    }

    let seen = transport.seen();
    let nodes: Vec<&str> = seen.iter().map(|s| s.node_id.as_str()).collect();
    assert_eq!(nodes, vec!["users-a", "users-b", "users-a"]);
    assert!(seen.iter().all(|s| s.timeout == Duration::from_millis(1500)));
    assert!(seen.iter().all(|s| s.trace_id == ctx.trace_id()));
    assert_eq!(client.defaults().retries, 0);
}

#[tokio::test]
async fn test_client_unknown_service() {
    let harness = Harness::new();
    let config = client_config();
    let transport = ScriptedTransport::replying(json!({}));
    let client = RpcClient::new(
        transport.clone(),
        Arc::new(StaticSelector::from_settings(&config.registry)),
        harness.logger.clone(),
        harness.tracer.clone(),
        &config,
    );

    let mut response = Response::new();
    let err = client
        .call(
            &ExecutionContext::background(),
            &Request::new("OrderService", "Get", json!({})),
            &mut response,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoNode { service } if service == "OrderService"));
    assert!(transport.seen().is_empty());
    assert!(harness.logger.entries().is_empty());
}
