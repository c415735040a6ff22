//! Fire-and-forget task dispatcher
//!
//! [`Dispatcher::dispatch`] hands a dynamically checked callable to the
//! runtime and returns immediately. The task validates the call shape,
//! contains any panic, and reports failures only through the [`Logger`].

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::trace;

use crate::config::FaultSettings;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::fault::{self, Fault};
use crate::logger::{Logger, Severity};

use super::state::TaskGuard;
use super::value::render_args;
use super::{DispatchOutcome, DispatchSnapshot, DispatchStats, Reply, Value};

/// Launches callables as independently scheduled tasks
#[derive(Clone)]
pub struct Dispatcher {
    handle: Handle,
    logger: Arc<dyn Logger>,
    fault: FaultSettings,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Create a dispatcher on the current tokio runtime
    pub fn new(logger: Arc<dyn Logger>, fault: FaultSettings) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(handle, logger, fault))
    }

    /// Create a dispatcher that schedules onto `handle`
    pub fn with_handle(handle: Handle, logger: Arc<dyn Logger>, fault: FaultSettings) -> Self {
        Self {
            handle,
            logger,
            fault,
            stats: Arc::new(DispatchStats::new()),
        }
    }

    /// Counters for every task dispatched through this dispatcher and its clones
    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    /// Wait until no dispatched task is in flight
    pub async fn wait_idle(&self) {
        self.stats.wait_idle().await
    }

    /// Run `callable` with `args` on the blocking pool
    ///
    /// Returns before the task starts. If `args[0]` is a context it is the
    /// task's context, otherwise a background context is used. Rejections,
    /// returned errors and panics are logged against that context.
    pub fn dispatch(&self, callable: impl Into<Value>, args: Vec<Value>) {
        let callable = callable.into();
        let logger = self.logger.clone();
        let stats = self.stats.clone();
        let stack_limit = self.fault.max_stack_bytes;

        trace!(callable = %callable, args = args.len(), "Dispatching task");
        let mut guard = TaskGuard::begin(stats);

        self.handle.spawn_blocking(move || {
            let ctx = context_of(&args);
            match fault::contain(|| execute(&ctx, logger.as_ref(), &callable, args)) {
                Ok(outcome) => guard.set(outcome),
                Err(fault) => report_fault(&ctx, logger.as_ref(), &fault, stack_limit),
            }
        });
    }

    /// Run an async task with a typed signature
    ///
    /// The shape is checked at compile time, so there is no arity check.
    /// Panics and an error as the last reply value are handled as in
    /// [`dispatch`](Self::dispatch).
    pub fn spawn<F, Fut>(&self, ctx: ExecutionContext, f: F)
    where
        F: FnOnce(ExecutionContext) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Reply,
    {
        let logger = self.logger.clone();
        let stats = self.stats.clone();
        let stack_limit = self.fault.max_stack_bytes;
        let name = std::any::type_name::<F>();

        trace!(task = name, trace_id = %ctx.trace_id(), "Spawning task");
        let mut guard = TaskGuard::begin(stats);

        self.handle.spawn(async move {
            let task_ctx = ctx.clone();
            match fault::contain_async(async move { f(task_ctx).await }).await {
                Ok(reply) => guard.set(inspect(&ctx, logger.as_ref(), name, reply.into_reply())),
                Err(fault) => report_fault(&ctx, logger.as_ref(), &fault, stack_limit),
            }
        });
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fault", &self.fault)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Task Body
// ─────────────────────────────────────────────────────────────────

fn context_of(args: &[Value]) -> ExecutionContext {
    match args.first() {
        Some(Value::Context(ctx)) => ctx.clone(),
        _ => ExecutionContext::background(),
    }
}

fn execute(ctx: &ExecutionContext, logger: &dyn Logger, callable: &Value, args: Vec<Value>) -> DispatchOutcome {
    let function = match callable {
        Value::Func(function) => function,
        other => {
            let err = Error::NotCallable { kind: other.kind() };
            logger.log(ctx, Severity::Error, &format!("dispatch: {}, args: {}", err, render_args(&args)));
            return DispatchOutcome::Rejected;
        }
    };

    if function.arity() != args.len() {
        let err = Error::ArityMismatch {
            function: function.name().to_string(),
            expected: function.arity(),
            actual: args.len(),
        };
        logger.log(ctx, Severity::Error, &format!("dispatch: {}, args: {}", err, render_args(&args)));
        return DispatchOutcome::Rejected;
    }

    match function.call(args) {
        Ok(results) => inspect(ctx, logger, function.name(), results),
        Err(err) if err.is_rejection() => {
            logger.log(ctx, Severity::Error, &format!("dispatch: {}", err));
            DispatchOutcome::Rejected
        }
        Err(err) => {
            logger.log(ctx, Severity::Error, &format!("dispatch: {}: {}", function.name(), err));
            DispatchOutcome::Failed
        }
    }
}

/// Only the last reply value is examined
fn inspect(ctx: &ExecutionContext, logger: &dyn Logger, name: &str, results: Vec<Value>) -> DispatchOutcome {
    match results.last() {
        Some(Value::Error(message)) => {
            logger.log(ctx, Severity::Error, &format!("dispatch: {} returned error: {}", name, message));
            DispatchOutcome::Failed
        }
        _ => DispatchOutcome::Completed,
    }
}

fn report_fault(ctx: &ExecutionContext, logger: &dyn Logger, fault: &Fault, stack_limit: usize) {
    logger.log(
        ctx,
        Severity::Error,
        &format!("dispatch: task panicked: {}, stack: {}", fault, fault.stack(stack_limit)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;

    fn dispatcher() -> (Dispatcher, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let dispatcher = Dispatcher::new(logger.clone(), FaultSettings::default()).unwrap();
        (dispatcher, logger)
    }

    #[test]
    fn test_new_outside_runtime() {
        let err = Dispatcher::new(Arc::new(MemoryLogger::new()), FaultSettings::default()).unwrap_err();
        assert!(matches!(err, Error::NoRuntime(_)));
    }

    #[tokio::test]
    async fn test_non_callable_is_rejected() {
        let (dispatcher, logger) = dispatcher();
        dispatcher.dispatch(42, vec![Value::from("a")]);
        dispatcher.wait_idle().await;

        let errors = logger.at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("param function is not function"));
        assert!(errors[0].message.contains("[\"a\"]"));
        assert_eq!(dispatcher.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_context_argument_is_reused() {
        let (dispatcher, logger) = dispatcher();
        let ctx = ExecutionContext::background().with_trace_id("trace-7");

        dispatcher.dispatch(
            Value::func(|_ctx: ExecutionContext| -> std::result::Result<(), String> { Err("nope".into()) }),
            vec![Value::from(&ctx)],
        );
        dispatcher.wait_idle().await;

        let errors = logger.at(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].trace_id, "trace-7");
        assert!(errors[0].message.contains("returned error: nope"));
        assert_eq!(dispatcher.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_spawn_reports_panic() {
        let (dispatcher, logger) = dispatcher();
        dispatcher.spawn(ExecutionContext::background(), |_ctx| async move {
            if true {
                panic!("typed boom");
            }
        });
        dispatcher.wait_idle().await;

        assert!(logger.contains("dispatch: task panicked: typed boom"));
        assert_eq!(dispatcher.stats().faulted, 1);
    }

    struct BrokenLogger;

    impl Logger for BrokenLogger {
        fn log(&self, _ctx: &ExecutionContext, _severity: Severity, message: &str) {
            panic!("log sink closed while writing: {}", message);
        }
    }

    #[tokio::test]
    async fn test_panicking_logger_still_ends_the_task() {
        let dispatcher = Dispatcher::new(Arc::new(BrokenLogger), FaultSettings::default()).unwrap();

        dispatcher.dispatch("not callable", vec![]);
        dispatcher.spawn(ExecutionContext::background(), |_ctx| async move {
            Err::<(), _>("refused")
        });

        tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher.wait_idle())
            .await
            .expect("accounting survives a panicking logger");
        let stats = dispatcher.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.faulted, 2);
    }
}
