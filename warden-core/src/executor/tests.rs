//! Executor pipeline, async and batch tests

use super::*;
use crate::confirmation::{AlwaysApprove, AlwaysDeny, FnConfirmation};
use crate::error::ErrorDetail;
use crate::interceptors::{GuardInterceptor, TimingInterceptor, EXECUTION_TIME_MS_KEY};
use crate::security::{CompositePolicy, DenylistPolicy, NoopPolicy};
use crate::tools::FnTool;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn registry_of(tools: Vec<BoxedTool>) -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new());
    registry.register_all(tools).unwrap();
    registry
}

fn echo() -> BoxedTool {
    FnTool::new("echo", "Echo the message param", |_ctx, input| async move {
        Ok(Output::text(input.get_string("message")))
    })
    .boxed()
}

fn sleeper(name: &str, delay: Duration) -> BoxedTool {
    FnTool::new(name, "Sleeps, ignoring cancellation", move |_ctx, _input| async move {
        tokio::time::sleep(delay).await;
        Ok(Output::text("slept"))
    })
    .boxed()
}

fn counted(name: &str, calls: Arc<AtomicUsize>, fail: bool) -> BoxedTool {
    let tool_name = name.to_string();
    FnTool::new(name, "Counts invocations", move |_ctx, _input| {
        let calls = calls.clone();
        let tool_name = tool_name.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if fail {
                Err(ToolError::execution_message(tool_name, "planned failure"))
            } else {
                Ok(Output::text("counted"))
            }
        }
    })
    .boxed()
}

fn explode() -> Result<Output> {
    panic!("boom")
}

fn message(text: &str) -> Input {
    Input::new().with_param("message", text)
}

struct RecordingPolicy {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SecurityPolicy for RecordingPolicy {
    fn name(&self) -> &str {
        "recording"
    }

    async fn validate(
        &self,
        _ctx: &ExecutionContext,
        _tool_name: &str,
        _args: &Map<String, serde_json::Value>,
    ) -> Result<()> {
        self.log.lock().unwrap().push("security".to_string());
        Ok(())
    }
}

struct FailingPolicy;

#[async_trait]
impl SecurityPolicy for FailingPolicy {
    fn name(&self) -> &str {
        "failing"
    }

    async fn validate(
        &self,
        _ctx: &ExecutionContext,
        tool_name: &str,
        _args: &Map<String, serde_json::Value>,
    ) -> Result<()> {
        Err(ToolError::validation(tool_name, "policy backend unavailable"))
    }
}

/// Takes a minute to decide, ignoring the context
struct SlowPolicy;

#[async_trait]
impl SecurityPolicy for SlowPolicy {
    fn name(&self) -> &str {
        "slow"
    }

    async fn validate(
        &self,
        _ctx: &ExecutionContext,
        _tool_name: &str,
        _args: &Map<String, serde_json::Value>,
    ) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

/// Gives up with its own error once the context is done
struct InterruptiblePolicy;

#[async_trait]
impl SecurityPolicy for InterruptiblePolicy {
    fn name(&self) -> &str {
        "interruptible"
    }

    async fn validate(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        _args: &Map<String, serde_json::Value>,
    ) -> Result<()> {
        ctx.done().await;
        Err(ToolError::validation(tool_name, "lookup interrupted"))
    }
}

struct SlowConfirmation;

#[async_trait]
impl ConfirmationHandler for SlowConfirmation {
    async fn request(
        &self,
        _ctx: &ExecutionContext,
        _tool: &dyn crate::tools::Tool,
        _args: &Map<String, serde_json::Value>,
    ) -> Result<bool> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(true)
    }
}

#[tokio::test]
async fn test_execute_echo() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let output = executor
        .execute(&ExecutionContext::new(), "echo", message("hi"))
        .await
        .unwrap();

    assert!(output.success);
    assert_eq!(output.data, b"hi");
}

#[tokio::test]
async fn test_unknown_tool_is_not_found() {
    let executor = Executor::new(registry_of(vec![]));
    let err = executor
        .execute(&ExecutionContext::new(), "ghost", Input::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.tool_name(), "ghost");
    assert!(err.operation().is_none());
}

#[tokio::test]
async fn test_stage_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let tool_log = log.clone();
    let tool = FnTool::new("ordered", "Records its call", move |_ctx, _input| {
        let log = tool_log.clone();
        async move {
            log.lock().unwrap().push("tool".to_string());
            Ok(Output::text("ok"))
        }
    })
    .with_confirmation()
    .boxed();

    let confirm_log = log.clone();
    let guard_log = log.clone();
    let executor = Executor::builder()
        .registry(registry_of(vec![tool]))
        .security_policy(RecordingPolicy { log: log.clone() })
        .confirmation_handler(FnConfirmation::new(move |_name, _args| {
            confirm_log.lock().unwrap().push("confirm".to_string());
            Ok(true)
        }))
        .interceptors(InterceptorChain::new().with(GuardInterceptor::new(
            "recorder",
            move |_ctx, _name, _input| {
                guard_log.lock().unwrap().push("interceptor".to_string());
                Ok(())
            },
        )))
        .build();

    executor
        .execute(&ExecutionContext::new(), "ordered", Input::new())
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["security", "confirm", "interceptor", "tool"]
    );
}

#[tokio::test]
async fn test_tool_error_wrapped_as_execution() {
    let tool = FnTool::new("picky", "Rejects everything", |_ctx, _input| async move {
        Err(ToolError::validation("picky", "bad argument"))
    })
    .boxed();
    let executor = Executor::new(registry_of(vec![tool]));

    let err = executor
        .execute(&ExecutionContext::new(), "picky", Input::new().with_param("x", 1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.is_execution());
    assert!(err.is_validation());
    match err.detail() {
        ErrorDetail::Execution { input: Some(input) } => assert_eq!(input.get_i64("x"), 1),
        other => panic!("unexpected detail: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout() {
    let executor = Executor::builder()
        .registry(registry_of(vec![sleeper("slow", Duration::from_secs(5))]))
        .timeout(Duration::from_millis(100))
        .build();

    let start = tokio::time::Instant::now();
    let err = executor
        .execute(&ExecutionContext::new(), "slow", Input::new())
        .await
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(err.is_timeout());
    assert!(matches!(
        err.detail(),
        ErrorDetail::Timeout { deadline } if *deadline == Duration::from_millis(100)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_caller_deadline_wins_over_default() {
    let executor = Executor::builder()
        .registry(registry_of(vec![sleeper("slow", Duration::from_secs(1))]))
        .timeout(Duration::from_secs(10))
        .build();

    let ctx = ExecutionContext::new().with_timeout(Duration::from_millis(50));
    let start = tokio::time::Instant::now();
    let err = executor.execute(&ctx, "slow", Input::new()).await.unwrap_err();

    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_skipped_when_caller_has_deadline() {
    let executor = Executor::builder()
        .registry(registry_of(vec![sleeper("slow", Duration::from_millis(200))]))
        .timeout(Duration::from_millis(50))
        .build();

    let ctx = ExecutionContext::new().with_timeout(Duration::from_secs(10));
    let output = executor.execute(&ctx, "slow", Input::new()).await.unwrap();
    assert_eq!(output.data_str(), "slept");
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_means_none() {
    let executor = Executor::builder()
        .registry(registry_of(vec![sleeper("slow", Duration::from_secs(120))]))
        .timeout(Duration::ZERO)
        .build();

    assert!(
        executor
            .execute(&ExecutionContext::new(), "slow", Input::new())
            .await
            .is_ok()
    );
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_timeout_means_none() {
    let executor = Executor::builder()
        .registry(registry_of(vec![sleeper("slow", Duration::from_secs(120))]))
        .timeout(Duration::MAX)
        .build();

    let output = executor
        .execute(&ExecutionContext::new(), "slow", Input::new())
        .await
        .unwrap();
    assert_eq!(output.data_str(), "slept");
}

#[tokio::test]
async fn test_cancelled_before_start_skips_tool() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::new(registry_of(vec![counted("work", calls.clone(), false)]));

    let ctx = ExecutionContext::new();
    ctx.cancel();
    let err = executor.execute(&ctx, "work", Input::new()).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_during_run() {
    let tool = FnTool::new("waiter", "Waits for cancellation", |ctx, _input| async move {
        tokio::select! {
            _ = ctx.done() => Err(ToolError::execution_message("waiter", "interrupted")),
            _ = tokio::time::sleep(Duration::from_secs(5)) => Ok(Output::text("finished")),
        }
    })
    .boxed();
    let executor = Executor::new(registry_of(vec![tool]));

    let ctx = ExecutionContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = executor.execute(&ctx, "waiter", Input::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextCancelled);
}

#[tokio::test]
async fn test_panic_is_recovered() {
    let tool = FnTool::new("fragile", "Panics", |_ctx, _input| async move {
        tokio::task::yield_now().await;
        explode()
    })
    .boxed();
    let executor = Executor::new(registry_of(vec![tool]));

    let err = executor
        .execute(&ExecutionContext::new(), "fragile", Input::new())
        .await
        .unwrap_err();

    assert!(err.is_panic_recovered());
    match err.detail() {
        ErrorDetail::PanicRecovered { value, stack } => {
            assert!(value.contains("boom"));
            assert!(stack.is_some());
        }
        other => panic!("unexpected detail: {:?}", other),
    }
}

#[tokio::test]
async fn test_async_dispatch_catches_panics_without_recovery_frame() {
    let tool = FnTool::new("fragile", "Panics", |_ctx, _input| async move { explode() }).boxed();
    let executor = Executor::builder()
        .registry(registry_of(vec![tool]))
        .recover_panics(false)
        .build();

    let mut rx = executor.execute_async(&ExecutionContext::new(), "fragile", Input::new());
    let result = rx.recv().await.unwrap();
    assert!(result.error().is_some_and(ToolError::is_panic_recovered));
}

#[tokio::test]
async fn test_security_violation_blocks_tool() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![counted("bash", calls.clone(), false)]))
        .security_policy(DenylistPolicy::new())
        .build();

    let err = executor
        .execute(
            &ExecutionContext::new(),
            "bash",
            Input::new().with_param("command", "sudo rm -rf / --no-preserve-root"),
        )
        .await
        .unwrap_err();

    assert!(err.is_security_violation());
    assert_eq!(err.operation(), Some("security validation failed"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_policy_failure_wrapped_as_violation() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .security_policy(FailingPolicy)
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "echo", message("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SecurityViolation);
    assert!(err.is_validation());
}

#[tokio::test(start_paused = true)]
async fn test_security_wait_bounded_by_deadline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![counted("work", calls.clone(), false)]))
        .timeout(Duration::from_millis(20))
        .security_policy(SlowPolicy)
        .build();

    let start = tokio::time::Instant::now();
    let err = executor
        .execute(&ExecutionContext::new(), "work", Input::new())
        .await
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(err.is_timeout());
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!err.is_security_violation());
    assert!(matches!(
        err.detail(),
        ErrorDetail::Timeout { deadline } if *deadline == Duration::from_millis(20)
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_composite_security_wait_bounded_by_deadline() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .timeout(Duration::from_millis(20))
        .security_policy(CompositePolicy::new().with(SlowPolicy).with(NoopPolicy))
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "echo", message("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!err.is_security_violation());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_security() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![counted("work", calls.clone(), false)]))
        .security_policy(SlowPolicy)
        .build();

    let ctx = ExecutionContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = executor.execute(&ctx, "work", Input::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextCancelled);
    assert!(err.is_cancelled());
    assert!(!err.is_security_violation());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_policy_error_after_deadline_reported_as_timeout() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .timeout(Duration::from_millis(20))
        .security_policy(InterruptiblePolicy)
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "echo", message("hi"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!err.is_security_violation());
}

#[tokio::test]
async fn test_confirmation_denied() {
    let calls = Arc::new(AtomicUsize::new(0));
    let tool = FnTool::new("deploy", "Deploys", {
        let calls = calls.clone();
        move |_ctx, _input| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Output::text("deployed"))
            }
        }
    })
    .with_confirmation()
    .boxed();
    let registry = registry_of(vec![tool]);

    let denying = Executor::builder()
        .registry(registry.clone())
        .confirmation_handler(AlwaysDeny)
        .build();
    let err = denying
        .execute(&ExecutionContext::new(), "deploy", Input::new())
        .await
        .unwrap_err();
    assert!(err.is_user_denied());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let approving = Executor::builder()
        .registry(registry.clone())
        .confirmation_handler(AlwaysApprove)
        .build();
    approving
        .execute(&ExecutionContext::new(), "deploy", Input::new())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // No handler: the tool's own preference is not consulted.
    let unguarded = Executor::new(registry);
    unguarded
        .execute(&ExecutionContext::new(), "deploy", Input::new())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_confirmation_predicate_uses_args() {
    let tool = FnTool::new("write", "Writes", |_ctx, _input| async move {
        Ok(Output::text("written"))
    })
    .with_confirmation_when(|args| args.get("force").and_then(Value::as_bool) == Some(true))
    .boxed();
    let executor = Executor::builder()
        .registry(registry_of(vec![tool]))
        .confirmation_handler(AlwaysDeny)
        .build();
    let ctx = ExecutionContext::new();

    assert!(executor.execute(&ctx, "write", Input::new()).await.is_ok());
    assert!(
        executor
            .execute(&ctx, "write", Input::new().with_param("force", true))
            .await
            .unwrap_err()
            .is_user_denied()
    );
}

#[tokio::test]
async fn test_confirmation_handler_error_propagates() {
    let tool = FnTool::new("deploy", "Deploys", |_ctx, _input| async move {
        Ok(Output::text("deployed"))
    })
    .with_confirmation()
    .boxed();
    let executor = Executor::builder()
        .registry(registry_of(vec![tool]))
        .confirmation_handler(FnConfirmation::new(|name, _args| {
            Err(ToolError::middleware("prompt", name, "terminal closed"))
        }))
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "deploy", Input::new())
        .await
        .unwrap_err();
    assert!(err.is_middleware_failed());
    assert_eq!(err.operation(), Some("confirmation failed"));
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_wait_bounded_by_deadline() {
    let tool = FnTool::new("deploy", "Deploys", |_ctx, _input| async move {
        Ok(Output::text("deployed"))
    })
    .with_confirmation()
    .boxed();
    let executor = Executor::builder()
        .registry(registry_of(vec![tool]))
        .timeout(Duration::from_millis(50))
        .confirmation_handler(SlowConfirmation)
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "deploy", Input::new())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_interceptor_rejection_keeps_its_kind() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![counted("work", calls.clone(), false)]))
        .interceptors(
            InterceptorChain::new()
                .with(GuardInterceptor::new("quota", |_ctx, _name, _input| {
                    Err("quota exhausted".to_string())
                })),
        )
        .build();

    let err = executor
        .execute(&ExecutionContext::new(), "work", Input::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MiddlewareFailed);
    assert!(!err.is_execution());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_input_rejected_by_default_chain() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .default_interceptors()
        .build();

    let err = executor
        .dispatch(&ExecutionContext::new(), "echo", None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(
        err.detail(),
        ErrorDetail::Validation { field: Some(field) } if field == "input"
    ));

    let output = executor
        .dispatch(&ExecutionContext::new(), "echo", Some(message("hi")))
        .await
        .unwrap();
    assert!(output.metadata.contains_key(EXECUTION_TIME_MS_KEY));
}

#[tokio::test]
async fn test_missing_input_reaches_tool_as_empty_without_chain() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let output = executor
        .dispatch(&ExecutionContext::new(), "echo", None)
        .await
        .unwrap();
    assert!(output.data.is_empty());
}

#[tokio::test]
async fn test_output_truncated_to_configured_ceiling() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .config(ExecutorConfig::default().with_max_output_bytes(4))
        .interceptors(InterceptorChain::new().with(TimingInterceptor))
        .build();
    let ctx = ExecutionContext::new();

    let output = executor.execute(&ctx, "echo", message("truncate me")).await.unwrap();
    assert_eq!(output.data, b"trun");
    assert!(output.truncated);

    let output = executor.execute(&ctx, "echo", message("four")).await.unwrap();
    assert_eq!(output.data, b"four");
    assert!(!output.truncated);
}

#[tokio::test]
async fn test_execute_async_sends_once_then_closes() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let mut rx = executor.execute_async(&ExecutionContext::new(), "echo", message("async"));

    let result = rx.recv().await.unwrap();
    assert_eq!(result.tool_name, "echo");
    assert_eq!(result.output().map(|o| o.data.clone()), Some(b"async".to_vec()));
    assert!(result.end_time >= result.start_time);

    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_execute_async_reports_errors_as_data() {
    let executor = Executor::new(registry_of(vec![]));
    let mut rx = executor.execute_async(&ExecutionContext::new(), "ghost", Input::new());

    let result = rx.recv().await.unwrap();
    assert!(result.output().is_none());
    assert!(result.error().is_some_and(ToolError::is_not_found));
}

#[tokio::test]
async fn test_batch_empty() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let report = executor.execute_many(&ExecutionContext::new(), Vec::new()).await;

    assert!(report.is_empty());
    assert!(report.first_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_batch_preserves_order() {
    let names = ["t0", "t1", "t2", "t3"];
    let tools = names
        .iter()
        .enumerate()
        .map(|(i, name)| sleeper(name, Duration::from_millis(40 - 10 * i as u64)))
        .collect();
    let executor = Executor::builder()
        .registry(registry_of(tools))
        .max_concurrent(0)
        .build();

    let executions = names
        .iter()
        .map(|name| ToolExecution::new(*name, Input::new()))
        .collect();
    let report = executor.execute_many(&ExecutionContext::new(), executions).await;

    assert!(report.is_success());
    let got: Vec<_> = report.results.iter().map(|r| r.tool_name.as_str()).collect();
    assert_eq!(got, names);
}

fn gauge(name: &str, active: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> BoxedTool {
    FnTool::new(name, "Tracks concurrent calls", move |_ctx, _input| {
        let active = active.clone();
        let peak = peak.clone();
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(Output::text("done"))
        }
    })
    .boxed()
}

#[tokio::test(start_paused = true)]
async fn test_batch_respects_concurrency_cap() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![gauge("gauge", active.clone(), peak.clone())]))
        .max_concurrent(2)
        .build();

    let executions = (0..6)
        .map(|_| ToolExecution::new("gauge", Input::new()))
        .collect();
    let report = executor.execute_many(&ExecutionContext::new(), executions).await;

    assert_eq!(report.len(), 6);
    assert!(report.is_success());
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_unbounded_when_zero() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![gauge("gauge", active, peak.clone())]))
        .max_concurrent(0)
        .build();

    let executions = (0..4)
        .map(|_| ToolExecution::new("gauge", Input::new()))
        .collect();
    let report = executor.execute_many(&ExecutionContext::new(), executions).await;

    assert!(report.is_success());
    assert_eq!(peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_batch_sequential_fail_fast() {
    let ok_calls = Arc::new(AtomicUsize::new(0));
    let fail_calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::builder()
        .registry(registry_of(vec![
            counted("ok", ok_calls.clone(), false),
            counted("fail", fail_calls.clone(), true),
        ]))
        .max_concurrent(1)
        .build();

    let executions = vec![
        ToolExecution::new("ok", Input::new()),
        ToolExecution::new("fail", Input::new()),
        ToolExecution::new("ok", Input::new()),
        ToolExecution::new("ok", Input::new()),
    ];
    let report = executor.execute_many(&ExecutionContext::new(), executions).await;

    assert_eq!(report.len(), 4);
    assert!(report.results[0].is_success());
    assert!(report.results[1].error().is_some_and(ToolError::is_execution));
    for skipped in &report.results[2..] {
        assert_eq!(skipped.tool_name, "ok");
        assert!(skipped.error().is_some_and(ToolError::is_cancelled));
    }

    let first = report.first_error.unwrap();
    assert!(first.is_execution());
    assert_eq!(first.tool_name(), "fail");
    assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_under_cancelled_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = Executor::new(registry_of(vec![counted("work", calls.clone(), false)]));

    let ctx = ExecutionContext::new();
    ctx.cancel();
    let executions = (0..3)
        .map(|_| ToolExecution::new("work", Input::new()))
        .collect();
    let report = executor.execute_many(&ctx, executions).await;

    assert_eq!(report.len(), 3);
    assert!(report.results.iter().all(|r| r.error().is_some_and(ToolError::is_cancelled)));
    assert!(report.first_error.is_some_and(|e| e.is_cancelled()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_reports_unknown_tool() {
    let executor = Executor::builder()
        .registry(registry_of(vec![echo()]))
        .max_concurrent(0)
        .build();

    let report = executor
        .execute_many(
            &ExecutionContext::new(),
            vec![
                ToolExecution::new("echo", message("a")),
                ToolExecution::new("ghost", Input::new()),
            ],
        )
        .await;

    assert_eq!(report.len(), 2);
    assert!(report.results[1].error().is_some_and(ToolError::is_not_found));
    assert!(report.into_result().unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_execute_tool_calls_in_order() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let text = format!(
        "{}\n{}",
        ToolCall::new("echo", message("one").params).format(),
        ToolCall::new("missing", Map::new()).format()
    );
    let calls = crate::protocol::parse_tool_calls(&text).unwrap();

    let results = executor.execute_tool_calls(&ExecutionContext::new(), &calls).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].output().map(|o| o.display_text()), Some("one".to_string()));
    assert!(results[1].error().is_some_and(ToolError::is_not_found));
}

#[tokio::test]
async fn test_execute_tool_calls_stops_when_cancelled() {
    let executor = Executor::new(registry_of(vec![echo()]));
    let ctx = ExecutionContext::new();
    ctx.cancel();

    let calls = vec![ToolCall::new("echo", Map::new()); 2];
    let results = executor.execute_tool_calls(&ctx, &calls).await;

    assert!(results.iter().all(|r| r.error().is_some_and(ToolError::is_cancelled)));
}
