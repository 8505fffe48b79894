//! Tool executor: the dispatch pipeline
//!
//! A synchronous [`Executor::execute`] call runs these stages in order, and a
//! failure at any stage skips the rest:
//!
//! 1. Registry lookup (`NotFound` propagates unchanged)
//! 2. Default timeout, only when the caller's context has no deadline
//! 3. Early cancellation check
//! 4. Security policy
//! 5. Confirmation, when a handler is set and the tool asks for it
//! 6. Interceptor chain around the tool call
//! 7. Panic recovery frame
//! 8. Invocation, raced against the deadline
//!
//! [`Executor::execute_async`] runs the same pipeline on a spawned task and
//! [`Executor::execute_many`] runs a batch under one coordination scope.

mod batch;
mod result;

pub use result::{BatchReport, ExecutionResult, ToolExecution};

use crate::config::{ExecutorConfig, WardenConfig};
use crate::confirmation::ConfirmationHandler;
use crate::context::{ContextError, ExecutionContext};
use crate::error::{ErrorKind, Result, ToolError};
use crate::interceptors::{self, InterceptorChain, Operation, operation};
use crate::protocol::ToolCall;
use crate::security::SecurityPolicy;
use crate::tools::{BoxedTool, Input, Output, ToolRegistry, default_registry};
use chrono::Utc;
use futures::FutureExt;
use serde_json::Map;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Tool dispatcher
///
/// Cheap to clone; clones share the registry, configuration and hooks.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<ExecutorInner>,
}

struct ExecutorInner {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    interceptors: Option<InterceptorChain>,
    security_policy: Option<Arc<dyn SecurityPolicy>>,
    confirmation_handler: Option<Arc<dyn ConfirmationHandler>>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.inner.config)
            .field("interceptors", &self.inner.interceptors)
            .field("security_policy", &self.inner.security_policy.is_some())
            .field(
                "confirmation_handler",
                &self.inner.confirmation_handler.is_some(),
            )
            .finish()
    }
}

/// Builder for [`Executor`]
#[derive(Default)]
pub struct ExecutorBuilder {
    registry: Option<Arc<ToolRegistry>>,
    config: ExecutorConfig,
    interceptors: Option<InterceptorChain>,
    security_policy: Option<Arc<dyn SecurityPolicy>>,
    confirmation_handler: Option<Arc<dyn ConfirmationHandler>>,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor settings and the security policy they describe
    pub fn from_config(config: &WardenConfig) -> Self {
        Self::new()
            .config(config.executor.clone())
            .security_policy(config.security.build_policy())
    }

    /// Registry to resolve tools from (default: the process-wide registry)
    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Default timeout; zero disables it
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Batch concurrency bound; zero means unbounded
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    pub fn recover_panics(mut self, recover: bool) -> Self {
        self.config.recover_panics = recover;
        self
    }

    pub fn interceptors(mut self, chain: InterceptorChain) -> Self {
        self.interceptors = Some(chain);
        self
    }

    /// Use [`interceptors::default_chain`]
    pub fn default_interceptors(self) -> Self {
        self.interceptors(interceptors::default_chain())
    }

    pub fn security_policy(mut self, policy: impl SecurityPolicy + 'static) -> Self {
        self.security_policy = Some(Arc::new(policy));
        self
    }

    pub fn shared_security_policy(mut self, policy: Arc<dyn SecurityPolicy>) -> Self {
        self.security_policy = Some(policy);
        self
    }

    pub fn confirmation_handler(mut self, handler: impl ConfirmationHandler + 'static) -> Self {
        self.confirmation_handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_confirmation_handler(mut self, handler: Arc<dyn ConfirmationHandler>) -> Self {
        self.confirmation_handler = Some(handler);
        self
    }

    pub fn build(self) -> Executor {
        Executor {
            inner: Arc::new(ExecutorInner {
                registry: self.registry.unwrap_or_else(default_registry),
                config: self.config,
                interceptors: self.interceptors,
                security_policy: self.security_policy,
                confirmation_handler: self.confirmation_handler,
            }),
        }
    }
}

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// Executor over `registry` with default settings
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::builder().registry(registry).build()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.inner.registry
    }

    /// Read-only view of the settings
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Copy of the interceptor chain, if one is configured
    pub fn interceptors(&self) -> Option<InterceptorChain> {
        self.inner.interceptors.clone()
    }

    pub fn has_security_policy(&self) -> bool {
        self.inner.security_policy.is_some()
    }

    pub fn has_confirmation_handler(&self) -> bool {
        self.inner.confirmation_handler.is_some()
    }

    /// Run a tool through the full pipeline
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        input: Input,
    ) -> Result<Output> {
        self.run(ctx, tool_name, Some(Arc::new(input))).await
    }

    /// Run a tool with a possibly absent input
    ///
    /// Interceptors observe the missing input (and
    /// [`InputValidationInterceptor`] rejects it); the tool itself receives an
    /// empty one.
    ///
    /// [`InputValidationInterceptor`]: crate::interceptors::InputValidationInterceptor
    pub async fn dispatch(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        input: Option<Input>,
    ) -> Result<Output> {
        self.run(ctx, tool_name, input.map(Arc::new)).await
    }

    /// Run a tool on a spawned task
    ///
    /// The returned channel yields exactly one [`ExecutionResult`] and then
    /// closes. Cancel through `ctx`.
    pub fn execute_async(
        &self,
        ctx: &ExecutionContext,
        tool_name: impl Into<String>,
        input: Input,
    ) -> mpsc::Receiver<ExecutionResult> {
        let (tx, rx) = mpsc::channel(1);
        let executor = self.clone();
        let ctx = ctx.clone();
        let tool_name = tool_name.into();

        tokio::spawn(async move {
            let result = executor
                .run_timed(&ctx, tool_name, Some(Arc::new(input)))
                .await;
            if tx.send(result).await.is_err() {
                tracing::debug!("Async result dropped, receiver closed");
            }
        });

        rx
    }

    /// Run a parsed tool call
    pub async fn execute_tool_call(
        &self,
        ctx: &ExecutionContext,
        call: &ToolCall,
    ) -> ExecutionResult {
        self.run_timed(ctx, call.name.clone(), Some(Arc::new(call.to_input())))
            .await
    }

    /// Run parsed tool calls one after another
    ///
    /// Stops early once `ctx` is done; calls that did not run are reported as
    /// context failures.
    pub async fn execute_tool_calls(
        &self,
        ctx: &ExecutionContext,
        calls: &[ToolCall],
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            if let Some(err) = ctx.err() {
                results.push(ExecutionResult::not_started(
                    call.name.clone(),
                    ToolError::from_context(&call.name, err, self.budget(ctx)),
                ));
                continue;
            }
            results.push(self.execute_tool_call(ctx, call).await);
        }
        results
    }

    /// Pipeline plus timing; panics that escape it become `PanicRecovered`
    pub(crate) async fn run_timed(
        &self,
        ctx: &ExecutionContext,
        tool_name: String,
        input: Option<Arc<Input>>,
    ) -> ExecutionResult {
        let start_time = Utc::now();
        let start = Instant::now();

        let outcome = match AssertUnwindSafe(self.run(ctx, &tool_name, input))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => Err(interceptors::panic_error(
                &tool_name,
                payload,
                self.inner.config.capture_panic_stack,
            )),
        };

        ExecutionResult {
            tool_name,
            outcome,
            start_time,
            end_time: Utc::now(),
            duration: start.elapsed(),
        }
    }

    /// Timeout budget reported for deadline failures under `ctx`
    fn budget(&self, ctx: &ExecutionContext) -> Duration {
        match ctx.remaining() {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => self.inner.config.timeout,
        }
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        input: Option<Arc<Input>>,
    ) -> Result<Output> {
        let config = &self.inner.config;

        let tool = self.inner.registry.get(tool_name)?;

        let (scoped, budget) = match config.default_timeout() {
            Some(timeout) if ctx.deadline().is_none() => (ctx.with_timeout(timeout), timeout),
            _ => (ctx.child(), self.budget(ctx)),
        };
        let _release = scoped.cancel_on_drop();

        if let Some(err) = scoped.err() {
            tracing::debug!(tool = %tool_name, reason = %err, "Context done before execution");
            return Err(ToolError::from_context(tool_name, err, budget));
        }

        let no_args = Map::new();
        let args = input.as_deref().map(|i| &i.params).unwrap_or(&no_args);

        if let Some(policy) = &self.inner.security_policy {
            tracing::debug!(tool = %tool_name, policy = %policy.name(), "Validating call");
            let verdict = tokio::select! {
                biased;
                verdict = policy.validate(&scoped, tool_name, args) => verdict,
                _ = scoped.done() => {
                    let reason = scoped.err().unwrap_or(ContextError::Cancelled);
                    tracing::debug!(tool = %tool_name, reason = %reason, "Context done during security validation");
                    return Err(ToolError::from_context(tool_name, reason, budget));
                }
            };
            if let Err(err) = verdict {
                if let Some(reason) = scoped.err() {
                    return Err(context_failure(err, tool_name, reason, budget));
                }
                tracing::warn!(tool = %tool_name, error = %err, "Security policy blocked call");
                let err = if err.kind() == ErrorKind::SecurityViolation {
                    err
                } else {
                    ToolError::security_violation(tool_name, "policy check failed").with_source(err)
                };
                return Err(err.with_operation("security validation failed"));
            }
        }

        if let Some(handler) = &self.inner.confirmation_handler {
            if tool.requires_confirmation(args) {
                tracing::debug!(tool = %tool_name, "Requesting confirmation");
                let approved = tokio::select! {
                    biased;
                    decision = handler.request(&scoped, tool.as_ref(), args) => {
                        decision.map_err(|err| err.with_operation("confirmation failed"))?
                    }
                    _ = scoped.done() => {
                        let err = scoped.err().unwrap_or(ContextError::Cancelled);
                        return Err(ToolError::from_context(tool_name, err, budget));
                    }
                };
                if !approved {
                    tracing::warn!(tool = %tool_name, "Execution denied by confirmation handler");
                    return Err(ToolError::user_denied(tool_name));
                }
            }
        }

        let raw = invoke(tool);
        let composed = match &self.inner.interceptors {
            Some(chain) => chain.compose(raw),
            None => raw,
        };

        let call = {
            let ctx = scoped.clone();
            let name = tool_name.to_string();
            move || composed(ctx, name, input)
        };
        let invocation = if config.recover_panics {
            interceptors::recover(tool_name.to_string(), config.capture_panic_stack, call)
        } else {
            call()
        };

        tracing::debug!(tool = %tool_name, "Invoking tool");
        let result = match scoped.deadline() {
            Some(deadline) => tokio::select! {
                biased;
                result = invocation => result,
                _ = tokio::time::sleep_until(deadline) => Err(
                    ToolError::from_context(tool_name, ContextError::DeadlineExceeded, budget)
                ),
            },
            None => invocation.await,
        };

        match result {
            Ok(mut output) => {
                if let Some(max_bytes) = config.max_output_bytes {
                    if output.truncate(max_bytes) {
                        tracing::debug!(tool = %tool_name, max_bytes, "Output truncated");
                    }
                }
                Ok(output)
            }
            Err(err) => match scoped.err() {
                Some(reason) => Err(context_failure(err, tool_name, reason, budget)),
                None => Err(err),
            },
        }
    }
}

/// Innermost operation: call the tool and wrap its failures as `Execution`
fn invoke(tool: BoxedTool) -> Operation {
    operation(move |ctx, tool_name, input| {
        let tool = tool.clone();
        async move {
            let input = input.unwrap_or_default();
            let result = tool.execute(&ctx, &input).await;
            match result {
                Ok(output) => Ok(output),
                Err(err) if err.kind() == ErrorKind::Execution => Err(err.with_input(input)),
                Err(err) => Err(ToolError::execution(tool_name, err).with_input(input)),
            }
        }
    })
}

/// Replace a failure observed after the context finished with the
/// context-derived one
///
/// Errors that already name the right context condition pass through; the
/// original text is kept as the message otherwise.
fn context_failure(
    err: ToolError,
    tool_name: &str,
    reason: ContextError,
    budget: Duration,
) -> ToolError {
    match (reason, err.kind()) {
        (ContextError::DeadlineExceeded, ErrorKind::Timeout)
        | (ContextError::Cancelled, ErrorKind::ContextCancelled) => err,
        _ => {
            tracing::debug!(tool = %tool_name, error = %err, "Tool failed after context was done");
            ToolError::from_context(tool_name, reason, budget).with_message(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests;
