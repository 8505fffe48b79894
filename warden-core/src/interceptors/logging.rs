//! Callback-based logging

use super::{Interceptor, Operation, operation};
use crate::error::ToolError;
use crate::tools::{Input, Output};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Called before the inner operation with `(tool_name, input)`
pub type BeforeHook = Arc<dyn Fn(&str, Option<&Input>) + Send + Sync>;

/// Called after the inner operation with `(tool_name, output, error, duration)`
pub type AfterHook =
    Arc<dyn Fn(&str, Option<&Output>, Option<&ToolError>, Duration) + Send + Sync>;

/// Invokes user hooks around each call
///
/// Either hook may be absent. The library never writes logs on its own here;
/// [`LoggingInterceptor::tracing`] provides hooks that emit `tracing` events.
#[derive(Clone, Default)]
pub struct LoggingInterceptor {
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
}

impl std::fmt::Debug for LoggingInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingInterceptor")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl LoggingInterceptor {
    /// Interceptor with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the before hook
    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Option<&Input>) + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Set the after hook
    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, Option<&Output>, Option<&ToolError>, Duration) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Hooks that log through `tracing`
    pub fn tracing() -> Self {
        Self::new()
            .on_before(|tool_name, input| {
                tracing::info!(
                    tool = %tool_name,
                    params = input.map(|i| i.params.len()).unwrap_or_default(),
                    "Tool call started"
                );
            })
            .on_after(|tool_name, output, error, duration| match error {
                Some(err) => tracing::warn!(
                    tool = %tool_name,
                    kind = %err.kind(),
                    duration_ms = duration.as_millis() as u64,
                    error = %err,
                    "Tool call failed"
                ),
                None => tracing::info!(
                    tool = %tool_name,
                    success = output.is_some_and(|o| o.success),
                    bytes = output.map(|o| o.data.len()).unwrap_or_default(),
                    duration_ms = duration.as_millis() as u64,
                    "Tool call finished"
                ),
            })
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    fn wrap(&self, next: Operation) -> Operation {
        let before = self.before.clone();
        let after = self.after.clone();
        operation(move |ctx, tool_name, input| {
            let next = next.clone();
            let before = before.clone();
            let after = after.clone();
            async move {
                if let Some(hook) = &before {
                    hook(&tool_name, input.as_deref());
                }
                let start = Instant::now();
                let result = next(ctx, tool_name.clone(), input).await;
                if let Some(hook) = &after {
                    hook(
                        &tool_name,
                        result.as_ref().ok(),
                        result.as_ref().err(),
                        start.elapsed(),
                    );
                }
                result
            }
        })
    }
}
