//! Caller-supplied pre-invocation checks

use super::{Interceptor, Operation, operation};
use crate::context::ExecutionContext;
use crate::error::ToolError;
use crate::tools::Input;
use std::sync::Arc;

type GuardFn =
    dyn Fn(&ExecutionContext, &str, Option<&Input>) -> Result<(), String> + Send + Sync;

/// Runs a check before the inner operation
///
/// A rejected check short-circuits with `MiddlewareFailed`, naming this
/// interceptor and carrying the check's message.
#[derive(Clone)]
pub struct GuardInterceptor {
    name: String,
    check: Arc<GuardFn>,
}

impl std::fmt::Debug for GuardInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardInterceptor")
            .field("name", &self.name)
            .finish()
    }
}

impl GuardInterceptor {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ExecutionContext, &str, Option<&Input>) -> Result<(), String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }
}

impl Interceptor for GuardInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn wrap(&self, next: Operation) -> Operation {
        let name = self.name.clone();
        let check = self.check.clone();
        operation(move |ctx, tool_name, input| {
            let next = next.clone();
            let verdict = check(&ctx, &tool_name, input.as_deref());
            let name = name.clone();
            async move {
                if let Err(message) = verdict {
                    tracing::debug!(interceptor = %name, tool = %tool_name, "Guard rejected call");
                    return Err(ToolError::middleware(name, tool_name, message));
                }
                next(ctx, tool_name, input).await
            }
        })
    }
}
