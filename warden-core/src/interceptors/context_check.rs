//! Early cancellation check

use super::{Interceptor, Operation, operation};
use crate::error::ToolError;

/// Fails fast when the context is already done
///
/// Only checks before calling the inner operation. Both deadline expiry and
/// explicit cancellation surface as `ContextCancelled`; the underlying
/// [`ContextError`](crate::context::ContextError) is kept as the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextCheckInterceptor;

impl Interceptor for ContextCheckInterceptor {
    fn name(&self) -> &str {
        "context_check"
    }

    fn wrap(&self, next: Operation) -> Operation {
        operation(move |ctx, tool_name, input| {
            let next = next.clone();
            async move {
                if let Some(err) = ctx.err() {
                    return Err(ToolError::cancelled(tool_name).with_source(err));
                }
                next(ctx, tool_name, input).await
            }
        })
    }
}
