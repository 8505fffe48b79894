//! Input presence check

use super::{Interceptor, Operation, operation};
use crate::error::ToolError;

/// Rejects calls dispatched without an input
///
/// Field contents are not inspected.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidationInterceptor;

impl Interceptor for InputValidationInterceptor {
    fn name(&self) -> &str {
        "input_validation"
    }

    fn wrap(&self, next: Operation) -> Operation {
        operation(move |ctx, tool_name, input| {
            let next = next.clone();
            async move {
                if input.is_none() {
                    return Err(ToolError::validation(tool_name, "input cannot be nil")
                        .with_field("input"));
                }
                next(ctx, tool_name, input).await
            }
        })
    }
}
