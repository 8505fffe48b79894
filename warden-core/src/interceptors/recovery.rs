//! Panic recovery

use super::{Interceptor, Operation, operation};
use crate::error::{Result, ToolError};
use crate::tools::Output;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Converts panics inside the wrapped operation into `PanicRecovered`
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryInterceptor {
    capture_stack: bool,
}

impl RecoveryInterceptor {
    /// Recover without capturing a backtrace
    pub fn new() -> Self {
        Self::default()
    }

    /// Recover and attach a backtrace to the error
    pub fn with_stack() -> Self {
        Self {
            capture_stack: true,
        }
    }

    pub fn captures_stack(&self) -> bool {
        self.capture_stack
    }
}

impl Interceptor for RecoveryInterceptor {
    fn name(&self) -> &str {
        "recovery"
    }

    fn wrap(&self, next: Operation) -> Operation {
        let capture_stack = self.capture_stack;
        operation(move |ctx, tool_name: String, input| {
            let next = next.clone();
            recover(tool_name.clone(), capture_stack, move || {
                next(ctx, tool_name, input)
            })
        })
    }
}

/// Run `start` and poll its future, turning any panic into an error
///
/// Both the synchronous call that builds the future and every poll of it are
/// guarded.
pub(crate) fn recover<F>(
    tool_name: String,
    capture_stack: bool,
    start: F,
) -> BoxFuture<'static, Result<Output>>
where
    F: FnOnce() -> BoxFuture<'static, Result<Output>> + Send + 'static,
{
    Box::pin(async move {
        let fut = match catch_unwind(AssertUnwindSafe(start)) {
            Ok(fut) => fut,
            Err(payload) => return Err(panic_error(&tool_name, payload, capture_stack)),
        };
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(panic_error(&tool_name, payload, capture_stack)),
        }
    })
}

/// Render a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) fn panic_error(
    tool_name: &str,
    payload: Box<dyn Any + Send>,
    capture_stack: bool,
) -> ToolError {
    let value = panic_message(payload.as_ref());
    // The unwind is over by now, so this is the recovery site's stack.
    let stack = capture_stack.then(|| Backtrace::force_capture().to_string());
    tracing::error!(tool = %tool_name, panic = %value, "Recovered from tool panic");
    ToolError::panic_recovered(tool_name, value, stack)
}
