//! Interceptor chain wrapped around tool invocation
//!
//! An [`Interceptor`] receives the next [`Operation`] and returns a new one
//! that adds behavior before and/or after it. A chain composes its
//! interceptors so that the first one added is the outermost:
//!
//! ```text
//! before_1 -> before_2 -> ... -> tool -> ... -> after_2 -> after_1
//! ```
//!
//! An interceptor may short-circuit by returning without calling `next`; it
//! then owns the failure it returns.

mod context_check;
mod guard;
mod logging;
mod recovery;
mod timing;
mod validation;

pub use context_check::ContextCheckInterceptor;
pub use guard::GuardInterceptor;
pub use logging::{AfterHook, BeforeHook, LoggingInterceptor};
pub use recovery::RecoveryInterceptor;
pub use timing::{EXECUTION_START_KEY, EXECUTION_TIME_MS_KEY, TimingInterceptor};
pub use validation::InputValidationInterceptor;

pub(crate) use recovery::{panic_error, recover};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::tools::{Input, Output};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Composable unit of work: `(ctx, tool_name, input) -> Result<Output>`
///
/// The input is `None` only when a caller explicitly dispatches without one;
/// [`InputValidationInterceptor`] rejects that case.
pub type Operation = Arc<
    dyn Fn(ExecutionContext, String, Option<Arc<Input>>) -> BoxFuture<'static, Result<Output>>
        + Send
        + Sync,
>;

/// Build an [`Operation`] from an async closure
pub fn operation<F, Fut>(f: F) -> Operation
where
    F: Fn(ExecutionContext, String, Option<Arc<Input>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Output>> + Send + 'static,
{
    Arc::new(move |ctx, tool_name, input| Box::pin(f(ctx, tool_name, input)))
}

/// Cross-cutting wrapper around an [`Operation`]
pub trait Interceptor: Send + Sync {
    /// Name used in logs and `MiddlewareFailed` errors
    fn name(&self) -> &str;

    /// Wrap `next`, returning the combined operation
    fn wrap(&self, next: Operation) -> Operation;
}

/// Ordered, immutable list of interceptors
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl InterceptorChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor (it becomes the innermost so far)
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append a shared interceptor
    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Copy of the interceptor list
    pub fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.interceptors.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.interceptors
            .iter()
            .map(|interceptor| interceptor.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Wrap `inner` so that the first interceptor is the outermost
    pub fn compose(&self, inner: Operation) -> Operation {
        self.interceptors
            .iter()
            .rev()
            .fold(inner, |next, interceptor| interceptor.wrap(next))
    }
}

impl FromIterator<Arc<dyn Interceptor>> for InterceptorChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Interceptor>>>(iter: I) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

/// Recovery (with stack), context check, input validation, timing
pub fn default_chain() -> InterceptorChain {
    InterceptorChain::new()
        .with(RecoveryInterceptor::with_stack())
        .with(ContextCheckInterceptor)
        .with(InputValidationInterceptor)
        .with(TimingInterceptor)
}
