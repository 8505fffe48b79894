//! Tool trait and closure-backed tool
//!
//! Tools are the executable units the runtime dispatches to. The runtime
//! depends only on the four methods of [`Tool`]; everything else a tool does
//! is its own business.

use super::input::Input;
use super::output::Output;
use crate::context::ExecutionContext;
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Core tool trait
///
/// `execute` should observe `ctx` at its own suspension points; the runtime
/// races it against the context deadline either way.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Run the tool
    async fn execute(&self, ctx: &ExecutionContext, input: &Input) -> Result<Output>;

    /// Whether this call needs user confirmation before running
    ///
    /// Only consulted when the executor has a confirmation handler.
    fn requires_confirmation(&self, _args: &Map<String, Value>) -> bool {
        false
    }
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

/// Name and description pair used for discovery
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
}

impl From<&dyn Tool> for ToolInfo {
    fn from(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
        }
    }
}

type ToolFn = dyn Fn(ExecutionContext, Input) -> BoxFuture<'static, Result<Output>> + Send + Sync;
type ConfirmFn = dyn Fn(&Map<String, Value>) -> bool + Send + Sync;

/// Tool backed by an async closure
///
/// ```rust
/// use warden_core::tools::{FnTool, Output};
///
/// let echo = FnTool::new("echo", "Echoes the message param", |_ctx, input| async move {
///     Ok(Output::text(input.get_string("message")))
/// });
/// ```
pub struct FnTool {
    name: String,
    description: String,
    handler: Arc<ToolFn>,
    confirm: Option<Arc<ConfirmFn>>,
}

impl FnTool {
    /// Create a tool from a closure
    ///
    /// The closure receives owned copies of the context and input so the
    /// returned future can be `'static`.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ExecutionContext, Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Output>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(move |ctx, input| Box::pin(handler(ctx, input))),
            confirm: None,
        }
    }

    /// Require confirmation for every call
    pub fn with_confirmation(self) -> Self {
        self.with_confirmation_when(|_| true)
    }

    /// Require confirmation when `predicate` returns true for the arguments
    pub fn with_confirmation_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        self.confirm = Some(Arc::new(predicate));
        self
    }

    /// Wrap into a shared tool reference
    pub fn boxed(self) -> BoxedTool {
        Arc::new(self)
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("confirms", &self.confirm.is_some())
            .finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, ctx: &ExecutionContext, input: &Input) -> Result<Output> {
        (self.handler)(ctx.clone(), input.clone()).await
    }

    fn requires_confirmation(&self, args: &Map<String, Value>) -> bool {
        self.confirm.as_ref().is_some_and(|confirm| confirm(args))
    }
}
