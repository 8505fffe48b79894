//! Confirmation gate for tools that ask for user approval
//!
//! The executor consults a [`ConfirmationHandler`] only when one is configured
//! and the tool's `requires_confirmation` returns true for the arguments.

use crate::context::ExecutionContext;
use crate::error::{Result, ToolError};
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Approves or declines a pending tool call
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Ask whether `tool` may run with `args`
    ///
    /// May wait on user input; implementations should stop waiting once
    /// `ctx` is done.
    async fn request(
        &self,
        ctx: &ExecutionContext,
        tool: &dyn Tool,
        args: &Map<String, Value>,
    ) -> Result<bool>;
}

/// Approves every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

#[async_trait]
impl ConfirmationHandler for AlwaysApprove {
    async fn request(
        &self,
        _ctx: &ExecutionContext,
        _tool: &dyn Tool,
        _args: &Map<String, Value>,
    ) -> Result<bool> {
        Ok(true)
    }
}

/// Declines every request
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDeny;

#[async_trait]
impl ConfirmationHandler for AlwaysDeny {
    async fn request(
        &self,
        _ctx: &ExecutionContext,
        _tool: &dyn Tool,
        _args: &Map<String, Value>,
    ) -> Result<bool> {
        Ok(false)
    }
}

type DecideFn = dyn Fn(&str, &Map<String, Value>) -> Result<bool> + Send + Sync;

/// Adapts a synchronous function `(tool_name, args) -> approved`
#[derive(Clone)]
pub struct FnConfirmation {
    decide: Arc<DecideFn>,
}

impl FnConfirmation {
    pub fn new<F>(decide: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            decide: Arc::new(decide),
        }
    }
}

impl std::fmt::Debug for FnConfirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnConfirmation").finish_non_exhaustive()
    }
}

#[async_trait]
impl ConfirmationHandler for FnConfirmation {
    async fn request(
        &self,
        _ctx: &ExecutionContext,
        tool: &dyn Tool,
        args: &Map<String, Value>,
    ) -> Result<bool> {
        (self.decide)(tool.name(), args)
    }
}

/// Called before the inner handler; an error aborts the request
pub type OnRequest = Arc<dyn Fn(&str, &Map<String, Value>) -> Result<()> + Send + Sync>;

/// Called with the final decision and the error, if any
pub type OnResponse = Arc<dyn Fn(&str, bool, Option<&ToolError>) + Send + Sync>;

/// Wraps another handler with request/response callbacks
///
/// If `on_request` fails, the inner handler is skipped, `on_response` sees
/// `(false, Some(err))` and the error is returned.
#[derive(Clone)]
pub struct CallbackConfirmation {
    inner: Arc<dyn ConfirmationHandler>,
    on_request: Option<OnRequest>,
    on_response: Option<OnResponse>,
}

impl std::fmt::Debug for CallbackConfirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackConfirmation")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .finish_non_exhaustive()
    }
}

impl CallbackConfirmation {
    pub fn new(inner: impl ConfirmationHandler + 'static) -> Self {
        Self::from_shared(Arc::new(inner))
    }

    pub fn from_shared(inner: Arc<dyn ConfirmationHandler>) -> Self {
        Self {
            inner,
            on_request: None,
            on_response: None,
        }
    }

    pub fn on_request<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> Result<()> + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(callback));
        self
    }

    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, bool, Option<&ToolError>) + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(callback));
        self
    }

    fn respond(&self, tool_name: &str, approved: bool, error: Option<&ToolError>) {
        if let Some(callback) = &self.on_response {
            callback(tool_name, approved, error);
        }
    }
}

#[async_trait]
impl ConfirmationHandler for CallbackConfirmation {
    async fn request(
        &self,
        ctx: &ExecutionContext,
        tool: &dyn Tool,
        args: &Map<String, Value>,
    ) -> Result<bool> {
        if let Some(callback) = &self.on_request {
            if let Err(err) = callback(tool.name(), args) {
                self.respond(tool.name(), false, Some(&err));
                return Err(err);
            }
        }

        match self.inner.request(ctx, tool, args).await {
            Ok(approved) => {
                self.respond(tool.name(), approved, None);
                Ok(approved)
            }
            Err(err) => {
                self.respond(tool.name(), false, Some(&err));
                Err(err)
            }
        }
    }
}
