//! Advisory security checks run before a tool is invoked
//!
//! A [`SecurityPolicy`] inspects the tool name and arguments and either lets
//! the call through or fails with `SecurityViolation`. Policies are advisory:
//! they catch obviously dangerous requests, they do not sandbox anything.
//!
//! Built-in policies:
//! - [`DenylistPolicy`]: substring patterns over `args["command"]`
//! - [`PathPolicy`]: sensitive file names over `args["path"]`
//! - [`CompositePolicy`]: ordered list, first failure wins
//! - [`NoopPolicy`]: explicit opt-out

mod denylist;
mod path;

pub use denylist::{DEFAULT_DENIED_PATTERNS, DEFAULT_DENYLIST_TOOLS, DenylistPolicy};
pub use path::{DEFAULT_PATH_TOOLS, DEFAULT_SENSITIVE_PATTERNS, PathPolicy};

use crate::context::ExecutionContext;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Pre-invocation check
#[async_trait]
pub trait SecurityPolicy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Validate a call, failing with `SecurityViolation` to block it
    async fn validate(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<()>;
}

/// Policy that allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

#[async_trait]
impl SecurityPolicy for NoopPolicy {
    fn name(&self) -> &str {
        "noop"
    }

    async fn validate(
        &self,
        _ctx: &ExecutionContext,
        _tool_name: &str,
        _args: &Map<String, Value>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Runs policies in order, stopping at the first failure
#[derive(Clone, Default)]
pub struct CompositePolicy {
    policies: Vec<Arc<dyn SecurityPolicy>>,
}

impl std::fmt::Debug for CompositePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.policies.iter().map(|p| p.name()))
            .finish()
    }
}

impl CompositePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy
    pub fn with(mut self, policy: impl SecurityPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Append a shared policy
    pub fn with_shared(mut self, policy: Arc<dyn SecurityPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[async_trait]
impl SecurityPolicy for CompositePolicy {
    fn name(&self) -> &str {
        "composite"
    }

    async fn validate(
        &self,
        ctx: &ExecutionContext,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<()> {
        for policy in &self.policies {
            if let Some(err) = ctx.err() {
                let budget = ctx.remaining().unwrap_or_default();
                return Err(ToolError::from_context(tool_name, err, budget));
            }
            policy.validate(ctx, tool_name, args).await?;
        }
        Ok(())
    }
}

/// Denylist and path policy with their default settings
pub fn default_policy() -> CompositePolicy {
    CompositePolicy::new()
        .with(DenylistPolicy::new())
        .with(PathPolicy::new())
}
