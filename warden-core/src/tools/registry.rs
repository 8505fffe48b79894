//! Tool registry for registration and lookup
//!
//! The `ToolRegistry` provides:
//! - Tool registration with nil, empty-name and duplicate detection
//! - Lookup by name
//! - Listing sorted by name, and point-in-time snapshots
//!
//! All operations take `&self`; state sits behind a readers-writer lock so a
//! registry can be shared across tasks as-is.
//!
//! # Example
//!
//! ```rust
//! use warden_core::tools::{FnTool, Output, ToolRegistry};
//!
//! let registry = ToolRegistry::new();
//! registry
//!     .register(FnTool::new("echo", "Echo", |_ctx, input| async move {
//!         Ok(Output::text(input.get_string("message")))
//!     }).boxed())
//!     .unwrap();
//!
//! assert!(registry.has("echo"));
//! assert!(registry.get("missing").is_err_and(|err| err.is_not_found()));
//! ```

use super::tool::{BoxedTool, ToolInfo};
use crate::error::{Result, ToolError};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Point-in-time copy of registry state, sorted by name
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    /// Registered tools
    pub tools: Vec<BoxedTool>,
    /// Matching name/description pairs
    pub infos: Vec<ToolInfo>,
}

impl std::fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("infos", &self.infos)
            .finish()
    }
}

/// Name to tool directory
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, BoxedTool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Map updates are single calls, so a poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, BoxedTool>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, BoxedTool>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a tool
    ///
    /// Fails with `Validation` for an empty name and `DuplicateTool` if the
    /// name is taken.
    pub fn register(&self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        if name.is_empty() {
            return Err(ToolError::validation("", "tool name cannot be empty").with_field("name"));
        }

        let mut tools = self.write();
        if tools.contains_key(&name) {
            return Err(ToolError::duplicate(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        tools.insert(name, tool);
        Ok(())
    }

    /// Register a possibly absent tool reference
    ///
    /// `None` fails with `NilTool`; otherwise behaves like [`register`](Self::register).
    pub fn try_register(&self, tool: Option<BoxedTool>) -> Result<()> {
        match tool {
            Some(tool) => self.register(tool),
            None => Err(ToolError::nil_tool()),
        }
    }

    /// Register multiple tools, stopping at the first failure
    pub fn register_all(&self, tools: impl IntoIterator<Item = BoxedTool>) -> Result<()> {
        for tool in tools {
            self.register(tool)?;
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Result<BoxedTool> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::not_found(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All tool names, sorted
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Name/description pairs, sorted by name
    pub fn list(&self) -> Vec<ToolInfo> {
        self.read()
            .values()
            .map(|tool| ToolInfo::from(tool.as_ref()))
            .collect()
    }

    /// Remove a tool, returning it
    pub fn unregister(&self, name: &str) -> Result<BoxedTool> {
        let removed = self.write().remove(name);
        match removed {
            Some(tool) => {
                tracing::debug!(tool = %name, "Unregistered tool");
                Ok(tool)
            }
            None => Err(ToolError::not_found(name)),
        }
    }

    /// Remove every tool
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Copy tools and infos under a single read lock
    pub fn snapshot(&self) -> RegistrySnapshot {
        let tools = self.read();
        RegistrySnapshot {
            tools: tools.values().cloned().collect(),
            infos: tools
                .values()
                .map(|tool| ToolInfo::from(tool.as_ref()))
                .collect(),
        }
    }
}

static DEFAULT_REGISTRY: OnceLock<Arc<ToolRegistry>> = OnceLock::new();

/// Process-wide registry, created on first access
///
/// Executors built without an explicit registry use this one.
pub fn default_registry() -> Arc<ToolRegistry> {
    DEFAULT_REGISTRY
        .get_or_init(|| Arc::new(ToolRegistry::new()))
        .clone()
}

/// Register into the default registry at program startup
///
/// A failed registration (empty or duplicate name) is a wiring bug, so the
/// error is logged and the process aborts. Use [`ToolRegistry::register`]
/// on [`default_registry`] to handle the error instead.
pub fn register_default(tool: BoxedTool) {
    if let Err(err) = default_registry().register(tool) {
        tracing::error!(error = %err, "Failed to register default tool");
        std::process::abort();
    }
}
