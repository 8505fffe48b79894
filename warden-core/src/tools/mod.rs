//! Tool system: the tool trait, request/response values and the registry
//!
//! Key pieces:
//! - [`Tool`]: the capability set the runtime dispatches to
//! - [`Input`] / [`Output`]: per-request values, read-only once built
//! - [`ToolRegistry`]: thread-safe name to tool directory
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_core::context::ExecutionContext;
//! use warden_core::executor::Executor;
//! use warden_core::tools::{FnTool, Input, Output, ToolRegistry};
//! use std::sync::Arc;
//!
//! # async fn run() -> warden_core::Result<()> {
//! let registry = Arc::new(ToolRegistry::new());
//! registry.register(FnTool::new("echo", "Echo", |_ctx, input| async move {
//!     Ok(Output::text(input.get_string("message")))
//! }).boxed())?;
//!
//! let executor = Executor::builder().registry(registry).build();
//! let output = executor
//!     .execute(&ExecutionContext::new(), "echo", Input::new().with_param("message", "hi"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod input;
mod output;
mod registry;
mod tool;

pub use input::Input;
pub use output::{DEFAULT_MAX_OUTPUT_BYTES, Output, truncate};
pub use registry::{RegistrySnapshot, ToolRegistry, default_registry, register_default};
pub use tool::{BoxedTool, FnTool, Tool, ToolInfo};
