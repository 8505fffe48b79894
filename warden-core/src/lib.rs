//! # Warden - Tool Execution Runtime
//!
//! Warden sits between a host (typically an LLM agent loop) and a set of
//! named tools, and dispatches calls with:
//! - A thread-safe tool registry
//! - Per-call timeouts and cooperative cancellation
//! - Panic isolation
//! - Pluggable security policies and human confirmation
//! - Composable interceptors (logging, timing, validation, recovery)
//! - Bounded-concurrency batch execution with fail-fast cancellation
//! - A fenced-block protocol for reading tool calls out of free-form text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Arc::new(ToolRegistry::new());
//!     registry.register(
//!         FnTool::new("echo", "Echo a message", |_ctx, input| async move {
//!             Ok(Output::text(input.get_string("message")))
//!         })
//!         .boxed(),
//!     )?;
//!
//!     let executor = Executor::builder()
//!         .registry(registry)
//!         .default_interceptors()
//!         .security_policy(default_policy())
//!         .build();
//!
//!     let ctx = ExecutionContext::new();
//!     let output = executor
//!         .execute(&ctx, "echo", Input::new().with_param("message", "hi"))
//!         .await?;
//!     assert_eq!(output.data_str(), "hi");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod confirmation;
pub mod context;
pub mod error;
pub mod executor;
pub mod interceptors;
pub mod protocol;
pub mod security;
pub mod tools;

pub use error::{ErrorKind, Result, ToolError};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, ExecutorConfig, SecurityConfig, WardenConfig};
    pub use crate::confirmation::{
        AlwaysApprove, AlwaysDeny, CallbackConfirmation, ConfirmationHandler, FnConfirmation,
    };
    pub use crate::context::{ContextError, ExecutionContext};
    pub use crate::error::{ErrorDetail, ErrorKind, Result, ToolError, is_kind, tool_name_of};
    pub use crate::executor::{
        BatchReport, ExecutionResult, Executor, ExecutorBuilder, ToolExecution,
    };
    pub use crate::interceptors::{
        ContextCheckInterceptor, GuardInterceptor, InputValidationInterceptor, Interceptor,
        InterceptorChain, LoggingInterceptor, Operation, RecoveryInterceptor, TimingInterceptor,
        default_chain,
    };
    pub use crate::protocol::{
        ParseError, ToolCall, ToolCallResult, extract_tool_calls_lenient, format_results,
        parse_tool_calls, parse_tool_calls_lenient,
    };
    pub use crate::security::{
        CompositePolicy, DenylistPolicy, NoopPolicy, PathPolicy, SecurityPolicy, default_policy,
    };
    pub use crate::tools::{BoxedTool, FnTool, Input, Output, Tool, ToolInfo, ToolRegistry};
}
