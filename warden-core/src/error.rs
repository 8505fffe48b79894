//! Error taxonomy for tool registration and execution
//!
//! Every failure the runtime produces is a [`ToolError`]. The error carries a
//! closed [`ErrorDetail`] (one variant per failure kind, with the fields that
//! only make sense for that kind) plus the fields common to all kinds: the
//! tool name, an optional operation tag, an optional message and an optional
//! underlying cause.
//!
//! [`ErrorKind`] is the fieldless sentinel callers compare against:
//!
//! ```rust
//! use warden_core::error::{ErrorKind, ToolError};
//!
//! let err = ToolError::not_found("search");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert!(err.is_not_found());
//! assert_eq!(err.tool_name(), "search");
//! ```

use crate::context::ContextError;
use crate::tools::Input;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, ToolError>;

/// Shared, cloneable error cause
pub type BoxError = Arc<dyn StdError + Send + Sync + 'static>;

/// Failure kind sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No tool registered under the requested name
    NotFound,

    /// Registration collided with an existing name
    DuplicateTool,

    /// Registration of a missing tool reference
    NilTool,

    /// Input or argument failed a check
    Validation,

    /// The tool itself returned a failure
    Execution,

    /// Deadline exceeded
    Timeout,

    /// Cancellation signal fired
    ContextCancelled,

    /// A panic was caught and converted
    PanicRecovered,

    /// An interceptor failed
    MiddlewareFailed,

    /// The confirmation handler declined
    UserDenied,

    /// The security policy blocked the call
    SecurityViolation,
}

impl ErrorKind {
    /// Stable snake_case name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::DuplicateTool => "duplicate_tool",
            ErrorKind::NilTool => "nil_tool",
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ContextCancelled => "context_cancelled",
            ErrorKind::PanicRecovered => "panic_recovered",
            ErrorKind::MiddlewareFailed => "middleware_failed",
            ErrorKind::UserDenied => "user_denied",
            ErrorKind::SecurityViolation => "security_violation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific failure details
#[derive(Debug, Clone)]
pub enum ErrorDetail {
    NotFound,
    DuplicateTool,
    NilTool,
    Validation {
        /// Offending field, if the check was field-specific
        field: Option<String>,
    },
    Execution {
        /// Input the tool was invoked with
        input: Option<Arc<Input>>,
    },
    Timeout {
        /// Time budget that was exceeded
        deadline: Duration,
    },
    ContextCancelled,
    PanicRecovered {
        /// Rendered panic payload
        value: String,
        /// Backtrace captured at the recovery frame
        stack: Option<String>,
    },
    MiddlewareFailed {
        /// Name of the failing interceptor
        interceptor: String,
    },
    UserDenied,
    SecurityViolation {
        /// Policy-supplied reason
        reason: String,
        /// Pattern that matched, if any
        pattern: Option<String>,
        /// Path that was rejected, if any
        path: Option<String>,
    },
}

impl ErrorDetail {
    /// Sentinel kind for this detail
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorDetail::NotFound => ErrorKind::NotFound,
            ErrorDetail::DuplicateTool => ErrorKind::DuplicateTool,
            ErrorDetail::NilTool => ErrorKind::NilTool,
            ErrorDetail::Validation { .. } => ErrorKind::Validation,
            ErrorDetail::Execution { .. } => ErrorKind::Execution,
            ErrorDetail::Timeout { .. } => ErrorKind::Timeout,
            ErrorDetail::ContextCancelled => ErrorKind::ContextCancelled,
            ErrorDetail::PanicRecovered { .. } => ErrorKind::PanicRecovered,
            ErrorDetail::MiddlewareFailed { .. } => ErrorKind::MiddlewareFailed,
            ErrorDetail::UserDenied => ErrorKind::UserDenied,
            ErrorDetail::SecurityViolation { .. } => ErrorKind::SecurityViolation,
        }
    }

    fn summary(&self) -> String {
        match self {
            ErrorDetail::NotFound => "tool not found".to_string(),
            ErrorDetail::DuplicateTool => "tool already registered".to_string(),
            ErrorDetail::NilTool => "tool reference is missing".to_string(),
            ErrorDetail::Validation { field: Some(field) } => {
                format!("validation failed for '{}'", field)
            }
            ErrorDetail::Validation { field: None } => "validation failed".to_string(),
            ErrorDetail::Execution { .. } => "execution failed".to_string(),
            ErrorDetail::Timeout { deadline } => {
                format!("execution timed out after {:?}", deadline)
            }
            ErrorDetail::ContextCancelled => "execution cancelled".to_string(),
            ErrorDetail::PanicRecovered { value, .. } => format!("panic recovered: {}", value),
            ErrorDetail::MiddlewareFailed { interceptor } => {
                format!("interceptor '{}' failed", interceptor)
            }
            ErrorDetail::UserDenied => "execution denied by user".to_string(),
            ErrorDetail::SecurityViolation { reason, .. } => {
                format!("security violation: {}", reason)
            }
        }
    }
}

/// Structured runtime error
#[derive(Debug, Clone)]
pub struct ToolError {
    detail: ErrorDetail,
    tool_name: String,
    operation: Option<String>,
    message: Option<String>,
    source: Option<BoxError>,
}

impl ToolError {
    /// Create an error from a detail and tool name
    pub fn new(detail: ErrorDetail, tool_name: impl Into<String>) -> Self {
        Self {
            detail,
            tool_name: tool_name.into(),
            operation: None,
            message: None,
            source: None,
        }
    }

    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(ErrorDetail::NotFound, tool_name)
    }

    pub fn duplicate(tool_name: impl Into<String>) -> Self {
        Self::new(ErrorDetail::DuplicateTool, tool_name)
    }

    pub fn nil_tool() -> Self {
        Self::new(ErrorDetail::NilTool, "")
    }

    /// Create a validation error with a message
    pub fn validation(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorDetail::Validation { field: None }, tool_name).with_message(message)
    }

    /// Wrap a failure returned by a tool
    pub fn execution(
        tool_name: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::new(ErrorDetail::Execution { input: None }, tool_name).with_source(cause)
    }

    /// Tool failure described only by a message
    pub fn execution_message(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorDetail::Execution { input: None }, tool_name).with_message(message)
    }

    pub fn timeout(tool_name: impl Into<String>, deadline: Duration) -> Self {
        Self::new(ErrorDetail::Timeout { deadline }, tool_name)
    }

    pub fn cancelled(tool_name: impl Into<String>) -> Self {
        Self::new(ErrorDetail::ContextCancelled, tool_name)
    }

    pub fn panic_recovered(
        tool_name: impl Into<String>,
        value: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Self::new(
            ErrorDetail::PanicRecovered {
                value: value.into(),
                stack,
            },
            tool_name,
        )
    }

    pub fn middleware(
        interceptor: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorDetail::MiddlewareFailed {
                interceptor: interceptor.into(),
            },
            tool_name,
        )
        .with_message(message)
    }

    pub fn user_denied(tool_name: impl Into<String>) -> Self {
        Self::new(ErrorDetail::UserDenied, tool_name)
    }

    pub fn security_violation(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorDetail::SecurityViolation {
                reason: reason.into(),
                pattern: None,
                path: None,
            },
            tool_name,
        )
    }

    /// Map a context failure onto the matching kind
    ///
    /// Deadline expiry becomes [`ErrorKind::Timeout`] with the given budget,
    /// anything else becomes [`ErrorKind::ContextCancelled`]. The context
    /// error is kept as the source.
    pub fn from_context(tool_name: impl Into<String>, err: ContextError, budget: Duration) -> Self {
        match err {
            ContextError::DeadlineExceeded => Self::timeout(tool_name, budget).with_source(err),
            ContextError::Cancelled => Self::cancelled(tool_name).with_source(err),
        }
    }

    /// Attach an operation tag ("security validation failed", ...)
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an underlying cause
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set the offending field of a validation error
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        if let ErrorDetail::Validation { field: slot } = &mut self.detail {
            *slot = Some(field.into());
        }
        self
    }

    /// Set the input of an execution error
    pub fn with_input(mut self, input: Arc<Input>) -> Self {
        if let ErrorDetail::Execution { input: slot } = &mut self.detail {
            *slot = Some(input);
        }
        self
    }

    /// Set the matched pattern of a security violation
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        if let ErrorDetail::SecurityViolation { pattern: slot, .. } = &mut self.detail {
            *slot = Some(pattern.into());
        }
        self
    }

    /// Set the rejected path of a security violation
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if let ErrorDetail::SecurityViolation { path: slot, .. } = &mut self.detail {
            *slot = Some(path.into());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.detail.kind()
    }

    pub fn detail(&self) -> &ErrorDetail {
        &self.detail
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Check whether this error, or any error in its source chain, has `kind`
    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }

    pub fn is_not_found(&self) -> bool {
        self.is(ErrorKind::NotFound)
    }

    pub fn is_duplicate(&self) -> bool {
        self.is(ErrorKind::DuplicateTool)
    }

    pub fn is_nil_tool(&self) -> bool {
        self.is(ErrorKind::NilTool)
    }

    pub fn is_validation(&self) -> bool {
        self.is(ErrorKind::Validation)
    }

    pub fn is_execution(&self) -> bool {
        self.is(ErrorKind::Execution)
    }

    pub fn is_timeout(&self) -> bool {
        self.is(ErrorKind::Timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        self.is(ErrorKind::ContextCancelled)
    }

    pub fn is_panic_recovered(&self) -> bool {
        self.is(ErrorKind::PanicRecovered)
    }

    pub fn is_middleware_failed(&self) -> bool {
        self.is(ErrorKind::MiddlewareFailed)
    }

    pub fn is_user_denied(&self) -> bool {
        self.is(ErrorKind::UserDenied)
    }

    pub fn is_security_violation(&self) -> bool {
        self.is(ErrorKind::SecurityViolation)
    }

    /// Whether the failure came from a context signal rather than the tool
    pub fn is_context_error(&self) -> bool {
        self.is_timeout() || self.is_cancelled()
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "{}: ", operation)?;
        }
        if !self.tool_name.is_empty() {
            write!(f, "tool '{}': ", self.tool_name)?;
        }
        f.write_str(&self.detail.summary())?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for ToolError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// Walk `err` and its sources looking for a [`ToolError`] of `kind`
pub fn is_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(tool_err) = err.downcast_ref::<ToolError>() {
            if tool_err.kind() == kind {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Extract the first non-empty tool name from `err` or its sources
pub fn tool_name_of<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a str> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(tool_err) = err.downcast_ref::<ToolError>() {
            if !tool_err.tool_name.is_empty() {
                return Some(tool_err.tool_name.as_str());
            }
        }
        current = err.source();
    }
    None
}
