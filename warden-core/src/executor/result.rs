//! Timed execution records produced by async and batch dispatch

use crate::error::{Result, ToolError};
use crate::tools::{Input, Output};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Outcome of one dispatched call plus its timing
///
/// Errors travel here as data; async and batch dispatch never signal them
/// any other way.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Requested tool name
    pub tool_name: String,
    /// Output on success, error otherwise
    pub outcome: Result<Output>,
    /// Wall-clock start
    pub start_time: DateTime<Utc>,
    /// Wall-clock end
    pub end_time: DateTime<Utc>,
    /// Measured duration
    pub duration: Duration,
}

impl ExecutionResult {
    /// Result for a call that never started
    pub(crate) fn not_started(tool_name: impl Into<String>, error: ToolError) -> Self {
        let now = Utc::now();
        Self {
            tool_name: tool_name.into(),
            outcome: Err(error),
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
        }
    }

    pub fn output(&self) -> Option<&Output> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.outcome.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Duration in whole milliseconds
    pub fn duration_ms(&self) -> i64 {
        i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX)
    }

    /// Take the outcome, dropping the timing
    pub fn into_outcome(self) -> Result<Output> {
        self.outcome
    }
}

/// One entry of a batch
#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// Tool to run
    pub tool_name: String,
    /// Request; `None` dispatches without an input
    pub input: Option<Input>,
}

impl ToolExecution {
    pub fn new(tool_name: impl Into<String>, input: Input) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: Some(input),
        }
    }

    /// Entry with no input at all
    pub fn without_input(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            input: None,
        }
    }
}

/// Results of a batch, in input order, plus the first failure observed
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// `results[i]` belongs to `executions[i]`
    pub results: Vec<ExecutionResult>,
    /// First error reported by any entry
    pub first_error: Option<ToolError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results, or the first error if any entry failed
    pub fn into_result(self) -> Result<Vec<ExecutionResult>> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}
