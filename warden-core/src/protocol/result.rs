//! Result blocks handed back to upstream text

use crate::executor::ExecutionResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RESULT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```[ ]*result[ ]*\n(.+?)\n```").unwrap());

/// Serializable summary of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub success: bool,
    /// Output data as text, or the output message when there is no data
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<i64>,
}

impl ToolCallResult {
    pub fn from_result(result: &ExecutionResult) -> Self {
        let (output, truncated) = match result.output() {
            Some(output) => (
                output.display_text(),
                output.truncated.then_some(true),
            ),
            None => (String::new(), None),
        };

        Self {
            tool_name: result.tool_name.clone(),
            success: result.is_success(),
            output,
            error: result.error().map(ToString::to_string),
            truncated,
            execution_time_ms: Some(result.duration_ms()),
        }
    }

    /// Render as a fenced `result` block
    pub fn format_as_block(&self) -> String {
        let body = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("```result\n{}\n```", body)
    }
}

impl From<&ExecutionResult> for ToolCallResult {
    fn from(result: &ExecutionResult) -> Self {
        Self::from_result(result)
    }
}

/// Render every result as a block, separated by blank lines
pub fn format_results(results: &[ToolCallResult]) -> String {
    results
        .iter()
        .map(ToolCallResult::format_as_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Read `result` blocks back, skipping any that do not decode
pub fn parse_tool_results(text: &str) -> Vec<ToolCallResult> {
    RESULT_BLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| serde_json::from_str(caps[1].trim()).ok())
        .collect()
}
