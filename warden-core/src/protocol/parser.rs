//! Tool-call block parsing

use crate::tools::Input;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Fenced block with an optional `tool`/`json` tag; the body is non-greedy so
/// adjacent blocks stay separate.
static TOOL_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```[ ]*(?:tool|json)?[ ]*\n(.+?)\n```").unwrap());

/// Tool invocation requested by upstream text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool to run
    pub name: String,
    /// Tool arguments
    pub args: Map<String, Value>,
    /// Why the caller wants this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Block-level parse failure
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Block body is not valid JSON
    #[error("tool call block {index}: invalid JSON: {source}")]
    Malformed {
        index: usize,
        source: serde_json::Error,
    },

    /// Block body is JSON but not a valid tool call
    #[error("tool call block {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

impl ParseError {
    /// Zero-based position of the offending block
    pub fn index(&self) -> usize {
        match self {
            ParseError::Malformed { index, .. } | ParseError::Invalid { index, .. } => *index,
        }
    }
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Render as a fenced `tool` block
    pub fn format(&self) -> String {
        let body = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("```tool\n{}\n```", body)
    }

    /// Request for the executor: params from `args`, name from the call,
    /// `reason` copied into metadata
    pub fn to_input(&self) -> Input {
        let mut input = Input::from_params(self.args.clone()).with_name(self.name.clone());
        if let Some(reason) = &self.reason {
            input = input.with_metadata("reason", reason.clone());
        }
        input
    }

    /// Decode one block body
    fn from_block(index: usize, body: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(body.trim())
            .map_err(|source| ParseError::Malformed { index, source })?;
        let invalid = |reason: &str| ParseError::Invalid {
            index,
            reason: reason.to_string(),
        };

        let Value::Object(mut object) = value else {
            return Err(invalid("tool call must be a JSON object"));
        };

        let name = match object.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            Some(Value::String(_)) => return Err(invalid("tool call name cannot be empty")),
            Some(_) => return Err(invalid("tool call name must be a string")),
            None => return Err(invalid("tool call is missing 'name'")),
        };
        let args = match object.remove("args") {
            Some(Value::Object(args)) => args,
            Some(_) => return Err(invalid("tool call args must be an object")),
            None => return Err(invalid("tool call is missing 'args'")),
        };
        let reason = match object.remove("reason") {
            Some(Value::String(reason)) => Some(reason),
            Some(Value::Null) | None => None,
            Some(_) => return Err(invalid("tool call reason must be a string")),
        };

        Ok(Self { name, args, reason })
    }
}

/// Parse every block, failing on the first malformed or invalid one
pub fn parse_tool_calls(text: &str) -> Result<Vec<ToolCall>, ParseError> {
    TOOL_CALL_RE
        .captures_iter(text)
        .enumerate()
        .map(|(index, caps)| ToolCall::from_block(index, &caps[1]))
        .collect()
}

/// Parse valid blocks, skipping anything that does not decode
pub fn parse_tool_calls_lenient(text: &str) -> Vec<ToolCall> {
    TOOL_CALL_RE
        .captures_iter(text)
        .enumerate()
        .filter_map(|(index, caps)| match ToolCall::from_block(index, &caps[1]) {
            Ok(call) => Some(call),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping tool call block");
                None
            }
        })
        .collect()
}

/// Parse valid blocks and return the text with those blocks removed
///
/// Blocks that fail to parse stay in the text. The cleaned text is trimmed.
pub fn extract_tool_calls_lenient(text: &str) -> (Vec<ToolCall>, String) {
    let mut calls = Vec::new();
    let mut cleaned = String::with_capacity(text.len());
    let mut last = 0;

    for (index, caps) in TOOL_CALL_RE.captures_iter(text).enumerate() {
        let Ok(call) = ToolCall::from_block(index, &caps[1]) else {
            continue;
        };
        let Some(block) = caps.get(0) else {
            continue;
        };
        cleaned.push_str(&text[last..block.start()]);
        last = block.end();
        calls.push(call);
    }
    cleaned.push_str(&text[last..]);

    (calls, cleaned.trim().to_string())
}

/// Whether the text contains at least one fenced block
pub fn has_tool_call(text: &str) -> bool {
    TOOL_CALL_RE.is_match(text)
}

/// Number of fenced blocks, valid or not
pub fn count_tool_calls(text: &str) -> usize {
    TOOL_CALL_RE.find_iter(text).count()
}
