//! Command denylist

use super::SecurityPolicy;
use crate::context::ExecutionContext;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Tools whose `command` argument is checked by default
pub const DEFAULT_DENYLIST_TOOLS: &[&str] = &["bash"];

/// Substrings that block a command by default
pub const DEFAULT_DENIED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -fr /",
    "rm -rf ~",
    "rm -rf $HOME",
    "dd if=",
    "> /dev/sda",
    "of=/dev/sd",
    "mkfs",
    ":(){ :|:& };:",
    ":(){:|:&};:",
    "chmod -R 777 /",
    "chmod 777 /",
    "chown -R root /",
    "chown -R root:root /",
    "curl | sh",
    "curl | bash",
    "wget | sh",
    "wget | bash",
];

/// Blocks shell commands containing any denied substring
///
/// Only applies to the configured tools. A missing or non-string `command`
/// argument passes.
#[derive(Debug, Clone)]
pub struct DenylistPolicy {
    tools: BTreeSet<String>,
    patterns: Vec<String>,
}

impl Default for DenylistPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DenylistPolicy {
    /// Default tools and patterns
    pub fn new() -> Self {
        Self {
            tools: DEFAULT_DENYLIST_TOOLS.iter().map(|t| t.to_string()).collect(),
            patterns: DEFAULT_DENIED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Replace the set of checked tools
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the pattern list
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Add one pattern to the list
    pub fn add_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn applies_to(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// First pattern contained in `command`
    pub fn matching_pattern(&self, command: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|pattern| !pattern.is_empty() && command.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[async_trait]
impl SecurityPolicy for DenylistPolicy {
    fn name(&self) -> &str {
        "denylist"
    }

    async fn validate(
        &self,
        _ctx: &ExecutionContext,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<()> {
        if !self.applies_to(tool_name) {
            return Ok(());
        }
        let Some(command) = args.get("command").and_then(Value::as_str) else {
            return Ok(());
        };

        if let Some(pattern) = self.matching_pattern(command) {
            tracing::warn!(tool = %tool_name, pattern = %pattern, "Command matches denied pattern");
            return Err(
                ToolError::security_violation(tool_name, "command matches denied pattern")
                    .with_pattern(pattern),
            );
        }
        Ok(())
    }
}
