//! Sensitive path validator

use super::SecurityPolicy;
use crate::context::ExecutionContext;
use crate::error::{Result, ToolError};
use async_trait::async_trait;
use glob::Pattern;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// File tools whose `path` argument is checked by default
pub const DEFAULT_PATH_TOOLS: &[&str] = &[
    "read",
    "write",
    "edit",
    "read_file",
    "write_file",
    "edit_file",
    "file_read",
    "file_write",
    "file_edit",
];

/// File names and globs treated as sensitive by default
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "credentials",
    "credentials.json",
    "secrets.*",
    ".netrc",
    ".pgpass",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
];

/// Blocks file tools from touching sensitive paths
///
/// Patterns are globs matched against the final path component, so both
/// exact names (`id_rsa`) and extension globs (`*.pem`) work. Patterns that
/// contain a `/` are matched against the whole path instead.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    tools: BTreeSet<String>,
    patterns: Vec<Pattern>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPolicy {
    /// Default tools and patterns
    pub fn new() -> Self {
        Self {
            tools: DEFAULT_PATH_TOOLS.iter().map(|t| t.to_string()).collect(),
            patterns: compile(DEFAULT_SENSITIVE_PATTERNS.iter().copied()),
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
    ///
    /// Invalid globs are skipped with a warning.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns = compile(patterns);
        self
    }

    /// Add one pattern to the list
    pub fn add_pattern(mut self, pattern: impl AsRef<str>) -> Self {
        self.patterns.extend(compile([pattern]));
        self
    }

    pub fn applies_to(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }

    /// First pattern that matches `path`
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        let leaf = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);

        self.patterns
            .iter()
            .find(|pattern| {
                if pattern.as_str().contains('/') {
                    pattern.matches(path)
                } else {
                    pattern.matches(leaf)
                }
            })
            .map(Pattern::as_str)
    }
}

fn compile<I, S>(patterns: I) -> Vec<Pattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    tracing::warn!(pattern = %raw, error = %err, "Skipping invalid path pattern");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl SecurityPolicy for PathPolicy {
    fn name(&self) -> &str {
        "path"
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
        let Some(path) = args.get("path").and_then(Value::as_str) else {
            return Ok(());
        };

        if let Some(pattern) = self.matching_pattern(path) {
            tracing::warn!(tool = %tool_name, path = %path, pattern = %pattern, "Access to sensitive path blocked");
            return Err(
                ToolError::security_violation(tool_name, "path matches sensitive pattern")
                    .with_pattern(pattern)
                    .with_path(path),
            );
        }
        Ok(())
    }
}
