//! Tool-call protocol: fenced blocks in free-form text
//!
//! Upstream text (typically model output) requests tool calls with blocks
//! like:
//!
//! ````text
//! ```tool
//! {"name": "bash", "args": {"command": "ls"}, "reason": "look around"}
//! ```
//! ````
//!
//! The fence tag may be `tool`, `json` or absent, in any case. Results go
//! back as ```` ```result ```` blocks carrying a [`ToolCallResult`].

mod parser;
mod result;

pub use parser::{
    ParseError, ToolCall, count_tool_calls, extract_tool_calls_lenient, has_tool_call,
    parse_tool_calls, parse_tool_calls_lenient,
};
pub use result::{ToolCallResult, format_results, parse_tool_results};
