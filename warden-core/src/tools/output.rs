//! Response value returned by tools, plus the output byte ceiling

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Default output ceiling: 100 KiB
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Tool response
///
/// Interceptors may add metadata entries; the payload is never modified by
/// the runtime except through [`Output::truncate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Whether the tool considers the call successful
    pub success: bool,

    /// Raw payload
    #[serde(default)]
    pub data: Vec<u8>,

    /// Structured result fields
    #[serde(default)]
    pub result: Map<String, Value>,

    /// Free-form string metadata (timing, provenance)
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Set when `data` was cut to the output ceiling
    #[serde(default)]
    pub truncated: bool,
}

impl Output {
    /// Successful output with a raw payload
    pub fn success(data: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            data: data.into(),
            ..Self::default()
        }
    }

    /// Successful output carrying UTF-8 text
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(text.into().into_bytes())
    }

    /// Unsuccessful output with a message
    ///
    /// This reports a soft failure the tool chose to surface as data; hard
    /// failures are returned as errors instead.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Build a successful output truncated to `max_bytes`
    pub fn with_truncated_data(data: impl Into<Vec<u8>>, max_bytes: usize) -> Self {
        let mut output = Self::success(data);
        output.truncate(max_bytes);
        output
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a structured result field
    pub fn with_result(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.result.insert(key.into(), value.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Payload as text (lossy for invalid UTF-8)
    pub fn data_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Payload as text, or the message when the payload is empty
    pub fn display_text(&self) -> String {
        if self.data.is_empty() {
            self.message.clone()
        } else {
            self.data_str().into_owned()
        }
    }

    /// Cut `data` to `max_bytes` and flag the output
    ///
    /// `max_bytes == 0` selects [`DEFAULT_MAX_OUTPUT_BYTES`]. Data exactly at
    /// the ceiling is left alone. Returns whether anything was cut.
    pub fn truncate(&mut self, max_bytes: usize) -> bool {
        let ceiling = if max_bytes == 0 {
            DEFAULT_MAX_OUTPUT_BYTES
        } else {
            max_bytes
        };
        if self.data.len() > ceiling {
            self.data.truncate(ceiling);
            self.truncated = true;
            return true;
        }
        false
    }
}

/// Apply the output ceiling in place
pub fn truncate(output: &mut Output, max_bytes: usize) -> bool {
    output.truncate(max_bytes)
}
