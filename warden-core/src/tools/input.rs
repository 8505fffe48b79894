//! Request value passed to tools

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tool request: semi-typed params, raw payload and string metadata
///
/// Built once per request and treated as read-only afterwards. The typed
/// accessors never panic; missing or mistyped keys yield zero values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Optional request name (usually the target tool)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool arguments
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Raw payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,

    /// Free-form string metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Input {
    /// Create an empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input from an argument map
    pub fn from_params(params: Map<String, Value>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Set the request name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replace all parameters
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Set the raw payload
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Raw parameter value
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// String parameter, or `""`
    pub fn get_string(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Integer parameter, or `0`
    ///
    /// JSON floats are truncated toward zero.
    pub fn get_i64(&self, key: &str) -> i64 {
        match self.params.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            _ => 0,
        }
    }

    /// Float parameter, or `0.0`
    pub fn get_f64(&self, key: &str) -> f64 {
        self.params
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    /// Boolean parameter, or `false`
    pub fn get_bool(&self, key: &str) -> bool {
        self.params
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    /// Object parameter, or an empty map
    pub fn get_object(&self, key: &str) -> Map<String, Value> {
        self.params
            .get(key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Array parameter, or an empty vector
    pub fn get_array(&self, key: &str) -> Vec<Value> {
        self.params
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Array of strings, skipping non-string elements
    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.get_array(key)
            .into_iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect()
    }
}
