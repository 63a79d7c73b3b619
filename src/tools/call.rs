//! Tool call requests and their results

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request, usually produced by a model, to invoke one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back in the matching result
    #[serde(default)]
    pub id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Id used in logs and errors; empty when the call has none
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

/// Outcome of one [`ToolCall`]
///
/// A failed call carries the error message in `result` with `error` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub origin: ToolCall,
    pub result: Value,
    #[serde(default)]
    pub error: bool,
}

impl ToolResult {
    pub fn success(origin: ToolCall, result: Value) -> Self {
        Self {
            origin,
            result,
            error: false,
        }
    }

    pub fn failure(origin: ToolCall, message: impl Into<String>) -> Self {
        Self {
            origin,
            result: Value::String(message.into()),
            error: true,
        }
    }
}
