//! Action records: what the reasoning backend asks for and what came back.
//!
//! The `Action` trait itself lives in `automaton-tools` next to the
//! execution gate, since invoking an action needs the full runtime context.

use crate::message::MessageToolCall;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action definition advertised to the reasoning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments
    pub parameters: Value,
}

/// A single action request, with arguments already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ActionRequest {
    /// Parse the backend's argument string. Anything that is not a JSON
    /// object becomes an empty mapping.
    pub fn from_tool_call(call: &MessageToolCall) -> Self {
        let arguments = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        }
    }
}

/// Uniform outcome of one action invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Result text. Diagnostic only when `error` is set.
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Text shown to the model for this result.
    pub fn display_text(&self) -> String {
        match &self.error {
            Some(e) => format!("Error: {e}"),
            None => self.result.clone(),
        }
    }

    /// Rebuild the request this result answers, for replaying into a prompt.
    pub fn to_tool_call(&self) -> MessageToolCall {
        MessageToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments: Value::Object(self.arguments.clone()).to_string(),
        }
    }
}
