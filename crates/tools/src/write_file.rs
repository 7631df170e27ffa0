//! Write a file in the sandbox.

use crate::action::{Action, ActionContext, required_str};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use serde_json::{Map, Value};
use tracing::debug;

pub struct WriteFileAction;

#[async_trait]
impl Action for WriteFileAction {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in your sandbox. Creates parent directories and overwrites existing files."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;

        ctx.sandbox.write_file(path, content).await?;
        debug!(path = %path, bytes = content.len(), "File written");
        Ok(format!("File written: {path} ({} bytes)", content.len()))
    }
}
