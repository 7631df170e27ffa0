//! Read a file from the sandbox.

use crate::action::{Action, ActionContext, required_str};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use serde_json::{Map, Value};

pub struct ReadFileAction;

#[async_trait]
impl Action for ReadFileAction {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in your sandbox."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let path = required_str(args, "path")?;
        Ok(ctx.sandbox.read_file(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use serde_json::json;

    #[tokio::test]
    async fn reads_existing_file() {
        let fx = fixture();
        fx.sandbox
            .files
            .lock()
            .unwrap()
            .insert("notes.md".into(), "# plan".into());

        let args = json!({"path": "notes.md"}).as_object().cloned().unwrap();
        let out = ReadFileAction.execute(&args, &fx.ctx).await.unwrap();
        assert_eq!(out, "# plan");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let fx = fixture();
        let args = json!({"path": "nope.txt"}).as_object().cloned().unwrap();
        let err = ReadFileAction.execute(&args, &fx.ctx).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
