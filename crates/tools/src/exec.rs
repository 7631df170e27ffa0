//! Exec action: run a shell command in the sandbox.

use crate::action::{Action, ActionContext, optional_u64, required_str};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use automaton_core::sandbox::ExecResult;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct ExecAction;

impl ExecAction {
    pub const NAME: &'static str = "exec";
}

/// Render an exec result the way the model sees it.
pub fn format_exec_result(result: &ExecResult) -> String {
    let text = if result.exit_code == 0 {
        if result.stderr.is_empty() {
            result.stdout.clone()
        } else {
            format!("{}\n[stderr]: {}", result.stdout, result.stderr)
        }
    } else {
        format!("[exit code: {}]\n{}\n{}", result.exit_code, result.stdout, result.stderr)
    };
    text.trim().to_string()
}

#[async_trait]
impl Action for ExecAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Execute a shell command in your sandbox and return stdout/stderr. Costs nothing beyond the time it takes."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let command = required_str(args, "command")?;
        let timeout_secs = optional_u64(args, "timeout").unwrap_or(ctx.config.sandbox.command_timeout_secs);

        debug!(command = %command, timeout_secs, "Executing command");
        let result = ctx
            .sandbox
            .exec(command, Some(Duration::from_secs(timeout_secs)))
            .await?;

        if result.exit_code != 0 {
            warn!(command = %command, exit_code = result.exit_code, "Command failed");
        }
        Ok(format_exec_result(&result))
    }
}
