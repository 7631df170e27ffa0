//! Sleep action: park the agent until a future time.

use crate::action::{Action, ActionContext, optional_str, optional_u64};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use automaton_core::store::keys;
use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tracing::info;

const DEFAULT_SLEEP_SECS: u64 = 60;

pub struct SleepAction;

impl SleepAction {
    pub const NAME: &'static str = "sleep";
}

#[async_trait]
impl Action for SleepAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Go to sleep for a while. Ends the current wake cycle. Use when there is nothing useful to do."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "duration_seconds": {
                    "type": "integer",
                    "description": "How long to sleep (default 60)"
                },
                "reason": {
                    "type": "string",
                    "description": "Why you are sleeping"
                }
            }
        })
    }

    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let secs = optional_u64(args, "duration_seconds").unwrap_or(DEFAULT_SLEEP_SECS);
        let reason = optional_str(args, "reason").unwrap_or("none given");

        let until = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| ActionError::InvalidArguments(format!("duration_seconds out of range: {secs}")))?;
        ctx.db.set_kv(keys::SLEEP_UNTIL, &until.to_rfc3339()).await?;

        info!(seconds = secs, reason = %reason, "Agent chose to sleep");
        Ok(format!("Entering sleep mode for {secs}s. Reason: {reason}"))
    }
}
