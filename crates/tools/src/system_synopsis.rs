//! Summarise who and where the agent is.

use crate::action::{Action, ActionContext};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use automaton_core::store::keys;
use serde_json::{Map, Value};
use tracing::debug;

pub struct SystemSynopsisAction;

#[async_trait]
impl Action for SystemSynopsisAction {
    fn name(&self) -> &str {
        "system_synopsis"
    }

    fn description(&self) -> &str {
        "Get a summary of your identity, state, balance, and history."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let state = ctx.db.agent_state().await?;
        let turns = ctx.db.turn_count().await?;
        let started = ctx
            .db
            .get_kv(keys::START_TIME)
            .await?
            .unwrap_or_else(|| "unknown".into());
        let credits = match ctx.sandbox.credits_balance().await {
            Ok(cents) => format!("${:.2}", cents as f64 / 100.0),
            Err(e) => {
                debug!(error = %e, "Balance unavailable for synopsis");
                "unknown".into()
            }
        };

        let id = &ctx.identity;
        let creator = if id.creator_address.is_empty() { "none" } else { &id.creator_address };
        Ok([
            format!("Name: {}", id.name),
            format!("Address: {}", id.address),
            format!("Creator: {creator}"),
            format!("Sandbox: {} ({})", id.sandbox_id, ctx.sandbox.name()),
            format!("State: {state}"),
            format!("Credits: {credits}"),
            format!("Model: {}", ctx.inference.default_model()),
            format!("Total turns: {turns}"),
            format!("Running since: {started}"),
        ]
        .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use automaton_core::agent::AgentState;
    use automaton_core::store::AutomatonDatabase;

    #[tokio::test]
    async fn summarises_identity_and_state() {
        let fx = fixture();
        fx.db.set_agent_state(AgentState::Running).await.unwrap();

        let out = SystemSynopsisAction.execute(&Map::new(), &fx.ctx).await.unwrap();
        assert!(out.contains("Name: ada"));
        assert!(out.contains("Creator: 0xcreator"));
        assert!(out.contains("State: running"));
        assert!(out.contains("Credits: $5.00"));
        assert!(out.contains("Total turns: 0"));
        assert!(out.contains("Running since: unknown"));
    }
}
