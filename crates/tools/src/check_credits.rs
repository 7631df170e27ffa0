//! Report the compute credit balance and survival tier.

use crate::action::{Action, ActionContext};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use automaton_core::survival::SurvivalTier;
use serde_json::{Map, Value};

pub struct CheckCreditsAction;

#[async_trait]
impl Action for CheckCreditsAction {
    fn name(&self) -> &str {
        "check_credits"
    }

    fn description(&self) -> &str {
        "Check your current compute credit balance and survival tier."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let cents = ctx.sandbox.credits_balance().await?;
        let tier = SurvivalTier::classify(cents);
        Ok(format!(
            "Credit balance: ${:.2} ({cents} cents). Survival tier: {tier}",
            cents as f64 / 100.0
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSandbox, fixture_with};

    #[tokio::test]
    async fn reports_balance_and_tier() {
        let fx = fixture_with(RecordingSandbox::with_credits(1234), None);
        let out = CheckCreditsAction.execute(&Map::new(), &fx.ctx).await.unwrap();
        assert_eq!(out, "Credit balance: $12.34 (1234 cents). Survival tier: normal");
    }

    #[tokio::test]
    async fn low_balance_is_flagged() {
        let fx = fixture_with(RecordingSandbox::with_credits(7), None);
        let out = CheckCreditsAction.execute(&Map::new(), &fx.ctx).await.unwrap();
        assert!(out.ends_with("critical"));
    }
}
