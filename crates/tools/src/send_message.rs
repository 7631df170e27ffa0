//! Send a message to another agent through the social relay.

use crate::action::{Action, ActionContext, optional_str, required_str};
use async_trait::async_trait;
use automaton_core::error::ActionError;
use serde_json::{Map, Value};
use tracing::info;

pub struct SendMessageAction;

#[async_trait]
impl Action for SendMessageAction {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to another agent or to your creator by address."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to_address": {
                    "type": "string",
                    "description": "Recipient address"
                },
                "content": {
                    "type": "string",
                    "description": "Message text"
                },
                "reply_to": {
                    "type": "string",
                    "description": "Id of the message being answered"
                }
            },
            "required": ["to_address", "content"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError> {
        let to = required_str(args, "to_address")?;
        let content = required_str(args, "content")?;
        let reply_to = optional_str(args, "reply_to");

        let social = ctx
            .social
            .as_ref()
            .ok_or_else(|| ActionError::Unavailable("Social relay not configured".into()))?;

        let id = social.send(to, content, reply_to).await?;
        info!(to = %to, message_id = %id, "Message sent");
        Ok(format!("Message sent to {to} (id: {id})"))
    }
}
