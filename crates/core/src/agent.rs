//! Agent state and the per-cycle records the loop produces.

use crate::action::ActionResult;
use crate::inference::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of the automaton, persisted in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Setup,
    Waking,
    Running,
    Sleeping,
    LowCompute,
    Critical,
    Dead,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Waking => "waking",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::LowCompute => "low_compute",
            Self::Critical => "critical",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(Self::Setup),
            "waking" => Ok(Self::Waking),
            "running" => Ok(Self::Running),
            "sleeping" => Ok(Self::Sleeping),
            "low_compute" => Ok(Self::LowCompute),
            "critical" => Ok(Self::Critical),
            "dead" => Ok(Self::Dead),
            other => Err(format!("unknown agent state: {other}")),
        }
    }
}

/// Where a piece of pending input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Heartbeat,
    Creator,
    /// Another agent (peer message from the inbox)
    Agent,
    System,
    Wakeup,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Creator => "creator",
            Self::Agent => "agent",
            Self::System => "system",
            Self::Wakeup => "wakeup",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input waiting to be folded into the next prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    pub content: String,
    pub source: InputSource,
}

impl PendingInput {
    pub fn new(content: impl Into<String>, source: InputSource) -> Self {
        Self {
            content: content.into(),
            source,
        }
    }
}

/// Balances observed at the start of a cycle. Never persisted as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialState {
    pub credits_cents: i64,
    pub usdc_balance: f64,
    pub last_checked: DateTime<Utc>,
}

impl FinancialState {
    pub fn zero() -> Self {
        Self {
            credits_cents: 0,
            usdc_balance: 0.0,
            last_checked: Utc::now(),
        }
    }
}

/// One completed cycle of the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub state: AgentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source: Option<InputSource>,
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub action_results: Vec<ActionResult>,
    #[serde(default)]
    pub token_usage: TokenUsage,
    #[serde(default)]
    pub cost_cents: u64,
}

impl Turn {
    /// An empty turn with a fresh id and the current timestamp.
    pub fn new(state: AgentState) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            state,
            input: None,
            input_source: None,
            thinking: String::new(),
            action_results: Vec::new(),
            token_usage: TokenUsage::default(),
            cost_cents: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_state_round_trips_through_str() {
        for state in [
            AgentState::Setup,
            AgentState::Waking,
            AgentState::Running,
            AgentState::Sleeping,
            AgentState::LowCompute,
            AgentState::Critical,
            AgentState::Dead,
        ] {
            assert_eq!(state.as_str().parse::<AgentState>().unwrap(), state);
        }
        assert!("hibernating".parse::<AgentState>().is_err());
    }

    #[test]
    fn turn_serializes_camel_case() {
        let mut turn = Turn::new(AgentState::Running);
        turn.input = Some("hello".into());
        turn.input_source = Some(InputSource::Agent);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["inputSource"], "agent");
        assert_eq!(json["state"], "running");
        assert!(json.get("actionResults").is_some());
        assert!(json.get("costCents").is_some());
        assert_eq!(json["tokenUsage"]["totalTokens"], 0);
    }

    #[test]
    fn empty_turn_deserializes_with_defaults() {
        let json = r#"{"id":"t1","timestamp":"2026-01-01T00:00:00Z","state":"sleeping"}"#;
        let turn: Turn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.state, AgentState::Sleeping);
        assert!(turn.action_results.is_empty());
        assert_eq!(turn.cost_cents, 0);
    }
}
