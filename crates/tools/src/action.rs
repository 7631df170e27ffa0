//! The `Action` trait, the context actions run in, and the registry.

use async_trait::async_trait;
use automaton_config::AutomatonConfig;
use automaton_core::action::ActionDefinition;
use automaton_core::error::ActionError;
use automaton_core::identity::AutomatonIdentity;
use automaton_core::inference::InferenceClient;
use automaton_core::sandbox::ExecutionBackend;
use automaton_core::social::SocialClient;
use automaton_core::store::AutomatonDatabase;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything an action may touch.
#[derive(Clone)]
pub struct ActionContext {
    pub identity: AutomatonIdentity,
    pub config: Arc<AutomatonConfig>,
    pub db: Arc<dyn AutomatonDatabase>,
    pub inference: Arc<dyn InferenceClient>,
    pub sandbox: Arc<dyn ExecutionBackend>,
    pub social: Option<Arc<dyn SocialClient>>,
}

/// A capability the agent can invoke.
#[async_trait]
pub trait Action: Send + Sync {
    /// Unique name the model uses to request this action.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the action and return its result text.
    async fn execute(&self, args: &Map<String, Value>, ctx: &ActionContext) -> Result<String, ActionError>;

    fn to_definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Actions by name, in stable name order.
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.actions.get(name).map(|a| a.as_ref())
    }

    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.actions.values().map(|a| a.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Required string argument.
pub(crate) fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ActionError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ActionError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Optional string argument.
pub(crate) fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Optional non-negative integer argument, accepting numeric strings.
pub(crate) fn optional_u64(args: &Map<String, Value>, key: &str) -> Option<u64> {
    match args.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
