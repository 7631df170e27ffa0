//! The action execution gate.
//!
//! Every action request the reasoning backend makes passes through
//! [`ActionGate::execute`]. The gate resolves the action by name, refuses
//! deny-listed `exec` commands before they reach the sandbox, times the
//! call, and folds every outcome into an [`ActionResult`]. It never fails:
//! errors become the result's `error` field.

use crate::action::{ActionContext, ActionRegistry};
use crate::exec::ExecAction;
use automaton_core::action::{ActionDefinition, ActionRequest, ActionResult};
use automaton_core::error::ActionError;
use automaton_security::{AuditEntry, AuditLogger, CommandPolicy};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Prefix of the result text for a deny-listed command.
pub const BLOCKED_PREFIX: &str = "Blocked: ";

pub struct ActionGate {
    registry: ActionRegistry,
    policy: CommandPolicy,
    audit: Arc<AuditLogger>,
}

impl ActionGate {
    pub fn new(registry: ActionRegistry, policy: CommandPolicy, audit: Arc<AuditLogger>) -> Self {
        Self { registry, policy, audit }
    }

    /// Built-in actions, built-in deny-list, audit through `tracing`.
    pub fn builtin() -> Self {
        Self::new(
            crate::builtin_registry(),
            CommandPolicy::builtin(),
            Arc::new(AuditLogger::with_tracing()),
        )
    }

    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.registry.definitions()
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Whether `result` is a deny-list refusal rather than a real run.
    pub fn is_blocked(result: &ActionResult) -> bool {
        result.error.is_none() && result.name == ExecAction::NAME && result.result.starts_with(BLOCKED_PREFIX)
    }

    /// Run one request and record its outcome.
    pub async fn execute(&self, request: &ActionRequest, ctx: &ActionContext) -> ActionResult {
        let started = Instant::now();
        let outcome = self.dispatch(request, ctx).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (result, error) = match outcome {
            Ok(text) => (text, None),
            Err(e) => {
                warn!(action = %request.name, error = %e, "Action failed");
                (String::new(), Some(e.to_string()))
            }
        };

        let result = ActionResult {
            id: request.id.clone(),
            name: request.name.clone(),
            arguments: request.arguments.clone(),
            result,
            duration_ms,
            error,
        };

        if !Self::is_blocked(&result) {
            self.audit.record(AuditEntry::action(
                &ctx.identity.name,
                &request.name,
                &audit_target(request),
                result.error.as_deref(),
            ));
        }
        result
    }

    async fn dispatch(&self, request: &ActionRequest, ctx: &ActionContext) -> Result<String, ActionError> {
        let action = self
            .registry
            .get(&request.name)
            .ok_or_else(|| ActionError::NotFound(request.name.clone()))?;

        if request.name == ExecAction::NAME {
            let command = request.arguments.get("command").and_then(|v| v.as_str()).unwrap_or("");
            if let Some(rule) = self.policy.check(command) {
                warn!(rule = rule.id, command = %command, "Blocked forbidden command");
                self.audit.record(AuditEntry::blocked(&ctx.identity.name, command, rule));
                return Ok(format!("{BLOCKED_PREFIX}{}", rule.description));
            }
        }

        info!(action = %request.name, "Executing action");
        action.execute(&request.arguments, ctx).await
    }
}

fn audit_target(request: &ActionRequest) -> String {
    ["command", "path", "to_address"]
        .iter()
        .find_map(|k| request.arguments.get(*k).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}
