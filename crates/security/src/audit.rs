//! Audit trail for actions that pass through the execution gate.
//!
//! Entries are kept in a bounded in-process buffer (the agent runs for a long
//! time) and forwarded to any number of sinks as they are recorded.

use crate::command_policy::DenyRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Entries retained in memory before the oldest are dropped.
pub const DEFAULT_RETAINED: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    /// The automaton's name
    pub actor: String,
    /// Command, path or peer address the action touched
    pub target: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

impl AuditEntry {
    /// A command stopped by the deny-list.
    pub fn blocked(actor: &str, command: &str, rule: &DenyRule) -> Self {
        Self {
            timestamp: Utc::now(),
            event: AuditEvent::CommandBlocked {
                rule_id: rule.id.to_string(),
            },
            actor: actor.to_string(),
            target: command.to_string(),
            outcome: AuditOutcome::Denied,
            details: Some(rule.description.to_string()),
        }
    }

    /// An action that ran, successfully or not.
    pub fn action(actor: &str, action_name: &str, target: &str, error: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            event: AuditEvent::ActionExecution {
                action_name: action_name.to_string(),
            },
            actor: actor.to_string(),
            target: target.to_string(),
            outcome: if error.is_some() {
                AuditOutcome::Failure
            } else {
                AuditOutcome::Success
            },
            details: error.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    CommandBlocked { rule_id: String },
    ActionExecution { action_name: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    retained: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entries", &self.len())
            .field("retained", &self.retained)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::with_sinks(Vec::new())
    }
}

impl AuditLogger {
    /// Logger that also writes through `tracing`.
    pub fn with_tracing() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retained: DEFAULT_RETAINED,
            sinks,
        }
    }

    /// Keep at most `retained` entries in memory. Sinks still see everything.
    pub fn with_retention(mut self, retained: usize) -> Self {
        self.retained = retained.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, entry: AuditEntry) {
        for sink in &self.sinks {
            sink.record(&entry);
        }
        let mut entries = self.lock();
        if entries.len() >= self.retained {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn with_outcome(&self, outcome: AuditOutcome) -> Vec<AuditEntry> {
        self.lock().iter().filter(|e| e.outcome == outcome).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Writes each entry as a structured `tracing` event.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        match &entry.event {
            AuditEvent::CommandBlocked { rule_id } => tracing::warn!(
                actor = %entry.actor,
                rule = %rule_id,
                command = %entry.target,
                "audit: command blocked"
            ),
            AuditEvent::ActionExecution { action_name } => tracing::info!(
                actor = %entry.actor,
                action = %action_name,
                target = %entry.target,
                outcome = ?entry.outcome,
                details = ?entry.details,
                "audit: action executed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_policy::CommandPolicy;
    use std::sync::Arc;

    #[test]
    fn blocked_entries_carry_the_rule() {
        let policy = CommandPolicy::builtin();
        let rule = policy.check(":(){ :|:& };:").unwrap();
        let logger = AuditLogger::default();
        logger.record(AuditEntry::blocked("ada", ":(){ :|:& };:", rule));
        logger.record(AuditEntry::action("ada", "exec", "ls", None));

        assert_eq!(logger.len(), 2);
        let denied = logger.with_outcome(AuditOutcome::Denied);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].event, AuditEvent::CommandBlocked { rule_id: "fork_bomb".into() });
        assert_eq!(denied[0].details.as_deref(), Some(rule.description));
    }

    #[test]
    fn failed_action_is_a_failure() {
        let entry = AuditEntry::action("ada", "read_file", "/nope", Some("No such file"));
        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert_eq!(entry.details.as_deref(), Some("No such file"));
    }

    #[test]
    fn oldest_entries_are_dropped_past_retention() {
        let logger = AuditLogger::default().with_retention(2);
        for target in ["a", "b", "c"] {
            logger.record(AuditEntry::action("ada", "exec", target, None));
        }
        let targets: Vec<String> = logger.entries().into_iter().map(|e| e.target).collect();
        assert_eq!(targets, ["b", "c"]);
    }

    #[test]
    fn entries_serialize_with_a_type_tag() {
        let entry = AuditEntry::action("ada", "sleep", "", None);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"action_execution""#));
        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, entry.event);
    }

    #[test]
    fn sinks_see_every_entry() {
        struct Collect(Arc<Mutex<Vec<String>>>);

        impl AuditSink for Collect {
            fn record(&self, entry: &AuditEntry) {
                self.0.lock().unwrap().push(entry.target.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let logger = AuditLogger::with_sinks(vec![Box::new(Collect(received.clone()))]).with_retention(1);
        logger.record(AuditEntry::action("ada", "write_file", "notes.md", None));
        logger.record(AuditEntry::action("ada", "write_file", "plan.md", None));

        assert_eq!(received.lock().unwrap().as_slice(), ["notes.md", "plan.md"]);
        assert_eq!(logger.len(), 1);
    }
}
