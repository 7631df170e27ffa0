//! Security module for the automaton: command deny-list and audit logging.
//!
//! Provides:
//! - **Command policy**: Static deny-list checked before any shell command runs
//! - **Audit logging**: Structured security event logging

pub mod audit;
pub mod command_policy;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use command_policy::{CommandPolicy, DenyRule};
