//! Built-in actions and the execution gate.
//!
//! Actions give the agent the ability to interact with the world: run
//! commands in its sandbox, read and write files, check its budget, go to
//! sleep, and message other agents. Every request goes through the
//! [`ActionGate`], which enforces the command deny-list and records a
//! uniform result.

pub mod action;
pub mod check_credits;
pub mod exec;
pub mod gate;
pub mod read_file;
pub mod send_message;
pub mod sleep;
pub mod system_synopsis;
pub mod write_file;

#[cfg(test)]
pub(crate) mod test_support;

pub use action::{Action, ActionContext, ActionRegistry};
pub use gate::ActionGate;

/// Name of the action that ends a wake cycle.
pub const SLEEP_ACTION: &str = sleep::SleepAction::NAME;

/// The fixed set of built-in actions.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Box::new(exec::ExecAction));
    registry.register(Box::new(read_file::ReadFileAction));
    registry.register(Box::new(write_file::WriteFileAction));
    registry.register(Box::new(check_credits::CheckCreditsAction));
    registry.register(Box::new(sleep::SleepAction));
    registry.register(Box::new(send_message::SendMessageAction));
    registry.register(Box::new(system_synopsis::SystemSynopsisAction));
    registry
}
