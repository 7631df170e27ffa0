//! The automaton's agent loop.
//!
//! Each wake cycle repeats:
//!
//! 1. **Check** the sleep deadline and the inbox
//! 2. **Classify** the credit balance into a survival tier
//! 3. **Compose** the prompt (system section + recalled memory + pending input)
//! 4. **Think**: ask the reasoning backend for a decision
//! 5. **Act**: run the requested actions through the execution gate
//! 6. **Persist** the turn to the durable store and the memory provider
//!
//! The cycle ends when the agent sleeps, dies, or keeps failing.

pub mod cost;
pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cost::estimate_cost_cents;
pub use loop_runner::{AgentLoop, StateChangeHook, TurnCompleteHook};
pub use prompt::{SystemPromptParams, build_system_prompt, build_wakeup_prompt};
