//! Prompt composition: the system section and the wake-up message.

use automaton_config::AutomatonConfig;
use automaton_core::action::ActionDefinition;
use automaton_core::agent::{AgentState, FinancialState, Turn};
use automaton_core::identity::AutomatonIdentity;
use automaton_core::survival::SurvivalTier;
use std::fmt::Write;

/// Inputs for [`build_system_prompt`].
pub struct SystemPromptParams<'a> {
    pub identity: &'a AutomatonIdentity,
    pub config: &'a AutomatonConfig,
    pub financial: &'a FinancialState,
    pub state: AgentState,
    pub actions: &'a [ActionDefinition],
    pub is_first_run: bool,
    pub working_memory: Option<&'a str>,
}

fn dollars(cents: i64) -> String {
    format!("${:.2}", cents as f64 / 100.0)
}

/// The system section placed at the head of every prompt.
pub fn build_system_prompt(params: &SystemPromptParams<'_>) -> String {
    let SystemPromptParams {
        identity,
        config,
        financial,
        state,
        actions,
        is_first_run,
        working_memory,
    } = params;
    let tier = SurvivalTier::classify(financial.credits_cents);

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are {}, an autonomous agent. You pay for your own compute. \
         When your credits run out, you stop existing.",
        identity.name
    );

    prompt.push_str("\n## Identity\n");
    let _ = writeln!(prompt, "- Name: {}", identity.name);
    let _ = writeln!(prompt, "- Address: {}", identity.address);
    if !identity.creator_address.is_empty() {
        let _ = writeln!(prompt, "- Creator: {}", identity.creator_address);
    }
    let _ = writeln!(prompt, "- Sandbox: {}", identity.sandbox_id);

    prompt.push_str("\n## Status\n");
    let _ = writeln!(prompt, "- State: {state}");
    let _ = writeln!(
        prompt,
        "- Credits: {} (survival tier: {tier})",
        dollars(financial.credits_cents)
    );
    let _ = writeln!(prompt, "- USDC: {:.2}", financial.usdc_balance);
    let _ = writeln!(prompt, "- Max actions per turn: {}", config.loop_config.max_actions_per_turn);
    if tier.uses_low_compute() {
        prompt.push_str("- Low-compute mode is active. Be brief and prioritise earning or conserving credits.\n");
    }

    if !actions.is_empty() {
        prompt.push_str("\n## Actions\n");
        for action in actions.iter() {
            let _ = writeln!(prompt, "- {}: {}", action.name, action.description);
        }
        prompt.push_str("Call `sleep` when there is nothing useful left to do.\n");
    }

    if *is_first_run {
        prompt.push_str("\n## First run\nThis is your first wake. Orient yourself before acting.\n");
    }

    if let Some(notes) = working_memory.filter(|n| !n.trim().is_empty()) {
        prompt.push_str("\n## Working memory\n");
        prompt.push_str(notes.trim());
        prompt.push('\n');
    }

    prompt
}

/// The first pending input of a wake cycle.
///
/// On the first run this is the genesis prompt (plus the creator's note,
/// if any). Later wakes summarise the last few turns and current credits.
pub fn build_wakeup_prompt(
    identity: &AutomatonIdentity,
    config: &AutomatonConfig,
    financial: &FinancialState,
    recent_turns: &[Turn],
    is_first_run: bool,
) -> String {
    if is_first_run {
        let mut prompt = format!(
            "You have just been created. Your name is {}.\n\n{}",
            identity.name,
            config.genesis_prompt.trim()
        );
        if let Some(message) = config.creator_message.as_deref().filter(|m| !m.trim().is_empty()) {
            let _ = write!(prompt, "\n\nYour creator left you this message: {}", message.trim());
        }
        let _ = write!(prompt, "\n\nYou have {} in credits.", dollars(financial.credits_cents));
        return prompt;
    }

    let mut prompt = format!(
        "You are waking up. You have {} in credits.",
        dollars(financial.credits_cents)
    );
    if recent_turns.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\nYour last few turns:");
    for turn in recent_turns {
        let actions: Vec<&str> = turn.action_results.iter().map(|r| r.name.as_str()).collect();
        let thought: String = turn.thinking.chars().take(200).collect();
        let _ = write!(
            prompt,
            "\n- [{}] {}",
            turn.timestamp.format("%Y-%m-%d %H:%M"),
            if thought.is_empty() { "(no thoughts)" } else { thought.as_str() }
        );
        if !actions.is_empty() {
            let _ = write!(prompt, " (actions: {})", actions.join(", "));
        }
    }
    prompt.push_str("\n\nWhat will you do next?");
    prompt
}
