//! `automaton memory`: provider listing and recent turns.

use super::open_database;
use automaton_config::AutomatonConfig;
use automaton_core::agent::Turn;
use automaton_core::store::AutomatonDatabase;
use automaton_memory::available_providers;

pub fn providers(config: &AutomatonConfig) {
    println!("Memory providers:");
    for name in available_providers() {
        let marker = if name == config.memory.provider { " (configured)" } else { "" };
        println!("  {name}{marker}");
    }
}

pub async fn recent(config: &AutomatonConfig, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database(config).await?;
    let turns = db.recent_turns(limit).await?;
    if turns.is_empty() {
        println!("No turns recorded yet.");
        return Ok(());
    }
    for turn in &turns {
        println!("{}", describe_turn(turn));
    }
    Ok(())
}

/// One line per turn: time, state, input source, thought and actions.
fn describe_turn(turn: &Turn) -> String {
    let source = turn.input_source.map(|s| s.as_str()).unwrap_or("-");
    let thought: String = turn.thinking.chars().take(80).collect();
    let mut line = format!(
        "[{}] {} ({source}) {}",
        turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
        turn.state,
        if thought.is_empty() { "(no thoughts)" } else { thought.as_str() }
    );
    if !turn.action_results.is_empty() {
        let names: Vec<&str> = turn.action_results.iter().map(|r| r.name.as_str()).collect();
        line.push_str(&format!(" -> {}", names.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::agent::{AgentState, InputSource};

    #[test]
    fn describes_a_quiet_turn() {
        let turn = Turn::new(AgentState::Running);
        let line = describe_turn(&turn);
        assert!(line.contains("running (-) (no thoughts)"));
        assert!(!line.contains("->"));
    }

    #[test]
    fn describes_a_busy_turn() {
        let mut turn = Turn::new(AgentState::LowCompute);
        turn.input_source = Some(InputSource::Wakeup);
        turn.thinking = "Checking the ledger".into();
        turn.action_results.push(automaton_core::action::ActionResult {
            id: "c1".into(),
            name: "check_credits".into(),
            arguments: Default::default(),
            result: "ok".into(),
            duration_ms: 1,
            error: None,
        });
        let line = describe_turn(&turn);
        assert!(line.contains("low_compute (wakeup) Checking the ledger -> check_credits"));
    }
}
