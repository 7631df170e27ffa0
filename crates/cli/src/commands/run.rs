//! `automaton run`: bootstrap everything and keep the agent alive.

use super::{build_identity, open_database};
use crate::heartbeat::{self, DEAD_RECHECK};
use automaton_agent::AgentLoop;
use automaton_config::AutomatonConfig;
use automaton_core::agent::AgentState;
use automaton_core::identity::AutomatonIdentity;
use automaton_core::store::{AutomatonDatabase, keys};
use automaton_memory::create_memory_provider;
use automaton_providers::{LocalSandbox, OpenAiCompatClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Pause after the loop returns in an unexpected state.
const RETRY_PAUSE: Duration = Duration::from_secs(30);

pub async fn run(config: AutomatonConfig, memory_override: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let identity = build_identity(&config);
    info!(name = %identity.name, address = %identity.address, "Starting automaton");

    let db = open_database(&config).await?;
    store_identity(db.as_ref(), &identity).await?;

    let provider = memory_override.unwrap_or_else(|| config.memory.provider.clone());
    let memory = create_memory_provider(&provider, &config, db.clone()).await?;
    memory.init().await?;
    info!(provider = %memory.name(), "Memory ready");

    let sandbox = Arc::new(LocalSandbox::from_config(&config));
    sandbox.prepare().await?;
    let inference = Arc::new(OpenAiCompatClient::from_config(&config)?);

    let (wake_tx, mut wake_rx) = mpsc::channel(8);
    let heartbeat = heartbeat::spawn_heartbeat(config.heartbeat.clone(), db.clone(), wake_tx);

    let wallet = sandbox.clone();
    let agent = AgentLoop::new(
        identity,
        config.clone(),
        db.clone(),
        inference,
        sandbox,
        memory.clone(),
    )
    .on_state_change(|state| info!(state = %state, "State changed"))
    .on_turn_complete(move |turn| {
        let balance = wallet.spend(turn.cost_cents);
        info!(
            turn_id = %turn.id,
            actions = turn.action_results.len(),
            tokens = turn.token_usage.total_tokens,
            cost_cents = turn.cost_cents,
            balance_cents = balance,
            "Turn complete"
        );
    });

    tokio::select! {
        _ = run_forever(&agent, db.as_ref(), &mut wake_rx) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Signal handler failed");
            }
            info!("Shutting down");
        }
    }

    heartbeat.abort();
    if let Err(e) = memory.close().await {
        warn!(error = %e, "Memory close failed");
    }
    db.set_agent_state(AgentState::Sleeping).await?;
    Ok(())
}

async fn store_identity(db: &dyn AutomatonDatabase, identity: &AutomatonIdentity) -> Result<(), Box<dyn std::error::Error>> {
    db.set_identity("name", &identity.name).await?;
    db.set_identity("address", &identity.address).await?;
    db.set_identity("creator", &identity.creator_address).await?;
    db.set_identity("sandbox", &identity.sandbox_id).await?;
    Ok(())
}

/// Alternate between wake cycles and parking. Only Ctrl-C stops this.
async fn run_forever(agent: &AgentLoop, db: &dyn AutomatonDatabase, wake_rx: &mut mpsc::Receiver<String>) {
    loop {
        agent.run().await;

        let state = db.agent_state().await;
        let deadline_pending = sleep_recorded(db).await;
        match state {
            Ok(AgentState::Dead) => {
                info!(recheck_secs = DEAD_RECHECK.as_secs(), "Agent is dead, waiting for funding");
                tokio::time::sleep(DEAD_RECHECK).await;
            }
            Ok(AgentState::Sleeping) => {
                heartbeat::park(db, wake_rx).await;
            }
            // A deadline left over from a previous process stops the loop
            // before it writes `sleeping`
            Ok(state) if deadline_pending => {
                debug!(state = %state, "Sleep deadline pending");
                heartbeat::park(db, wake_rx).await;
            }
            Ok(state) => {
                warn!(state = %state, "Loop returned without sleeping");
                tokio::time::sleep(RETRY_PAUSE).await;
            }
            Err(e) => {
                warn!(error = %e, "Could not read agent state");
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

async fn sleep_recorded(db: &dyn AutomatonDatabase) -> bool {
    matches!(db.get_kv(keys::SLEEP_UNTIL).await, Ok(Some(_)))
}
