//! `automaton wake`: leave a wake request for a parked agent.

use super::open_database;
use automaton_config::AutomatonConfig;
use automaton_core::store::{AutomatonDatabase, keys};
use tracing::info;

pub async fn run(config: &AutomatonConfig, reason: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database(config).await?;
    request_wake(db.as_ref(), reason).await?;
    println!("Wake requested: {reason}");
    Ok(())
}

/// Write the marker a running agent checks while parked.
pub async fn request_wake(db: &dyn AutomatonDatabase, reason: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reason = if reason.trim().is_empty() { "manual wake" } else { reason.trim() };
    db.set_kv(keys::WAKE_REQUEST, reason).await?;
    info!(reason = %reason, "Wake request recorded");
    Ok(())
}
