//! `automaton status`: a snapshot of the agent.

use super::open_database;
use automaton_config::AutomatonConfig;
use automaton_core::store::{AutomatonDatabase, keys};

pub async fn run(config: &AutomatonConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_database(config).await?;

    let name = db.get_identity("name").await?.unwrap_or_else(|| config.name.clone());
    let address = db.get_identity("address").await?.unwrap_or_else(|| config.address.clone());
    let state = db.agent_state().await?;
    let turns = db.turn_count().await?;

    println!("Automaton status");
    println!("  Name:     {name}");
    println!("  Address:  {address}");
    println!("  State:    {state}");
    println!("  Turns:    {turns}");
    println!("  Model:    {}", config.inference_model);
    println!("  Memory:   {}", config.memory.provider);
    if let Some(until) = db.get_kv(keys::SLEEP_UNTIL).await? {
        println!("  Sleeping until: {until}");
    }
    if let Some(reason) = db.get_kv(keys::WAKE_REQUEST).await? {
        println!("  Wake requested: {reason}");
    }
    println!(
        "  API key:  {}",
        if config.has_api_key() { "configured" } else { "missing (set AUTOMATON_API_KEY)" }
    );

    Ok(())
}
