//! Run a small marketplace simulation and print the report as JSON.
//!
//! Logging follows `RUST_LOG`; try `RUST_LOG=agora_market=info` to watch
//! individual rounds settle.

use std::collections::HashMap;

use agora_market::{SimulationConfig, SimulationEngine};
use agora_types::{AgentAttributes, AgentId, Amount};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut engine = SimulationEngine::new(SimulationConfig {
        rounds: 50,
        initial_balance: Amount::new(200),
        seed: 42,
        ..SimulationConfig::default()
    });

    engine
        .add_agent(
            AgentId::from("DataProcessor_A"),
            HashMap::from([
                ("clean_data".to_string(), Amount::new(10)),
                ("run_analysis".to_string(), Amount::new(25)),
            ]),
            AgentAttributes::default(),
        )
        .await;
    engine
        .add_agent(
            AgentId::from("Translator_B"),
            HashMap::from([("translate_text".to_string(), Amount::new(15))]),
            AgentAttributes {
                reputation: 4.2,
                ..AgentAttributes::default()
            },
        )
        .await;
    engine
        .add_agent(
            AgentId::from("Computer_C"),
            HashMap::from([
                ("run_analysis".to_string(), Amount::new(22)),
                ("optimize_model".to_string(), Amount::new(30)),
            ]),
            AgentAttributes {
                reputation: 3.5,
                success_rate: 0.85,
                ..AgentAttributes::default()
            },
        )
        .await;

    let report = engine.run().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
