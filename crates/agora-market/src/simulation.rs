//! Randomized marketplace simulation
//!
//! Drives a roster of agents through seeded rounds of trading: each round
//! picks a buyer, a service somebody else offers, and a randomized opening
//! offer, then runs the full session pipeline and feeds synthetic
//! satisfaction back into the learners. The whole run is reproducible from
//! the configured seed, apart from wall-clock time of day in the selection
//! context.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use agora_types::{AgentAttributes, AgentId, Amount, TradeRequest};

use crate::directory::InMemoryDirectory;
use crate::session::{MarketplaceSession, Result, SessionStats, TradeOutcome};

/// Simulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub rounds: usize,
    /// Opening ledger balance for every roster agent
    pub initial_balance: Amount,
    /// Exploration rate handed to the session's counterparty selector
    pub exploration: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 25,
            initial_balance: Amount::new(100),
            exploration: 0.1,
            seed: 0,
        }
    }
}

/// How one simulated round ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundStatus {
    Settled {
        seller: AgentId,
        price: Amount,
        forced: bool,
    },
    Rejected {
        seller: AgentId,
    },
    /// A price was agreed or attempted but the trade did not settle
    Failed {
        reason: String,
    },
    /// No other agent offered anything the buyer could request
    Skipped,
}

/// Record of one simulated round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: usize,
    pub buyer: AgentId,
    pub service: String,
    pub offered_price: Amount,
    pub status: RoundStatus,
}

/// Final report of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub rounds: Vec<RoundOutcome>,
    pub settled: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stats: SessionStats,
}

#[derive(Debug, Clone)]
struct RosterEntry {
    agent: AgentId,
    /// Sorted by service name so round generation is seed-deterministic
    services: Vec<(String, Amount)>,
}

/// Seeded driver for randomized trading rounds over an agent roster
pub struct SimulationEngine {
    session: MarketplaceSession,
    directory: Arc<InMemoryDirectory>,
    roster: Vec<RosterEntry>,
    rng: StdRng,
    config: SimulationConfig,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let session = MarketplaceSession::with_seed(directory.clone(), config.seed)
            .with_exploration(config.exploration);
        Self {
            session,
            directory,
            roster: Vec::new(),
            // Round generation draws from its own stream so it does not
            // disturb the learners' seeds.
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(0x5151)),
            config,
        }
    }

    /// Add an agent with its service catalog to the roster
    pub async fn add_agent(
        &mut self,
        agent: AgentId,
        services: HashMap<String, Amount>,
        attributes: AgentAttributes,
    ) {
        let mut sorted: Vec<(String, Amount)> = services.clone().into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        self.directory
            .register(agent.clone(), services, attributes)
            .await;
        self.roster.push(RosterEntry {
            agent,
            services: sorted,
        });
    }

    /// Run the configured number of rounds and report the outcomes
    pub async fn run(&mut self) -> Result<SimulationReport> {
        for entry in &self.roster {
            self.session
                .open_account(entry.agent.clone(), self.config.initial_balance)
                .await?;
        }

        let mut rounds = Vec::with_capacity(self.config.rounds);
        let mut settled = 0usize;
        let mut rejected = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;

        for round in 0..self.config.rounds {
            if self.roster.is_empty() {
                break;
            }
            let buyer_idx = self.rng.gen_range(0..self.roster.len());
            let buyer = self.roster[buyer_idx].agent.clone();

            // Every service some other agent offers, with its base price
            let candidates: Vec<(String, Amount)> = self
                .roster
                .iter()
                .filter(|entry| entry.agent != buyer)
                .flat_map(|entry| entry.services.iter().cloned())
                .collect();
            if candidates.is_empty() {
                rounds.push(RoundOutcome {
                    round,
                    buyer,
                    service: String::new(),
                    offered_price: Amount::zero(),
                    status: RoundStatus::Skipped,
                });
                skipped += 1;
                continue;
            }

            let (service, base_price) =
                candidates[self.rng.gen_range(0..candidates.len())].clone();
            let offered_price =
                Amount::new(((base_price.0 as f64 * self.rng.gen_range(0.5..1.5)) as u64).max(1));
            let urgency: f64 = self.rng.gen_range(0.0..1.0);

            let request = TradeRequest::new(buyer.clone(), service.clone(), offered_price);
            let status = match self.session.execute_trade(&request, urgency).await {
                Ok(TradeOutcome::Settled(receipt)) => {
                    let satisfaction = self.rng.gen_range(0.7..1.0);
                    self.session.record_feedback(&receipt, satisfaction);
                    settled += 1;
                    RoundStatus::Settled {
                        seller: receipt.seller,
                        price: receipt.price,
                        forced: receipt.forced,
                    }
                }
                Ok(TradeOutcome::Rejected { seller }) => {
                    rejected += 1;
                    RoundStatus::Rejected { seller }
                }
                Ok(TradeOutcome::Failed {
                    seller,
                    context,
                    reason,
                    ..
                }) => {
                    self.session.record_failure(&seller, &context, -0.5);
                    failed += 1;
                    RoundStatus::Failed {
                        reason: reason.to_string(),
                    }
                }
                // Lock or lookup problems end the round, not the run
                Err(err) => {
                    failed += 1;
                    RoundStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };

            info!(round, buyer = %buyer, service = %service, offer = %offered_price, ?status, "simulation round");
            rounds.push(RoundOutcome {
                round,
                buyer,
                service,
                offered_price,
                status,
            });
        }

        Ok(SimulationReport {
            rounds,
            settled,
            rejected,
            failed,
            skipped,
            stats: self.session.stats().await,
        })
    }

    /// The underlying session, for inspection after a run
    pub fn session(&self) -> &MarketplaceSession {
        &self.session
    }
}
