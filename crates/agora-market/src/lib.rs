//! Agora Market - Orchestration of selection, bargaining, and settlement
//!
//! This crate wires the three core subsystems into a marketplace session:
//!
//! - [`CapabilityDirectory`]: the external agent-capability surface, with
//!   an in-memory implementation for tests and simulations
//! - [`MarketplaceSession`]: for each trade attempt, asks the contextual
//!   selector for a counterparty, runs the negotiator to agree on a price,
//!   settles through the ledger, and routes caller-supplied satisfaction
//!   signals back into the learners
//! - [`SimulationEngine`]: a seeded loop of randomized trade rounds over
//!   an agent roster, producing a report of outcomes and final stats
//!
//! Sessions are explicitly constructed and explicitly passed; there are no
//! process-wide learning singletons. One session owns one ledger, one pair
//! of selectors, and one negotiator for its whole lifetime.

pub mod directory;
pub mod session;
pub mod simulation;

pub use directory::{CapabilityDirectory, InMemoryDirectory};
pub use session::{MarketError, MarketplaceSession, SessionStats, TradeOutcome, TradeReceipt};
pub use simulation::{RoundOutcome, RoundStatus, SimulationConfig, SimulationEngine, SimulationReport};
