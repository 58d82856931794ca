//! Agora Negotiation - Learned multi-round price bargaining
//!
//! A negotiation episode starts from a buyer's offer against a
//! counterparty's market price and converges to accept or reject within a
//! bounded number of rounds. The bargaining policy is tabular Q-learning
//! over a finite, typed state space:
//!
//! - [`BargainState`]: composite key of service type plus enum-bucketed
//!   price ratio, counterparty reputation, and urgency
//! - [`Negotiator`]: owns the state → action-value table, selects actions
//!   epsilon-greedily, and applies the Q-update after every action
//!
//! If the round budget runs out without a decision the episode settles by
//! forced acceptance of the current offer. The outcome carries a `forced`
//! flag so the orchestration layer can log the degraded settlement; it is
//! never an error.

pub mod negotiator;
pub mod state;

pub use negotiator::{Action, Negotiator, NegotiatorConfig, Outcome};
pub use state::{BargainState, PriceBand, ReputationBand, UrgencyBand};
