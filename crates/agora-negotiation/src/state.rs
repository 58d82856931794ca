//! Typed bargaining state keys
//!
//! Continuous negotiation factors are bucketed into small enums so the
//! state space stays finite and exhaustively enumerable. The composite
//! key replaces the ad hoc string keys a dynamic-language implementation
//! would reach for.

use serde::{Deserialize, Serialize};

use agora_types::Amount;

/// Where the current offer sits relative to the market price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceBand {
    /// ratio < 0.8
    Low,
    /// 0.8 <= ratio < 1.2
    Fair,
    /// ratio >= 1.2
    High,
}

impl PriceBand {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.8 {
            Self::Low
        } else if ratio < 1.2 {
            Self::Fair
        } else {
            Self::High
        }
    }
}

/// Counterparty reputation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReputationBand {
    /// reputation < 3.0
    Low,
    /// 3.0 <= reputation < 4.5
    Medium,
    /// reputation >= 4.5
    High,
}

impl ReputationBand {
    pub fn from_score(reputation: f64) -> Self {
        if reputation < 3.0 {
            Self::Low
        } else if reputation < 4.5 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// How far into the round budget the episode is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrgencyBand {
    /// urgency < 0.3
    Low,
    /// 0.3 <= urgency < 0.7
    Medium,
    /// urgency >= 0.7
    High,
}

impl UrgencyBand {
    pub fn from_fraction(urgency: f64) -> Self {
        if urgency < 0.3 {
            Self::Low
        } else if urgency < 0.7 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Composite key into the action-value table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BargainState {
    pub service: String,
    pub price: PriceBand,
    pub reputation: ReputationBand,
    pub urgency: UrgencyBand,
}

impl BargainState {
    /// Derive the state for the current point in an episode
    ///
    /// `urgency` is the consumed fraction of the round budget,
    /// `round_index / max_rounds`.
    pub fn derive(
        service: &str,
        offer: Amount,
        market_price: Amount,
        reputation: f64,
        urgency: f64,
    ) -> Self {
        let ratio = offer.0 as f64 / market_price.0.max(1) as f64;
        Self {
            service: service.to_string(),
            price: PriceBand::from_ratio(ratio),
            reputation: ReputationBand::from_score(reputation),
            urgency: UrgencyBand::from_fraction(urgency),
        }
    }
}
