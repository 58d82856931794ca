//! Agent capability types
//!
//! Agents advertise a catalog of services with base prices plus scalar
//! quality attributes. The marketplace core treats service semantics as
//! opaque: a service is a name, a base price, and whoever executes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, Amount};

/// Scalar quality attributes of a counterparty agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentAttributes {
    /// Reputation score in [1.0, 5.0]
    pub reputation: f64,
    /// Fraction of requests completed successfully, in [0.0, 1.0]
    pub success_rate: f64,
    /// Typical time to complete a request, in seconds
    pub response_time: f64,
}

impl Default for AgentAttributes {
    fn default() -> Self {
        Self {
            reputation: 5.0,
            success_rate: 0.95,
            response_time: 2.0,
        }
    }
}

/// A priced service offered by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceQuote {
    pub provider: AgentId,
    pub service: String,
    pub base_price: Amount,
    pub attributes: AgentAttributes,
}

/// A request to purchase a service from the marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Agent paying for the service
    pub buyer: AgentId,
    pub service: String,
    /// Opening offer the buyer brings to negotiation
    pub offered_price: Amount,
    pub created_at: DateTime<Utc>,
}

impl TradeRequest {
    pub fn new(buyer: AgentId, service: impl Into<String>, offered_price: Amount) -> Self {
        Self {
            buyer,
            service: service.into(),
            offered_price,
            created_at: Utc::now(),
        }
    }
}
