//! Settled transaction records
//!
//! Transactions are append-only audit entries. Once written to the ledger
//! history they are never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, Amount, TransactionId};

/// An immutable record of a settled value transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender: AgentId,
    pub receiver: AgentId,
    pub amount: Amount,
    /// Service the transfer paid for, if any
    pub service: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction record timestamped at creation
    pub fn new(
        sender: AgentId,
        receiver: AgentId,
        amount: Amount,
        service: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            sender,
            receiver,
            amount,
            service,
            timestamp: Utc::now(),
        }
    }

    /// Whether the given agent participated in this transaction
    pub fn involves(&self, agent: &AgentId) -> bool {
        &self.sender == agent || &self.receiver == agent
    }
}
