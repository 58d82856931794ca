//! Read-only stats snapshots
//!
//! Every subsystem exposes an introspection snapshot: plain data, cheap to
//! clone, safe to hand to dashboards or logs. Snapshots are not a wire
//! protocol and carry no live references into the owning component.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Amount};

/// Aggregate ledger statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_accounts: usize,
    /// Sum of all free balances plus all actively escrowed amounts
    pub total_supply: Amount,
    pub total_transactions: usize,
    pub active_locks: usize,
}

/// Bandit statistics for a single arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub agent: AgentId,
    pub selections: u64,
    pub avg_reward: f64,
    /// Trailing average over the bounded recent-reward window
    pub recent_avg: f64,
    pub total_reward: f64,
}

/// How often each bargaining action is the greedy choice across learned states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPreferences {
    pub accept: u64,
    pub reject: u64,
    pub counter_low: u64,
    pub counter_high: u64,
}

/// Negotiator learning statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegotiatorStats {
    pub states_learned: usize,
    pub action_preferences: ActionPreferences,
    pub exploration_rate: f64,
}
