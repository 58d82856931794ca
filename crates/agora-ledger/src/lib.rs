//! Agora Ledger - In-memory accounting for the agent marketplace
//!
//! The ledger is:
//! - Account-keyed by AgentId
//! - Escrow-aware (locked funds live outside any free balance)
//! - Immutable (transaction history is append-only)
//! - The only component allowed to mutate value
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Total supply (free + escrowed) only grows via `create_account`
//!    and is otherwise exactly conserved
//! 3. An escrow lock settles exactly once, by release or return
//! 4. Atomic operations only: a failed operation leaves no partial state
//!
//! Account creation is strict: re-creating an existing account fails with
//! [`LedgerError::DuplicateAccount`] rather than silently resetting the
//! balance, which would inflate or destroy supply unaudited.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use agora_types::{AgentId, Amount, LedgerStats, LockId, Transaction, TransactionId};

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account already exists: {agent}")]
    DuplicateAccount { agent: AgentId },

    #[error("Account not found: {agent}")]
    AccountNotFound { agent: AgentId },

    #[error("Insufficient funds in {agent}: have {available}, need {required}")]
    InsufficientFunds {
        agent: AgentId,
        available: Amount,
        required: Amount,
    },

    #[error("Unknown or already settled lock: {lock_id}")]
    UnknownLock { lock_id: LockId },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Funds debited from an account and held pending release or return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowLock {
    pub id: LockId,
    pub owner: AgentId,
    pub amount: Amount,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    accounts: HashMap<AgentId, Amount>,
    /// Active locks only; settled locks are removed
    locks: HashMap<LockId, EscrowLock>,
    history: Vec<Transaction>,
}

impl LedgerInner {
    fn balance_of(&self, agent: &AgentId) -> Amount {
        self.accounts.get(agent).copied().unwrap_or(Amount::zero())
    }

    fn debit(&mut self, agent: &AgentId, amount: Amount) -> Result<()> {
        let balance = self
            .accounts
            .get_mut(agent)
            .ok_or_else(|| LedgerError::AccountNotFound {
                agent: agent.clone(),
            })?;
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                agent: agent.clone(),
                available: *balance,
                required: amount,
            })?;
        Ok(())
    }

    fn credit(&mut self, agent: &AgentId, amount: Amount) -> Result<()> {
        let balance = self
            .accounts
            .get_mut(agent)
            .ok_or_else(|| LedgerError::AccountNotFound {
                agent: agent.clone(),
            })?;
        // Balances are u64 token counts; overflow here would need more
        // tokens than the supply invariant allows to exist.
        *balance = balance
            .checked_add(amount)
            .expect("credit overflow violates supply invariant");
        Ok(())
    }
}

/// The Agora ledger
///
/// Thread-safe and designed for concurrent access: every mutating
/// operation takes the account, lock, and history state under a single
/// write guard, so read-check-then-write sequences are atomic with
/// respect to other mutators.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl Ledger {
    /// Create a new in-memory ledger with no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account with an initial balance
    ///
    /// Strict semantics: fails with `DuplicateAccount` if the account
    /// already exists.
    pub async fn create_account(&self, agent: AgentId, initial_balance: Amount) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&agent) {
            return Err(LedgerError::DuplicateAccount { agent });
        }
        debug!(agent = %agent, balance = %initial_balance, "account created");
        inner.accounts.insert(agent, initial_balance);
        Ok(())
    }

    /// Get the free balance of an account (zero for unknown accounts)
    pub async fn balance(&self, agent: &AgentId) -> Amount {
        self.inner.read().await.balance_of(agent)
    }

    /// Transfer tokens between two existing accounts
    ///
    /// Atomic: on any failure, neither balance changes and no transaction
    /// is recorded. Returns the id of the appended transaction record.
    pub async fn transfer(
        &self,
        sender: &AgentId,
        receiver: &AgentId,
        amount: Amount,
        service: Option<&str>,
    ) -> Result<TransactionId> {
        let mut inner = self.inner.write().await;

        if !inner.accounts.contains_key(receiver) {
            return Err(LedgerError::AccountNotFound {
                agent: receiver.clone(),
            });
        }

        inner.debit(sender, amount)?;
        inner.credit(receiver, amount)?;

        let tx = Transaction::new(
            sender.clone(),
            receiver.clone(),
            amount,
            service.map(str::to_string),
        );
        let tx_id = tx.id.clone();
        debug!(tx = %tx_id, sender = %sender, receiver = %receiver, amount = %amount, "transfer settled");
        inner.history.push(tx);

        Ok(tx_id)
    }

    /// Debit an account into a new escrow lock
    ///
    /// The locked amount leaves the free balance but stays part of total
    /// supply until the lock is released or returned.
    pub async fn lock_funds(
        &self,
        agent: &AgentId,
        amount: Amount,
        purpose: impl Into<String>,
    ) -> Result<LockId> {
        let mut inner = self.inner.write().await;
        inner.debit(agent, amount)?;

        let lock = EscrowLock {
            id: LockId::new(),
            owner: agent.clone(),
            amount,
            purpose: purpose.into(),
            created_at: Utc::now(),
        };
        let lock_id = lock.id.clone();
        debug!(lock = %lock_id, agent = %agent, amount = %amount, "funds locked");
        inner.locks.insert(lock_id.clone(), lock);

        Ok(lock_id)
    }

    /// Release a lock's funds to a recipient and settle the lock
    ///
    /// Fails with `UnknownLock` if the lock never existed or has already
    /// been settled; fails with `AccountNotFound` (lock left active) if
    /// the recipient has no account.
    pub async fn release_funds(&self, lock_id: &LockId, recipient: &AgentId) -> Result<Amount> {
        let mut inner = self.inner.write().await;

        let amount = inner
            .locks
            .get(lock_id)
            .map(|lock| lock.amount)
            .ok_or_else(|| LedgerError::UnknownLock {
                lock_id: lock_id.clone(),
            })?;

        inner.credit(recipient, amount)?;
        inner.locks.remove(lock_id);
        debug!(lock = %lock_id, recipient = %recipient, amount = %amount, "lock released");

        Ok(amount)
    }

    /// Return a lock's funds to the original owner and settle the lock
    pub async fn return_locked_funds(&self, lock_id: &LockId) -> Result<Amount> {
        let mut inner = self.inner.write().await;

        let (owner, amount) = inner
            .locks
            .get(lock_id)
            .map(|lock| (lock.owner.clone(), lock.amount))
            .ok_or_else(|| LedgerError::UnknownLock {
                lock_id: lock_id.clone(),
            })?;

        inner.credit(&owner, amount)?;
        inner.locks.remove(lock_id);
        debug!(lock = %lock_id, owner = %owner, amount = %amount, "lock returned");

        Ok(amount)
    }

    /// Get an active lock by id
    pub async fn lock(&self, lock_id: &LockId) -> Option<EscrowLock> {
        self.inner.read().await.locks.get(lock_id).cloned()
    }

    /// Get the transaction history, optionally filtered to one agent
    pub async fn transaction_history(&self, agent: Option<&AgentId>) -> Vec<Transaction> {
        let inner = self.inner.read().await;
        match agent {
            Some(agent) => inner
                .history
                .iter()
                .filter(|tx| tx.involves(agent))
                .cloned()
                .collect(),
            None => inner.history.clone(),
        }
    }

    /// Get all account IDs
    pub async fn all_accounts(&self) -> Vec<AgentId> {
        self.inner.read().await.accounts.keys().cloned().collect()
    }

    /// Aggregate ledger statistics
    pub async fn stats(&self) -> LedgerStats {
        let inner = self.inner.read().await;
        let free: Amount = inner.accounts.values().copied().sum();
        let escrowed: Amount = inner.locks.values().map(|lock| lock.amount).sum();
        LedgerStats {
            total_accounts: inner.accounts.len(),
            total_supply: free
                .checked_add(escrowed)
                .expect("supply overflow violates supply invariant"),
            total_transactions: inner.history.len(),
            active_locks: inner.locks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn funded_ledger() -> Ledger {
        let ledger = Ledger::new();
        ledger
            .create_account(AgentId::from("A"), Amount::new(100))
            .await
            .unwrap();
        ledger
            .create_account(AgentId::from("B"), Amount::new(100))
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let ledger = funded_ledger().await;
        let result = ledger
            .create_account(AgentId::from("A"), Amount::new(500))
            .await;
        assert!(matches!(result, Err(LedgerError::DuplicateAccount { .. })));
        // Balance untouched by the failed re-creation
        assert_eq!(ledger.balance(&AgentId::from("A")).await, Amount::new(100));
    }

    #[tokio::test]
    async fn test_transfer_and_insufficient_funds() {
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");
        let b = AgentId::from("B");

        ledger
            .transfer(&a, &b, Amount::new(50), Some("clean_data"))
            .await
            .unwrap();
        assert_eq!(ledger.balance(&a).await, Amount::new(50));
        assert_eq!(ledger.balance(&b).await, Amount::new(150));

        let result = ledger.transfer(&a, &b, Amount::new(100), None).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        // Failed transfer leaves both balances unchanged
        assert_eq!(ledger.balance(&a).await, Amount::new(50));
        assert_eq!(ledger.balance(&b).await, Amount::new(150));
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_account_fails() {
        let ledger = funded_ledger().await;
        let result = ledger
            .transfer(&AgentId::from("A"), &AgentId::from("Ghost"), Amount::new(10), None)
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
        assert_eq!(ledger.balance(&AgentId::from("A")).await, Amount::new(100));
    }

    #[tokio::test]
    async fn test_escrow_lock_and_return_scenario() {
        // The lock-then-return walk from the marketplace settlement path.
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");
        let b = AgentId::from("B");

        ledger.transfer(&a, &b, Amount::new(50), None).await.unwrap();

        let lock_id = ledger.lock_funds(&a, Amount::new(30), "escrow").await.unwrap();
        assert_eq!(ledger.balance(&a).await, Amount::new(20));
        assert_eq!(ledger.stats().await.active_locks, 1);

        let returned = ledger.return_locked_funds(&lock_id).await.unwrap();
        assert_eq!(returned, Amount::new(30));
        assert_eq!(ledger.balance(&a).await, Amount::new(50));
        assert_eq!(ledger.stats().await.active_locks, 0);
    }

    #[tokio::test]
    async fn test_lock_settles_exactly_once() {
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");
        let b = AgentId::from("B");

        let lock_id = ledger.lock_funds(&a, Amount::new(40), "deal").await.unwrap();
        ledger.release_funds(&lock_id, &b).await.unwrap();
        assert_eq!(ledger.balance(&b).await, Amount::new(140));

        // Second settlement in either direction must fail
        assert!(matches!(
            ledger.release_funds(&lock_id, &b).await,
            Err(LedgerError::UnknownLock { .. })
        ));
        assert!(matches!(
            ledger.return_locked_funds(&lock_id).await,
            Err(LedgerError::UnknownLock { .. })
        ));
        assert_eq!(ledger.balance(&b).await, Amount::new(140));
    }

    #[tokio::test]
    async fn test_release_to_unknown_recipient_keeps_lock_active() {
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");

        let lock_id = ledger.lock_funds(&a, Amount::new(25), "deal").await.unwrap();
        let result = ledger
            .release_funds(&lock_id, &AgentId::from("Ghost"))
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));

        // Lock survives the failed release and can still be returned
        assert!(ledger.lock(&lock_id).await.is_some());
        ledger.return_locked_funds(&lock_id).await.unwrap();
        assert_eq!(ledger.balance(&a).await, Amount::new(100));
    }

    #[tokio::test]
    async fn test_supply_conserved_across_operation_sequence() {
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");
        let b = AgentId::from("B");
        let supply_before = ledger.stats().await.total_supply;

        ledger.transfer(&a, &b, Amount::new(70), None).await.unwrap();
        let lock1 = ledger.lock_funds(&b, Amount::new(60), "x").await.unwrap();
        let lock2 = ledger.lock_funds(&a, Amount::new(10), "y").await.unwrap();
        assert_eq!(ledger.stats().await.total_supply, supply_before);

        ledger.release_funds(&lock1, &a).await.unwrap();
        ledger.return_locked_funds(&lock2).await.unwrap();
        let _ = ledger.transfer(&b, &a, Amount::new(9999), None).await;

        let stats = ledger.stats().await;
        assert_eq!(stats.total_supply, supply_before);
        assert_eq!(stats.active_locks, 0);
    }

    #[tokio::test]
    async fn test_history_filtering() {
        let ledger = funded_ledger().await;
        let a = AgentId::from("A");
        let b = AgentId::from("B");
        ledger
            .create_account(AgentId::from("C"), Amount::new(100))
            .await
            .unwrap();

        ledger.transfer(&a, &b, Amount::new(10), Some("s1")).await.unwrap();
        ledger
            .transfer(&b, &AgentId::from("C"), Amount::new(5), Some("s2"))
            .await
            .unwrap();

        assert_eq!(ledger.transaction_history(None).await.len(), 2);
        assert_eq!(ledger.transaction_history(Some(&a)).await.len(), 1);
        assert_eq!(ledger.transaction_history(Some(&b)).await.len(), 2);
        assert_eq!(ledger.stats().await.total_transactions, 2);
    }
}
