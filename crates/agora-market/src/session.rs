//! Marketplace trade sessions
//!
//! A session owns one ledger, one pair of selectors, and one negotiator,
//! and drives the full trade pipeline: counterparty selection, bounded
//! price bargaining, escrow-backed settlement, and learning feedback.
//!
//! The session never invents reward signals. Satisfaction with a settled
//! trade is observed outside the core and fed back via
//! [`MarketplaceSession::record_feedback`] as an opaque bounded real.

use std::sync::Arc;

use chrono::{Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use agora_bandit::{ArmSelector, Context, ContextualSelector};
use agora_ledger::{Ledger, LedgerError};
use agora_negotiation::{Action, BargainState, Negotiator, Outcome};
use agora_types::{
    AgentId, Amount, ArmStats, LedgerStats, NegotiatorStats, TradeRequest, TransactionId,
};

use crate::directory::CapabilityDirectory;

/// Errors from marketplace orchestration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("No provider offers service: {service}")]
    InvalidService { service: String },

    #[error("Agent not registered in the capability directory: {agent}")]
    UnknownAgent { agent: AgentId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, MarketError>;

/// Record of a settled trade, carried back to the feedback step
#[derive(Debug, Clone, PartialEq)]
pub struct TradeReceipt {
    pub buyer: AgentId,
    pub seller: AgentId,
    pub service: String,
    /// Price actually paid after bargaining
    pub price: Amount,
    /// The seller's quoted market price at trade time
    pub market_price: Amount,
    pub reputation: f64,
    /// True when the price came from the exhausted-rounds auto-settle
    pub forced: bool,
    pub context: Context,
    pub transaction: TransactionId,
}

/// Result of one trade attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// Price agreed and funds settled
    Settled(TradeReceipt),
    /// Negotiation ended without a deal
    Rejected { seller: AgentId },
    /// Price agreed but settlement failed at the ledger
    Failed {
        seller: AgentId,
        price: Amount,
        context: Context,
        reason: LedgerError,
    },
}

/// Combined introspection snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ledger: LedgerStats,
    pub arms: Vec<ArmStats>,
    pub negotiator: NegotiatorStats,
}

/// One marketplace session: selection, bargaining, settlement, feedback
pub struct MarketplaceSession {
    ledger: Ledger,
    directory: Arc<dyn CapabilityDirectory>,
    contextual: ContextualSelector,
    arms: ArmSelector,
    negotiator: Negotiator,
    exploration: f64,
}

impl MarketplaceSession {
    /// Default exploration rate for counterparty selection
    pub const DEFAULT_EXPLORATION: f64 = 0.1;

    /// Create a session with randomly seeded learners
    pub fn new(directory: Arc<dyn CapabilityDirectory>) -> Self {
        Self {
            ledger: Ledger::new(),
            directory,
            contextual: ContextualSelector::new(Vec::new()),
            arms: ArmSelector::new(Vec::new()),
            negotiator: Negotiator::new(),
            exploration: Self::DEFAULT_EXPLORATION,
        }
    }

    /// Create a session with a fixed seed for reproducible runs
    pub fn with_seed(directory: Arc<dyn CapabilityDirectory>, seed: u64) -> Self {
        Self {
            ledger: Ledger::new(),
            directory,
            contextual: ContextualSelector::with_seed(Vec::new(), seed),
            arms: ArmSelector::with_seed(Vec::new(), seed.wrapping_add(1)),
            negotiator: Negotiator::with_seed(seed.wrapping_add(2)),
            exploration: Self::DEFAULT_EXPLORATION,
        }
    }

    /// Replace the negotiator (e.g. with tuned parameters)
    pub fn with_negotiator(mut self, negotiator: Negotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    /// Override the selection exploration rate
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Open a ledger account for a marketplace participant
    pub async fn open_account(&self, agent: AgentId, initial_balance: Amount) -> Result<()> {
        self.ledger.create_account(agent, initial_balance).await?;
        Ok(())
    }

    /// The session's ledger, for balance and history queries
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Attempt one trade: select a counterparty, bargain, settle
    ///
    /// The buyer's opening offer is escrow-locked for the duration of the
    /// negotiation and returned before settlement, so a buyer cannot
    /// bargain with funds it does not hold. `urgency` is the caller's
    /// [0, 1] priority for this request.
    pub async fn execute_trade(
        &mut self,
        request: &TradeRequest,
        urgency: f64,
    ) -> Result<TradeOutcome> {
        let mut providers = self.directory.providers_of(&request.service).await;
        providers.retain(|provider| provider != &request.buyer);
        if providers.is_empty() {
            return Err(MarketError::InvalidService {
                service: request.service.clone(),
            });
        }

        let context = Context::new(
            &request.service,
            urgency,
            request.offered_price,
            time_of_day(),
        );
        let seller = self
            .contextual
            .select_among(&context, &providers, self.exploration)
            .ok_or_else(|| MarketError::InvalidService {
                service: request.service.clone(),
            })?;
        let quote = self.directory.quote(&seller, &request.service).await?;

        // Hold the opening offer in escrow while bargaining runs
        let lock_id = self
            .ledger
            .lock_funds(
                &request.buyer,
                request.offered_price,
                format!("negotiation:{}", request.service),
            )
            .await?;

        let outcome = self.negotiator.negotiate(
            &request.service,
            request.offered_price,
            quote.base_price,
            quote.attributes.reputation,
        );

        self.ledger.return_locked_funds(&lock_id).await?;

        let (price, forced) = match outcome {
            Outcome::Rejected => {
                info!(buyer = %request.buyer, seller = %seller, service = %request.service, "negotiation rejected");
                return Ok(TradeOutcome::Rejected { seller });
            }
            Outcome::Accepted { price, forced } => (price, forced),
        };

        if forced {
            // Degraded outcome: the round budget ran out and the episode
            // auto-settled instead of reaching a learned decision.
            warn!(
                buyer = %request.buyer,
                seller = %seller,
                service = %request.service,
                price = %price,
                "negotiation exhausted its round budget; auto-settled at current offer"
            );
        }

        let transaction = match self
            .ledger
            .transfer(&request.buyer, &seller, price, Some(&request.service))
            .await
        {
            Ok(transaction) => transaction,
            Err(reason) => {
                warn!(buyer = %request.buyer, seller = %seller, price = %price, %reason, "settlement failed");
                return Ok(TradeOutcome::Failed {
                    seller,
                    price,
                    context,
                    reason,
                });
            }
        };

        info!(
            buyer = %request.buyer,
            seller = %seller,
            service = %request.service,
            price = %price,
            tx = %transaction,
            "trade settled"
        );

        Ok(TradeOutcome::Settled(TradeReceipt {
            buyer: request.buyer.clone(),
            seller,
            service: request.service.clone(),
            price,
            market_price: quote.base_price,
            reputation: quote.attributes.reputation,
            forced,
            context,
            transaction,
        }))
    }

    /// Feed an observed satisfaction signal back into the learners
    ///
    /// `satisfaction` is an opaque bounded real from the orchestrating
    /// caller. Both selectors see it immediately; the negotiator is
    /// reinforced with the deal-quality reward of the realized price.
    pub fn record_feedback(&mut self, receipt: &TradeReceipt, satisfaction: f64) {
        self.contextual
            .update(&receipt.seller, &receipt.context, satisfaction);
        self.arms.update_reward(&receipt.seller, satisfaction);

        let reward = Negotiator::outcome_reward(receipt.price, receipt.market_price, true);
        let state = BargainState::derive(
            &receipt.service,
            receipt.price,
            receipt.market_price,
            receipt.reputation,
            0.5,
        );
        self.negotiator
            .update_q(&state, Action::Accept, reward, None);
    }

    /// Penalize a counterparty after a failed or unsatisfactory trade
    pub fn record_failure(&mut self, seller: &AgentId, context: &Context, penalty: f64) {
        self.contextual.update(seller, context, penalty);
        self.arms.update_reward(seller, penalty);
    }

    /// Combined read-only stats snapshot
    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            ledger: self.ledger.stats().await,
            arms: self.arms.stats(),
            negotiator: self.negotiator.stats(),
        }
    }
}

/// Fraction of the UTC day elapsed, in [0, 1)
fn time_of_day() -> f64 {
    Utc::now().time().num_seconds_from_midnight() as f64 / 86_400.0
}
