//! Agora Bandit - Online counterparty selection
//!
//! Which agent is the best counterparty for a request is unknown a priori
//! and must be learned from observed outcomes. This crate provides the two
//! selector families of the marketplace core:
//!
//! - [`ArmSelector`]: context-free multi-armed bandit over per-arm
//!   statistics, with epsilon-greedy, UCB1, and posterior-sampling policies
//! - [`ContextualSelector`]: linear contextual bandit that predicts reward
//!   as a dot product over a fixed 4-dimensional [`Context`] and learns its
//!   per-arm weights by online stochastic gradient descent
//!
//! Both selectors own their RNG (a seedable `StdRng`), lazily register
//! unseen arms, and apply reward updates immediately: a reward fed back via
//! `update_reward`/`update` is reflected in the very next selection call.
//! Rewards are opaque bounded reals supplied by the orchestration layer;
//! the selectors never assume a generating distribution.

pub mod context;
pub mod contextual;
pub mod selector;

pub use context::{Context, CONTEXT_DIM};
pub use contextual::ContextualSelector;
pub use selector::ArmSelector;
