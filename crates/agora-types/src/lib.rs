//! Agora Types - Canonical domain types for the agent marketplace
//!
//! This crate contains all foundational types for Agora with zero dependencies
//! on other agora crates. It defines:
//!
//! - Identity types (AgentId, TransactionId, LockId)
//! - The integer token `Amount` with overflow-checked arithmetic
//! - The immutable `Transaction` record
//! - Agent capability and attribute types
//! - Read-only stats snapshot types for introspection
//!
//! # Architectural Invariants
//!
//! These types support the core Agora invariants:
//!
//! 1. Balances never go negative
//! 2. Total supply (free + escrowed) is conserved outside account creation
//! 3. Transaction records are append-only and never mutated
//! 4. Learning components accept rewards as opaque bounded reals

pub mod amount;
pub mod catalog;
pub mod identity;
pub mod stats;
pub mod transaction;

pub use amount::*;
pub use catalog::*;
pub use identity::*;
pub use stats::*;
pub use transaction::*;

/// Version of the Agora types schema
pub const TYPES_VERSION: &str = "0.1.0";
