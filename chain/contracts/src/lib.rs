//! Threshold authorization engine for a committee-run treasury
//!
//! A fixed committee of three approvers guards two restricted operations:
//! minting units to a beneficiary and paying value out of custody. Each
//! runs through its own proposal registry with its own threshold and
//! execution rule. Deposits need no approval and convert value into units
//! at a fixed rate.
//!
//! # Modules
//! - `engine`: [`Treasury`], the entry point tying everything together
//! - `issuance`: 3-of-3 mint proposals with an explicit execute step
//! - `withdrawal`: 2-of-3 custody withdrawals executed on the threshold approval
//! - `proposal`: approval bookkeeping shared by both registries
//! - `security`: committee access guard and the execution lock
//! - `ledger`: the balance/custody collaborator and an in-memory implementation
//! - `deposit`: fixed-rate deposit conversion
//! - `audit`: append-only event sink
//! - `events`: lifecycle events handed to the audit log
//! - `config`: construction parameters
//! - `errors`: error types per concern

pub mod audit;
pub mod config;
pub mod deposit;
pub mod engine;
pub mod errors;
pub mod events;
pub mod issuance;
pub mod ledger;
pub mod proposal;
pub mod security;
pub mod withdrawal;

pub use engine::{Treasury, WithdrawalOutcome};
