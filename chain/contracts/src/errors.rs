//! Contract-specific error types
//!
//! Every rejection is synchronous and visible to the caller. The engine
//! never retries on its own; a committee that wants to try again raises a
//! new proposal.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the proposal registries and the treasury engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProposalError {
    #[error("Unauthorized: caller is not a committee member")]
    Unauthorized,

    #[error("Proposal amount must be positive")]
    InvalidAmount,

    #[error("Insufficient custody balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("Proposal not found: {proposal_id}")]
    NotFound { proposal_id: String },

    #[error("Proposal already executed")]
    AlreadyExecuted,

    #[error("Approver has already approved this proposal")]
    DuplicateApproval,

    #[error("Insufficient approvals: {approvals} of {threshold}")]
    InsufficientApprovals { approvals: usize, threshold: usize },

    #[error("Reentrant call rejected: an execution is already in flight")]
    ReentrantCall,

    #[error("External transfer failed")]
    TransferFailed,

    #[error("Proposal id space exhausted")]
    IdExhausted,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors reported by a ledger implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Errors raised by the fixed-rate deposit wrapper
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DepositError {
    #[error("Deposit value must be positive")]
    ZeroValue,

    #[error("Arithmetic overflow converting {value} at rate {rate}")]
    Overflow { value: Decimal, rate: Decimal },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Treasury configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Committee must have exactly {expected} members, got {actual}")]
    CommitteeSize { expected: usize, actual: usize },

    #[error("Duplicate committee member: {member}")]
    DuplicateMember { member: String },

    #[error("Deposit rate must be positive, got {rate}")]
    InvalidRate { rate: Decimal },

    #[error("Malformed configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
