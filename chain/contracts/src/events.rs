//! Contract events
//!
//! Every proposal lifecycle transition produces exactly one event. Events
//! are immutable records handed to the audit log.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{AccountId, IssuanceId, WithdrawalId};
use types::proposal::ProposalKind;

/// Issuance proposal created; the proposer's approval is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRequested {
    pub proposal_id: IssuanceId,
    pub proposer: AccountId,
    pub beneficiary: AccountId,
    pub amount: Decimal,
}

/// A further committee member approved an issuance proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceApproved {
    pub proposal_id: IssuanceId,
    pub approver: AccountId,
    pub amount: Decimal,
    pub approvals: usize,
}

/// Units credited to the beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceExecuted {
    pub proposal_id: IssuanceId,
    pub executor: AccountId,
    pub beneficiary: AccountId,
    pub amount: Decimal,
}

/// Withdrawal proposal created; the requester's approval is implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequested {
    pub proposal_id: WithdrawalId,
    pub requester: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
}

/// A further committee member approved a withdrawal proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalApproved {
    pub proposal_id: WithdrawalId,
    pub approver: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
    pub approvals: usize,
}

/// Value transferred out of custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalExecuted {
    pub proposal_id: WithdrawalId,
    pub executor: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
}

/// The transfer callout reported failure. The proposal stays executed
/// and can never pay out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalFailed {
    pub proposal_id: WithdrawalId,
    pub executor: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
}

/// External value converted into units at the fixed deposit rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub account_id: AccountId,
    pub value: Decimal,
    pub units: Decimal,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    IssuanceRequested(IssuanceRequested),
    IssuanceApproved(IssuanceApproved),
    IssuanceExecuted(IssuanceExecuted),
    WithdrawalRequested(WithdrawalRequested),
    WithdrawalApproved(WithdrawalApproved),
    WithdrawalExecuted(WithdrawalExecuted),
    WithdrawalFailed(WithdrawalFailed),
    Deposited(Deposited),
}

impl ContractEvent {
    /// Proposal kind the event belongs to, `None` for deposits.
    pub fn proposal_kind(&self) -> Option<ProposalKind> {
        match self {
            ContractEvent::IssuanceRequested(_)
            | ContractEvent::IssuanceApproved(_)
            | ContractEvent::IssuanceExecuted(_) => Some(ProposalKind::Issuance),
            ContractEvent::WithdrawalRequested(_)
            | ContractEvent::WithdrawalApproved(_)
            | ContractEvent::WithdrawalExecuted(_)
            | ContractEvent::WithdrawalFailed(_) => Some(ProposalKind::Withdrawal),
            ContractEvent::Deposited(_) => None,
        }
    }

    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ContractEvent::IssuanceRequested(_) => "issuance_requested",
            ContractEvent::IssuanceApproved(_) => "issuance_approved",
            ContractEvent::IssuanceExecuted(_) => "issuance_executed",
            ContractEvent::WithdrawalRequested(_) => "withdrawal_requested",
            ContractEvent::WithdrawalApproved(_) => "withdrawal_approved",
            ContractEvent::WithdrawalExecuted(_) => "withdrawal_executed",
            ContractEvent::WithdrawalFailed(_) => "withdrawal_failed",
            ContractEvent::Deposited(_) => "deposited",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuance_requested_serialization() {
        let event = IssuanceRequested {
            proposal_id: IssuanceId::FIRST,
            proposer: AccountId::new(),
            beneficiary: AccountId::new(),
            amount: Decimal::from(500),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deser: IssuanceRequested = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_withdrawal_event_carries_hex_id() {
        let event = ContractEvent::WithdrawalRequested(WithdrawalRequested {
            proposal_id: WithdrawalId::from_bytes([7u8; 32]),
            requester: AccountId::new(),
            recipient: AccountId::new(),
            amount: Decimal::new(1, 1), // 0.1
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(&"07".repeat(32)));
        let deser: ContractEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_event_kind_and_label() {
        let event = ContractEvent::Deposited(Deposited {
            account_id: AccountId::new(),
            value: Decimal::ONE,
            units: Decimal::from(1000),
        });
        assert_eq!(event.proposal_kind(), None);
        assert_eq!(event.label(), "deposited");

        let event = ContractEvent::IssuanceExecuted(IssuanceExecuted {
            proposal_id: IssuanceId::FIRST,
            executor: AccountId::new(),
            beneficiary: AccountId::new(),
            amount: Decimal::from(500),
        });
        assert_eq!(event.proposal_kind(), Some(ProposalKind::Issuance));
    }
}
