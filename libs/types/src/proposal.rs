//! Proposal lifecycle types
//!
//! Both proposal kinds move through the same states:
//! created with the proposer's approval, pending while approvals
//! accumulate, executed once (terminal). There is no cancelled or
//! expired state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which guarded operation a proposal authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalKind {
    /// Creation of new units credited to a beneficiary
    Issuance,
    /// Transfer of held value to an external recipient
    Withdrawal,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalKind::Issuance => f.write_str("issuance"),
            ProposalKind::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// Proposal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProposalStatus {
    /// Awaiting approvals or an explicit execute call
    Pending,
    /// Terminal: the guarded operation has been carried out
    Executed,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!ProposalStatus::Pending.is_terminal());
        assert!(ProposalStatus::Executed.is_terminal());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ProposalKind::Withdrawal).unwrap();
        assert_eq!(json, "\"WITHDRAWAL\"");
        assert_eq!(ProposalKind::Issuance.to_string(), "issuance");
    }
}
