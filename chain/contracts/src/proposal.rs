//! Proposal bookkeeping shared by the issuance and withdrawal registries
//!
//! A [`ProposalBook`] stores proposals of one kind together with the
//! [`ApprovalPolicy`] that governs them. The two registries differ only in
//! payload, id allocation and policy; approval counting, duplicate
//! rejection and the executed flag live here.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use types::ids::AccountId;
use types::proposal::ProposalStatus;

use crate::errors::ProposalError;

/// Threshold and execution trigger for one proposal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Distinct approvals needed before execution
    pub threshold: usize,
    /// Execute inside the approval that reaches the threshold
    pub auto_execute_on_threshold: bool,
}

impl ApprovalPolicy {
    /// Execution needs a separate explicit call.
    pub const fn manual(threshold: usize) -> Self {
        Self {
            threshold,
            auto_execute_on_threshold: false,
        }
    }

    /// Execution happens as part of the approval that meets the threshold.
    pub const fn automatic(threshold: usize) -> Self {
        Self {
            threshold,
            auto_execute_on_threshold: true,
        }
    }

    pub fn is_met(&self, approvals: usize) -> bool {
        approvals >= self.threshold
    }

    pub fn triggers_execution(&self, approvals: usize) -> bool {
        self.auto_execute_on_threshold && self.is_met(approvals)
    }
}

/// A proposal of either kind.
///
/// `approvals` keeps approvers in arrival order; `confirmations` indexes
/// the same set for constant-time duplicate checks.
#[derive(Debug, Clone)]
pub struct Proposal<Id, P> {
    pub id: Id,
    pub proposer: AccountId,
    pub payload: P,
    approvals: Vec<AccountId>,
    confirmations: HashSet<AccountId>,
    executed: bool,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl<Id, P> Proposal<Id, P> {
    fn new(id: Id, proposer: AccountId, payload: P) -> Self {
        Self {
            id,
            proposer,
            payload,
            approvals: vec![proposer],
            confirmations: HashSet::from([proposer]),
            executed: false,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Approvers in the order their approvals were recorded.
    pub fn approvals(&self) -> &[AccountId] {
        &self.approvals
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    pub fn has_approved(&self, approver: &AccountId) -> bool {
        self.confirmations.contains(approver)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn status(&self) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else {
            ProposalStatus::Pending
        }
    }
}

/// Storage and state transitions for one proposal kind.
///
/// Proposals are never removed once created except to undo a creation
/// within the same failing call; executed proposals stay for lookups.
#[derive(Debug, Clone)]
pub struct ProposalBook<Id, P> {
    policy: ApprovalPolicy,
    proposals: HashMap<Id, Proposal<Id, P>>,
    /// Creation order
    order: Vec<Id>,
}

impl<Id, P> ProposalBook<Id, P>
where
    Id: Copy + Eq + Hash + Display,
{
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self {
            policy,
            proposals: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.proposals.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Store a new proposal with the proposer as its first approval.
    ///
    /// The caller allocates `id` and guarantees it is unused.
    pub fn insert(&mut self, id: Id, proposer: AccountId, payload: P) -> &Proposal<Id, P> {
        self.order.push(id);
        self.proposals
            .entry(id)
            .or_insert_with(|| Proposal::new(id, proposer, payload))
    }

    /// Undo an `insert` made earlier in the same call.
    pub fn remove(&mut self, id: &Id) {
        if self.proposals.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    pub fn get(&self, id: &Id) -> Result<&Proposal<Id, P>, ProposalError> {
        self.proposals.get(id).ok_or_else(|| not_found(id))
    }

    /// Record `approver`'s approval and return the updated proposal.
    pub fn approve(&mut self, approver: &AccountId, id: &Id) -> Result<&Proposal<Id, P>, ProposalError> {
        let proposal = self.proposals.get_mut(id).ok_or_else(|| not_found(id))?;
        if proposal.executed {
            return Err(ProposalError::AlreadyExecuted);
        }
        if !proposal.confirmations.insert(*approver) {
            return Err(ProposalError::DuplicateApproval);
        }
        proposal.approvals.push(*approver);
        Ok(&*proposal)
    }

    /// Undo an `approve` made earlier in the same call.
    pub fn retract(&mut self, approver: &AccountId, id: &Id) {
        if let Some(proposal) = self.proposals.get_mut(id) {
            if proposal.confirmations.remove(approver) {
                proposal.approvals.retain(|a| a != approver);
            }
        }
    }

    /// Check that a proposal exists, is pending and meets the threshold.
    pub fn check_executable(&self, id: &Id) -> Result<&Proposal<Id, P>, ProposalError> {
        let proposal = self.get(id)?;
        if proposal.executed {
            return Err(ProposalError::AlreadyExecuted);
        }
        if !self.policy.is_met(proposal.approval_count()) {
            return Err(ProposalError::InsufficientApprovals {
                approvals: proposal.approval_count(),
                threshold: self.policy.threshold,
            });
        }
        Ok(proposal)
    }

    /// Set the terminal executed flag after re-running the executable check.
    pub fn mark_executed(&mut self, id: &Id) -> Result<&Proposal<Id, P>, ProposalError> {
        self.check_executable(id)?;
        let proposal = self.proposals.get_mut(id).ok_or_else(|| not_found(id))?;
        proposal.executed = true;
        proposal.executed_at = Some(Utc::now());
        Ok(&*proposal)
    }

    /// Proposals still awaiting execution, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Proposal<Id, P>> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.proposals.get(id))
            .filter(|p| !p.executed)
    }
}

fn not_found<Id: Display>(id: &Id) -> ProposalError {
    ProposalError::NotFound {
        proposal_id: id.to_string(),
    }
}
