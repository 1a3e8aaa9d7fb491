//! Issuance Registry: propose, approve, execute restricted mints
//!
//! Creating units is the more dangerous of the two guarded operations, so
//! issuance needs every committee member and a separate execute call:
//! `propose (1 approval) → approve → approve (3) → execute`

use rust_decimal::Decimal;
use tracing::{debug, info};
use types::ids::{AccountId, IssuanceId};

use crate::errors::ProposalError;
use crate::ledger::Ledger;
use crate::proposal::{ApprovalPolicy, Proposal, ProposalBook};
use crate::security::{AccessGuard, COMMITTEE_SIZE};

/// Issuance needs the whole committee and an explicit execute call.
pub const ISSUANCE_POLICY: ApprovalPolicy = ApprovalPolicy::manual(COMMITTEE_SIZE);

/// What an issuance proposal would mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuanceOrder {
    pub beneficiary: AccountId,
    pub amount: Decimal,
}

pub type IssuanceProposal = Proposal<IssuanceId, IssuanceOrder>;

/// Pending and executed issuance proposals.
#[derive(Debug, Clone)]
pub struct IssuanceRegistry {
    book: ProposalBook<IssuanceId, IssuanceOrder>,
    next_id: Option<IssuanceId>,
}

impl IssuanceRegistry {
    pub fn new() -> Self {
        Self {
            book: ProposalBook::new(ISSUANCE_POLICY),
            next_id: Some(IssuanceId::FIRST),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_policy(policy: ApprovalPolicy) -> Self {
        Self {
            book: ProposalBook::new(policy),
            next_id: Some(IssuanceId::FIRST),
        }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.book.policy()
    }

    /// Create a proposal to mint `amount` units to `beneficiary`.
    ///
    /// The proposer's approval is recorded as part of creation.
    pub fn propose(
        &mut self,
        guard: &AccessGuard,
        caller: &AccountId,
        beneficiary: AccountId,
        amount: Decimal,
    ) -> Result<&IssuanceProposal, ProposalError> {
        guard.ensure(caller)?;
        if amount <= Decimal::ZERO {
            return Err(ProposalError::InvalidAmount);
        }

        let id = self.next_id.ok_or(ProposalError::IdExhausted)?;
        self.next_id = id.next();

        debug!(proposal_id = %id, %beneficiary, %amount, "Issuance proposal allocated");
        Ok(self
            .book
            .insert(id, *caller, IssuanceOrder { beneficiary, amount }))
    }

    /// Add `caller`'s approval. Never executes.
    pub fn approve(
        &mut self,
        guard: &AccessGuard,
        caller: &AccountId,
        id: &IssuanceId,
    ) -> Result<&IssuanceProposal, ProposalError> {
        guard.ensure(caller)?;
        self.book.approve(caller, id)
    }

    /// Undo an approval whose execution was rejected in the same call.
    pub fn retract(&mut self, caller: &AccountId, id: &IssuanceId) {
        self.book.retract(caller, id);
    }

    /// Mint the proposal's units and mark it executed.
    ///
    /// The ledger is credited before the executed flag is set, so a failed
    /// credit leaves the proposal pending and unchanged.
    pub fn execute<L: Ledger + ?Sized>(
        &mut self,
        guard: &AccessGuard,
        caller: &AccountId,
        id: &IssuanceId,
        ledger: &L,
    ) -> Result<&IssuanceProposal, ProposalError> {
        guard.ensure(caller)?;
        let order = self.book.check_executable(id)?.payload;

        ledger.credit(&order.beneficiary, order.amount)?;
        let proposal = self.book.mark_executed(id)?;

        info!(
            proposal_id = %id,
            beneficiary = %order.beneficiary,
            amount = %order.amount,
            "Issuance executed"
        );
        Ok(proposal)
    }

    pub fn get(&self, id: &IssuanceId) -> Option<&IssuanceProposal> {
        self.book.get(id).ok()
    }

    /// Proposals not yet executed, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &IssuanceProposal> + '_ {
        self.book.pending()
    }

    pub fn len(&self) -> usize {
        self.book.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }
}

impl Default for IssuanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
