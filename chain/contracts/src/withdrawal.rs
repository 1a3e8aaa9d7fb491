//! Withdrawal Registry: request, approve and stage custody withdrawals
//!
//! A withdrawal needs a majority of the committee and executes inside the
//! approval that reaches it:
//! `request (1 approval) → approve (2) → transfer out`
//!
//! Proposal ids are SHA-256 digests over a per-registry salt, the
//! recipient, the amount and a private nonce that increases with every
//! request. Identical requests made at different times get different ids,
//! and nobody outside the registry can compute an id before it exists.

use rand::RngCore;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::debug;
use types::ids::{AccountId, WithdrawalId};

use crate::errors::ProposalError;
use crate::proposal::{ApprovalPolicy, Proposal, ProposalBook};
use crate::security::AccessGuard;

/// Withdrawal needs two approvals and executes on the second.
pub const WITHDRAWAL_POLICY: ApprovalPolicy = ApprovalPolicy::automatic(2);

/// Domain separator for withdrawal id derivation.
const WITHDRAWAL_ID_DOMAIN: &[u8] = b"treasury.withdrawal.v1";

/// What a withdrawal proposal would pay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalOrder {
    pub recipient: AccountId,
    pub amount: Decimal,
}

pub type WithdrawalProposal = Proposal<WithdrawalId, WithdrawalOrder>;

/// Pending and executed withdrawal proposals.
#[derive(Debug, Clone)]
pub struct WithdrawalRegistry {
    book: ProposalBook<WithdrawalId, WithdrawalOrder>,
    /// Next nonce folded into an id; never reset
    nonce: u64,
    salt: [u8; 32],
}

impl WithdrawalRegistry {
    /// Create a registry deriving ids under `salt`.
    pub fn new(salt: [u8; 32]) -> Self {
        Self {
            book: ProposalBook::new(WITHDRAWAL_POLICY),
            nonce: 0,
            salt,
        }
    }

    /// Create a registry with a salt drawn from the thread RNG.
    pub fn with_random_salt() -> Self {
        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::new(salt)
    }

    #[cfg(test)]
    pub(crate) fn with_policy(salt: [u8; 32], policy: ApprovalPolicy) -> Self {
        Self {
            book: ProposalBook::new(policy),
            nonce: 0,
            salt,
        }
    }

    pub fn policy(&self) -> ApprovalPolicy {
        self.book.policy()
    }

    /// Nonce the next request will consume.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Create a proposal to pay `amount` out of custody to `recipient`.
    ///
    /// `custody` is the ledger's custody balance at request time. The
    /// balance is checked again when the proposal executes.
    pub fn request(
        &mut self,
        guard: &AccessGuard,
        caller: &AccountId,
        recipient: AccountId,
        amount: Decimal,
        custody: Decimal,
    ) -> Result<&WithdrawalProposal, ProposalError> {
        guard.ensure(caller)?;
        if amount <= Decimal::ZERO {
            return Err(ProposalError::InvalidAmount);
        }
        if amount > custody {
            return Err(ProposalError::InsufficientBalance {
                required: amount,
                available: custody,
            });
        }

        let id = self.allocate_id(&recipient, amount)?;
        debug!(proposal_id = %id, nonce = self.nonce, "Withdrawal id derived");
        Ok(self
            .book
            .insert(id, *caller, WithdrawalOrder { recipient, amount }))
    }

    /// Add `caller`'s approval. The caller decides whether the updated
    /// count triggers execution under [`WITHDRAWAL_POLICY`].
    pub fn approve(
        &mut self,
        guard: &AccessGuard,
        caller: &AccountId,
        id: &WithdrawalId,
    ) -> Result<&WithdrawalProposal, ProposalError> {
        guard.ensure(caller)?;
        self.book.approve(caller, id)
    }

    /// Undo an approval whose execution was rejected before any transfer.
    pub fn retract(&mut self, caller: &AccountId, id: &WithdrawalId) {
        self.book.retract(caller, id);
    }

    /// Undo a request whose immediate execution was rejected.
    pub fn discard(&mut self, id: &WithdrawalId) {
        self.book.remove(id);
    }

    /// Re-verify a proposal against the current custody balance and mark
    /// it executed. Returns the order the caller must now transfer.
    ///
    /// Must run under the execution lock. Once this returns `Ok` the
    /// proposal is terminal whatever the transfer does.
    pub fn begin_execution(
        &mut self,
        id: &WithdrawalId,
        custody: Decimal,
    ) -> Result<WithdrawalOrder, ProposalError> {
        let order = self.book.check_executable(id)?.payload;
        if custody < order.amount {
            return Err(ProposalError::InsufficientBalance {
                required: order.amount,
                available: custody,
            });
        }
        self.book.mark_executed(id)?;
        Ok(order)
    }

    pub fn get(&self, id: &WithdrawalId) -> Option<&WithdrawalProposal> {
        self.book.get(id).ok()
    }

    /// Proposals not yet executed, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &WithdrawalProposal> + '_ {
        self.book.pending()
    }

    pub fn len(&self) -> usize {
        self.book.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }

    /// Consume nonces until the derived id is unused.
    fn allocate_id(
        &mut self,
        recipient: &AccountId,
        amount: Decimal,
    ) -> Result<WithdrawalId, ProposalError> {
        loop {
            let nonce = self.nonce;
            self.nonce = nonce.checked_add(1).ok_or(ProposalError::IdExhausted)?;
            let id = self.derive_id(recipient, amount, nonce);
            if !self.book.contains(&id) {
                return Ok(id);
            }
        }
    }

    /// `SHA-256(domain || salt || recipient || amount || nonce)`.
    ///
    /// The amount is normalized first so `0.10` and `0.1` hash alike.
    fn derive_id(&self, recipient: &AccountId, amount: Decimal, nonce: u64) -> WithdrawalId {
        let mut hasher = Sha256::new();
        hasher.update(WITHDRAWAL_ID_DOMAIN);
        hasher.update(self.salt);
        hasher.update(recipient.as_bytes());
        hasher.update(amount.normalize().serialize());
        hasher.update(nonce.to_be_bytes());
        WithdrawalId::from_bytes(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn setup() -> (AccessGuard, [AccountId; 3], WithdrawalRegistry) {
        let members = [AccountId::new(), AccountId::new(), AccountId::new()];
        let guard = AccessGuard::new(&members).unwrap();
        (guard, members, WithdrawalRegistry::new([9u8; 32]))
    }

    #[test]
    fn test_request_success() {
        let (guard, [a, ..], mut registry) = setup();
        let recipient = AccountId::new();

        let proposal = registry
            .request(&guard, &a, recipient, Decimal::new(1, 1), Decimal::ONE)
            .unwrap();
        assert_eq!(proposal.approvals(), &[a]);
        assert_eq!(proposal.payload.recipient, recipient);
        assert!(!proposal.is_executed());
        assert_eq!(registry.nonce(), 1);
    }

    #[test]
    fn test_request_exceeding_custody() {
        let (guard, [a, ..], mut registry) = setup();
        let result = registry.request(&guard, &a, AccountId::new(), Decimal::from(2), Decimal::ONE);
        assert_eq!(
            result.unwrap_err(),
            ProposalError::InsufficientBalance {
                required: Decimal::from(2),
                available: Decimal::ONE
            }
        );
        assert!(registry.is_empty());
        assert_eq!(registry.nonce(), 0);
    }

    #[test]
    fn test_request_invalid_amount_and_caller() {
        let (guard, [a, ..], mut registry) = setup();
        let result = registry.request(&guard, &a, AccountId::new(), Decimal::ZERO, Decimal::ONE);
        assert_eq!(result.unwrap_err(), ProposalError::InvalidAmount);

        let outsider = AccountId::new();
        let result = registry.request(&guard, &outsider, outsider, Decimal::ONE, Decimal::ONE);
        assert_eq!(result.unwrap_err(), ProposalError::Unauthorized);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identical_requests_get_distinct_ids() {
        let (guard, [a, ..], mut registry) = setup();
        let recipient = AccountId::new();
        let custody = Decimal::from(100);

        let ids: HashSet<WithdrawalId> = (0..50)
            .map(|_| {
                registry
                    .request(&guard, &a, recipient, Decimal::ONE, custody)
                    .unwrap()
                    .id
            })
            .collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(registry.nonce(), 50);
    }

    #[test]
    fn test_id_depends_on_salt() {
        let recipient = AccountId::new();
        let one = WithdrawalRegistry::new([1u8; 32]).derive_id(&recipient, Decimal::ONE, 0);
        let two = WithdrawalRegistry::new([2u8; 32]).derive_id(&recipient, Decimal::ONE, 0);
        assert_ne!(one, two);
    }

    #[test]
    fn test_id_ignores_amount_scale() {
        let registry = WithdrawalRegistry::new([0u8; 32]);
        let recipient = AccountId::new();
        assert_eq!(
            registry.derive_id(&recipient, Decimal::new(10, 2), 3),
            registry.derive_id(&recipient, Decimal::new(1, 1), 3)
        );
    }

    #[test]
    fn test_begin_execution_rechecks_custody() {
        let (guard, [a, b, _], mut registry) = setup();
        let id = registry
            .request(&guard, &a, AccountId::new(), Decimal::ONE, Decimal::ONE)
            .unwrap()
            .id;
        registry.approve(&guard, &b, &id).unwrap();

        let result = registry.begin_execution(&id, Decimal::new(5, 1));
        assert!(matches!(
            result,
            Err(ProposalError::InsufficientBalance { .. })
        ));
        assert!(!registry.get(&id).unwrap().is_executed());

        let order = registry.begin_execution(&id, Decimal::ONE).unwrap();
        assert_eq!(order.amount, Decimal::ONE);
        assert!(registry.get(&id).unwrap().is_executed());
        assert_eq!(
            registry.begin_execution(&id, Decimal::ONE).unwrap_err(),
            ProposalError::AlreadyExecuted
        );
    }

    #[test]
    fn test_begin_execution_needs_majority() {
        let (guard, [a, ..], mut registry) = setup();
        let id = registry
            .request(&guard, &a, AccountId::new(), Decimal::ONE, Decimal::ONE)
            .unwrap()
            .id;
        assert_eq!(
            registry.begin_execution(&id, Decimal::ONE).unwrap_err(),
            ProposalError::InsufficientApprovals {
                approvals: 1,
                threshold: 2
            }
        );
    }

    #[test]
    fn test_retract_and_discard() {
        let (guard, [a, b, _], mut registry) = setup();
        let id = registry
            .request(&guard, &a, AccountId::new(), Decimal::ONE, Decimal::ONE)
            .unwrap()
            .id;
        registry.approve(&guard, &b, &id).unwrap();
        registry.retract(&b, &id);
        assert_eq!(registry.get(&id).unwrap().approval_count(), 1);

        registry.discard(&id);
        assert!(registry.get(&id).is_none());
    }
}
