//! Treasury engine: committee-gated issuance and withdrawal
//!
//! [`Treasury`] ties the access guard, both proposal registries, the
//! execution lock, the ledger and the audit log together behind a `&self`
//! API. Registry state sits behind a mutex that is never held across the
//! withdrawal transfer callout, so recipient code may call back in; such
//! calls find the execution lock taken and any nested execution fails with
//! `ReentrantCall`.
//!
//! Audit events for proposal creation, approval and issuance execution are
//! recorded while the registry mutex is held, so the log order matches the
//! order of state changes.
//!
//! Every rejected call leaves registry state as it found it, with one
//! exception: once a withdrawal transfer has been attempted the proposal
//! stays executed even if the transfer fails.

use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use types::ids::{AccountId, IssuanceId, WithdrawalId};

use crate::audit::{AuditLog, MemoryAuditLog};
use crate::config::TreasuryConfig;
use crate::deposit::DepositConverter;
use crate::errors::{ConfigError, DepositError, ProposalError};
use crate::events::{
    ContractEvent, Deposited, IssuanceApproved, IssuanceExecuted, IssuanceRequested,
    WithdrawalApproved, WithdrawalExecuted, WithdrawalFailed, WithdrawalRequested,
};
use crate::issuance::{IssuanceProposal, IssuanceRegistry};
use crate::ledger::Ledger;
use crate::security::{AccessGuard, ExecutionGuard, ExecutionLock};
use crate::withdrawal::{WithdrawalOrder, WithdrawalProposal, WithdrawalRegistry};

/// Result of a successful withdrawal approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    /// Approval recorded, threshold not yet met
    Pending { approvals: usize },
    /// Threshold met and the value transferred
    Executed,
}

/// Registry state guarded by the treasury mutex.
#[derive(Debug)]
struct Registries {
    issuance: IssuanceRegistry,
    withdrawal: WithdrawalRegistry,
}

/// A withdrawal marked executed and waiting for its transfer. Holds the
/// execution lock until dropped.
struct PendingTransfer<'a> {
    _guard: ExecutionGuard<'a>,
    proposal_id: WithdrawalId,
    order: WithdrawalOrder,
}

/// Threshold authorization engine over a ledger.
pub struct Treasury<L: Ledger, A: AuditLog = MemoryAuditLog> {
    access: AccessGuard,
    registries: Mutex<Registries>,
    execution_lock: ExecutionLock,
    deposits: DepositConverter,
    ledger: L,
    audit: A,
}

impl<L: Ledger, A: AuditLog> Treasury<L, A> {
    /// Create a treasury from a validated configuration.
    pub fn new(config: TreasuryConfig, ledger: L, audit: A) -> Result<Self, ConfigError> {
        let withdrawal = match config.withdrawal_salt {
            Some(salt) => WithdrawalRegistry::new(salt),
            None => WithdrawalRegistry::with_random_salt(),
        };
        Self::with_registries(config, IssuanceRegistry::new(), withdrawal, ledger, audit)
    }

    fn with_registries(
        config: TreasuryConfig,
        issuance: IssuanceRegistry,
        withdrawal: WithdrawalRegistry,
        ledger: L,
        audit: A,
    ) -> Result<Self, ConfigError> {
        let access = AccessGuard::new(&config.committee)?;
        let deposits = DepositConverter::new(config.deposit_rate)?;

        info!(
            committee_size = access.members().len(),
            deposit_rate = %deposits.rate(),
            "Treasury initialized"
        );

        Ok(Self {
            access,
            registries: Mutex::new(Registries {
                issuance,
                withdrawal,
            }),
            execution_lock: ExecutionLock::new(),
            deposits,
            ledger,
            audit,
        })
    }

    // ───────────────────────── Access ─────────────────────────

    pub fn is_authorized(&self, caller: &AccountId) -> bool {
        self.access.is_authorized(caller)
    }

    pub fn committee(&self) -> &[AccountId] {
        self.access.members()
    }

    // ───────────────────────── Issuance ─────────────────────────

    /// Propose minting `amount` units to `beneficiary`.
    pub fn propose_issuance(
        &self,
        caller: &AccountId,
        beneficiary: AccountId,
        amount: Decimal,
    ) -> Result<IssuanceId, ProposalError> {
        let mut registries = self.registries();
        let proposal = registries
            .issuance
            .propose(&self.access, caller, beneficiary, amount)
            .map_err(|err| rejected("propose_issuance", caller, err))?;
        let proposal_id = proposal.id;

        info!(%proposal_id, proposer = %caller, %beneficiary, %amount, "Issuance proposed");
        self.audit.record(ContractEvent::IssuanceRequested(IssuanceRequested {
            proposal_id,
            proposer: *caller,
            beneficiary,
            amount,
        }));
        Ok(proposal_id)
    }

    /// Approve an issuance proposal. Returns the approval count.
    pub fn approve_issuance(
        &self,
        caller: &AccountId,
        proposal_id: &IssuanceId,
    ) -> Result<usize, ProposalError> {
        let mut registries = self.registries();
        let proposal = registries
            .issuance
            .approve(&self.access, caller, proposal_id)
            .map_err(|err| rejected("approve_issuance", caller, err))?;
        let approvals = proposal.approval_count();
        let amount = proposal.payload.amount;

        let executed = if registries.issuance.policy().triggers_execution(approvals) {
            match self.run_issuance(&mut registries, caller, proposal_id) {
                Ok(executed) => Some(executed),
                Err(err) => {
                    registries.issuance.retract(caller, proposal_id);
                    return Err(err);
                }
            }
        } else {
            None
        };

        debug!(%proposal_id, approver = %caller, approvals, "Issuance approved");
        self.audit.record(ContractEvent::IssuanceApproved(IssuanceApproved {
            proposal_id: *proposal_id,
            approver: *caller,
            amount,
            approvals,
        }));
        if let Some(executed) = executed {
            self.audit.record(ContractEvent::IssuanceExecuted(executed));
        }
        Ok(approvals)
    }

    /// Execute a fully approved issuance proposal.
    pub fn execute_issuance(
        &self,
        caller: &AccountId,
        proposal_id: &IssuanceId,
    ) -> Result<(), ProposalError> {
        let mut registries = self.registries();
        let executed = self.run_issuance(&mut registries, caller, proposal_id)?;
        self.audit.record(ContractEvent::IssuanceExecuted(executed));
        Ok(())
    }

    fn run_issuance(
        &self,
        registries: &mut Registries,
        caller: &AccountId,
        proposal_id: &IssuanceId,
    ) -> Result<IssuanceExecuted, ProposalError> {
        let proposal = registries
            .issuance
            .execute(&self.access, caller, proposal_id, &self.ledger)
            .map_err(|err| rejected("execute_issuance", caller, err))?;

        Ok(IssuanceExecuted {
            proposal_id: *proposal_id,
            executor: *caller,
            beneficiary: proposal.payload.beneficiary,
            amount: proposal.payload.amount,
        })
    }

    // ───────────────────────── Withdrawal ─────────────────────────

    /// Request a withdrawal of `amount` from custody to `recipient`.
    pub fn request_withdrawal(
        &self,
        caller: &AccountId,
        recipient: AccountId,
        amount: Decimal,
    ) -> Result<WithdrawalId, ProposalError> {
        let mut registries = self.registries();
        let custody = self.ledger.custody_balance();
        let proposal = registries
            .withdrawal
            .request(&self.access, caller, recipient, amount, custody)
            .map_err(|err| rejected("request_withdrawal", caller, err))?;
        let proposal_id = proposal.id;
        let approvals = proposal.approval_count();

        // Only reachable with a threshold of one.
        let transfer = if registries.withdrawal.policy().triggers_execution(approvals) {
            match self.begin_withdrawal(&mut registries, &proposal_id) {
                Ok(transfer) => Some(transfer),
                Err(err) => {
                    registries.withdrawal.discard(&proposal_id);
                    return Err(rejected("request_withdrawal", caller, err));
                }
            }
        } else {
            None
        };

        info!(%proposal_id, requester = %caller, %recipient, %amount, "Withdrawal requested");
        self.audit.record(ContractEvent::WithdrawalRequested(WithdrawalRequested {
            proposal_id,
            requester: *caller,
            recipient,
            amount,
        }));
        drop(registries);

        if let Some(transfer) = transfer {
            self.complete_withdrawal(caller, transfer)?;
        }
        Ok(proposal_id)
    }

    /// Approve a withdrawal proposal, executing it when this approval
    /// reaches the threshold.
    pub fn approve_withdrawal(
        &self,
        caller: &AccountId,
        proposal_id: &WithdrawalId,
    ) -> Result<WithdrawalOutcome, ProposalError> {
        let mut registries = self.registries();
        let proposal = registries
            .withdrawal
            .approve(&self.access, caller, proposal_id)
            .map_err(|err| rejected("approve_withdrawal", caller, err))?;
        let approvals = proposal.approval_count();
        let order = proposal.payload;

        let transfer = if registries.withdrawal.policy().triggers_execution(approvals) {
            match self.begin_withdrawal(&mut registries, proposal_id) {
                Ok(transfer) => Some(transfer),
                Err(err) => {
                    registries.withdrawal.retract(caller, proposal_id);
                    return Err(rejected("approve_withdrawal", caller, err));
                }
            }
        } else {
            None
        };

        debug!(%proposal_id, approver = %caller, approvals, "Withdrawal approved");
        self.audit.record(ContractEvent::WithdrawalApproved(WithdrawalApproved {
            proposal_id: *proposal_id,
            approver: *caller,
            recipient: order.recipient,
            amount: order.amount,
            approvals,
        }));
        drop(registries);

        match transfer {
            Some(transfer) => {
                self.complete_withdrawal(caller, transfer)?;
                Ok(WithdrawalOutcome::Executed)
            }
            None => Ok(WithdrawalOutcome::Pending { approvals }),
        }
    }

    /// First half of a withdrawal execution: take the execution lock,
    /// re-verify the proposal against current custody and mark it executed.
    fn begin_withdrawal(
        &self,
        registries: &mut Registries,
        proposal_id: &WithdrawalId,
    ) -> Result<PendingTransfer<'_>, ProposalError> {
        let guard = self.execution_lock.acquire()?;
        let order = registries
            .withdrawal
            .begin_execution(proposal_id, self.ledger.custody_balance())?;

        Ok(PendingTransfer {
            _guard: guard,
            proposal_id: *proposal_id,
            order,
        })
    }

    /// Second half: the transfer callout. Runs without the registry mutex
    /// and releases the execution lock when it returns.
    fn complete_withdrawal(
        &self,
        executor: &AccountId,
        transfer: PendingTransfer<'_>,
    ) -> Result<(), ProposalError> {
        let PendingTransfer {
            _guard,
            proposal_id,
            order,
        } = transfer;

        if !self.ledger.transfer_out(&order.recipient, order.amount) {
            warn!(
                %proposal_id,
                recipient = %order.recipient,
                amount = %order.amount,
                "Withdrawal transfer failed; proposal is spent"
            );
            self.audit.record(ContractEvent::WithdrawalFailed(WithdrawalFailed {
                proposal_id,
                executor: *executor,
                recipient: order.recipient,
                amount: order.amount,
            }));
            return Err(ProposalError::TransferFailed);
        }

        info!(
            %proposal_id,
            recipient = %order.recipient,
            amount = %order.amount,
            "Withdrawal executed"
        );
        self.audit.record(ContractEvent::WithdrawalExecuted(WithdrawalExecuted {
            proposal_id,
            executor: *executor,
            recipient: order.recipient,
            amount: order.amount,
        }));
        Ok(())
    }

    // ───────────────────────── Deposits ─────────────────────────

    /// Take `value` into custody and credit `account` at the fixed rate.
    pub fn deposit(&self, account: &AccountId, value: Decimal) -> Result<Decimal, DepositError> {
        let units = self.deposits.deposit(&self.ledger, account, value)?;

        debug!(%account, %value, %units, "Deposit converted");
        self.audit.record(ContractEvent::Deposited(Deposited {
            account_id: *account,
            value,
            units,
        }));
        Ok(units)
    }

    pub fn deposit_rate(&self) -> Decimal {
        self.deposits.rate()
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn issuance(&self, proposal_id: &IssuanceId) -> Option<IssuanceProposal> {
        self.registries().issuance.get(proposal_id).cloned()
    }

    pub fn withdrawal(&self, proposal_id: &WithdrawalId) -> Option<WithdrawalProposal> {
        self.registries().withdrawal.get(proposal_id).cloned()
    }

    pub fn pending_issuances(&self) -> Vec<IssuanceProposal> {
        self.registries().issuance.pending().cloned().collect()
    }

    pub fn pending_withdrawals(&self) -> Vec<WithdrawalProposal> {
        self.registries().withdrawal.pending().cloned().collect()
    }

    /// True while a withdrawal transfer is in flight.
    pub fn is_executing(&self) -> bool {
        self.execution_lock.is_locked()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    fn registries(&self) -> MutexGuard<'_, Registries> {
        self.registries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Log a rejected call and hand the error back.
fn rejected(operation: &'static str, caller: &AccountId, err: ProposalError) -> ProposalError {
    match err {
        ProposalError::Unauthorized | ProposalError::ReentrantCall => {
            warn!(operation, %caller, error = %err, "Call rejected");
        }
        _ => debug!(operation, %caller, error = %err, "Call rejected"),
    }
    err
}
