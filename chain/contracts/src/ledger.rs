//! Ledger: unit balances and the custody pool
//!
//! The treasury does not keep balances itself. It drives a [`Ledger`]:
//! - `credit` mints units into an account (issuance)
//! - `custody_balance` reports the value available for withdrawal
//! - `transfer_out` pays value out of custody to an external recipient
//! - `accept_deposit` takes value into custody and credits units for it
//!
//! [`InMemoryLedger`] is the reference implementation used by tests and
//! by embedders without an external ledger.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use types::ids::AccountId;

use crate::errors::LedgerError;

/// Balance bookkeeping consumed by the treasury.
///
/// Methods take `&self`: a ledger may be shared with other components and
/// must do its own synchronization. `credit`, `custody_balance` and
/// `accept_deposit` must not call back into the treasury. `transfer_out` may run
/// recipient code that does.
pub trait Ledger: Send + Sync {
    /// Increase `account`'s unit balance by `amount`.
    fn credit(&self, account: &AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Value currently held in custody.
    fn custody_balance(&self) -> Decimal;

    /// Move `amount` out of custody to `recipient`. Returns `false` instead
    /// of panicking when the transfer cannot be made; custody is unchanged
    /// in that case.
    fn transfer_out(&self, recipient: &AccountId, amount: Decimal) -> bool;

    /// Add `value` to custody and credit `units` to `account` as one
    /// step: either both happen or neither does.
    fn accept_deposit(
        &self,
        account: &AccountId,
        value: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError>;
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn credit(&self, account: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        (**self).credit(account, amount)
    }

    fn custody_balance(&self) -> Decimal {
        (**self).custody_balance()
    }

    fn transfer_out(&self, recipient: &AccountId, amount: Decimal) -> bool {
        (**self).transfer_out(recipient, amount)
    }

    fn accept_deposit(
        &self,
        account: &AccountId,
        value: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError> {
        (**self).accept_deposit(account, value, units)
    }
}

/// Reference ledger keeping everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    /// Unit balances
    balances: HashMap<AccountId, Decimal>,
    /// Value held in custody
    custody: Decimal,
    /// Value paid out per recipient
    paid_out: HashMap<AccountId, Decimal>,
    /// Recipients whose transfers are refused
    refused: HashSet<AccountId>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger starting with `custody` already held.
    pub fn with_custody(custody: Decimal) -> Self {
        let ledger = Self::new();
        ledger.state().custody = custody;
        ledger
    }

    /// Unit balance of an account.
    pub fn balance_of(&self, account: &AccountId) -> Decimal {
        self.state()
            .balances
            .get(account)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Total value transferred out to `recipient`.
    pub fn paid_out_to(&self, recipient: &AccountId) -> Decimal {
        self.state()
            .paid_out
            .get(recipient)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all unit balances.
    pub fn total_issued(&self) -> Decimal {
        self.state().balances.values().copied().sum()
    }

    /// Add value to custody without crediting anyone, as a funding
    /// transfer from outside would.
    pub fn receive(&self, value: Decimal) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.custody = state.custody.checked_add(value).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Make every future transfer to `recipient` fail.
    pub fn refuse_transfers_to(&self, recipient: AccountId) {
        self.state().refused.insert(recipient);
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ledger for InMemoryLedger {
    fn credit(&self, account: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let mut state = self.state();
        let current = state.balances.entry(*account).or_insert(Decimal::ZERO);
        *current = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn custody_balance(&self) -> Decimal {
        self.state().custody
    }

    fn transfer_out(&self, recipient: &AccountId, amount: Decimal) -> bool {
        let mut state = self.state();
        if state.refused.contains(recipient) {
            warn!(recipient = %recipient, %amount, "Recipient refused transfer");
            return false;
        }
        if state.custody < amount {
            warn!(custody = %state.custody, %amount, "Transfer exceeds custody");
            return false;
        }

        let paid = state.paid_out.get(recipient).copied().unwrap_or(Decimal::ZERO);
        let Some(paid) = paid.checked_add(amount) else {
            return false;
        };
        state.custody -= amount;
        state.paid_out.insert(*recipient, paid);
        true
    }

    fn accept_deposit(
        &self,
        account: &AccountId,
        value: Decimal,
        units: Decimal,
    ) -> Result<(), LedgerError> {
        let mut state = self.state();
        let custody = state.custody.checked_add(value).ok_or(LedgerError::Overflow)?;
        let balance = state.balances.get(account).copied().unwrap_or(Decimal::ZERO);
        let balance = balance.checked_add(units).ok_or(LedgerError::Overflow)?;

        state.custody = custody;
        state.balances.insert(*account, balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accumulates() {
        let ledger = InMemoryLedger::new();
        let account = AccountId::new();
        ledger.credit(&account, Decimal::from(1000)).unwrap();
        ledger.credit(&account, Decimal::from(500)).unwrap();
        assert_eq!(ledger.balance_of(&account), Decimal::from(1500));
        assert_eq!(ledger.total_issued(), Decimal::from(1500));
    }

    #[test]
    fn test_credit_overflow_leaves_balance() {
        let ledger = InMemoryLedger::new();
        let account = AccountId::new();
        ledger.credit(&account, Decimal::MAX).unwrap();
        assert_eq!(
            ledger.credit(&account, Decimal::ONE),
            Err(LedgerError::Overflow)
        );
        assert_eq!(ledger.balance_of(&account), Decimal::MAX);
    }

    #[test]
    fn test_balance_empty() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.balance_of(&AccountId::new()), Decimal::ZERO);
        assert_eq!(ledger.custody_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_transfer_out_debits_custody() {
        let ledger = InMemoryLedger::with_custody(Decimal::ONE);
        let recipient = AccountId::new();
        assert!(ledger.transfer_out(&recipient, Decimal::new(1, 1)));
        assert_eq!(ledger.custody_balance(), Decimal::new(9, 1));
        assert_eq!(ledger.paid_out_to(&recipient), Decimal::new(1, 1));
    }

    #[test]
    fn test_transfer_out_insufficient_custody() {
        let ledger = InMemoryLedger::with_custody(Decimal::ONE);
        assert!(!ledger.transfer_out(&AccountId::new(), Decimal::from(2)));
        assert_eq!(ledger.custody_balance(), Decimal::ONE);
    }

    #[test]
    fn test_refused_recipient() {
        let ledger = InMemoryLedger::with_custody(Decimal::from(10));
        let recipient = AccountId::new();
        ledger.refuse_transfers_to(recipient);
        assert!(!ledger.transfer_out(&recipient, Decimal::ONE));
        assert_eq!(ledger.custody_balance(), Decimal::from(10));
        assert_eq!(ledger.paid_out_to(&recipient), Decimal::ZERO);
    }

    #[test]
    fn test_receive_grows_custody() {
        let ledger = InMemoryLedger::new();
        ledger.receive(Decimal::from(3)).unwrap();
        ledger.receive(Decimal::from(2)).unwrap();
        assert_eq!(ledger.custody_balance(), Decimal::from(5));
    }

    #[test]
    fn test_accept_deposit_is_all_or_nothing() {
        let ledger = InMemoryLedger::with_custody(Decimal::MAX);
        let account = AccountId::new();
        assert_eq!(
            ledger.accept_deposit(&account, Decimal::ONE, Decimal::from(1000)),
            Err(LedgerError::Overflow)
        );
        assert_eq!(ledger.balance_of(&account), Decimal::ZERO);

        let ledger = InMemoryLedger::new();
        ledger.credit(&account, Decimal::MAX).unwrap();
        assert_eq!(
            ledger.accept_deposit(&account, Decimal::ONE, Decimal::from(1000)),
            Err(LedgerError::Overflow)
        );
        assert_eq!(ledger.custody_balance(), Decimal::ZERO);
        assert_eq!(ledger.balance_of(&account), Decimal::MAX);
    }
}
