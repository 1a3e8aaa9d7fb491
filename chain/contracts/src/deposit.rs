//! Fixed-rate deposits
//!
//! Incoming value goes into custody and the depositor is credited
//! `value * rate` units straight away. No committee approval is involved.

use rust_decimal::Decimal;
use types::ids::AccountId;

use crate::errors::{ConfigError, DepositError};
use crate::ledger::Ledger;

/// Units credited per unit of deposited value unless configured otherwise.
pub const DEFAULT_DEPOSIT_RATE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Converts deposited value into units at a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositConverter {
    rate: Decimal,
}

impl DepositConverter {
    pub fn new(rate: Decimal) -> Result<Self, ConfigError> {
        if rate <= Decimal::ZERO {
            return Err(ConfigError::InvalidRate { rate });
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Units a deposit of `value` is worth.
    pub fn units_for(&self, value: Decimal) -> Result<Decimal, DepositError> {
        if value <= Decimal::ZERO {
            return Err(DepositError::ZeroValue);
        }
        value.checked_mul(self.rate).ok_or(DepositError::Overflow {
            value,
            rate: self.rate,
        })
    }

    /// Take `value` into custody and credit the depositor. Returns the
    /// units credited.
    pub fn deposit<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        account: &AccountId,
        value: Decimal,
    ) -> Result<Decimal, DepositError> {
        let units = self.units_for(value)?;
        ledger.accept_deposit(account, value, units)?;
        Ok(units)
    }
}

impl Default for DepositConverter {
    fn default() -> Self {
        Self {
            rate: DEFAULT_DEPOSIT_RATE,
        }
    }
}
