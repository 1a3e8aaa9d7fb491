//! Treasury configuration
//!
//! The committee and the deposit rate are fixed for the lifetime of a
//! treasury. Approval thresholds are not configurable; see
//! [`ISSUANCE_POLICY`](crate::issuance::ISSUANCE_POLICY) and
//! [`WITHDRAWAL_POLICY`](crate::withdrawal::WITHDRAWAL_POLICY).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::AccountId;

use crate::deposit::{DepositConverter, DEFAULT_DEPOSIT_RATE};
use crate::errors::ConfigError;
use crate::security::AccessGuard;

/// Construction parameters for a [`Treasury`](crate::engine::Treasury).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Exactly three distinct approvers
    pub committee: Vec<AccountId>,
    /// Units credited per unit of deposited value
    #[serde(default = "default_deposit_rate")]
    pub deposit_rate: Decimal,
    /// Salt for withdrawal id derivation; drawn at random when absent
    #[serde(default)]
    pub withdrawal_salt: Option<[u8; 32]>,
}

fn default_deposit_rate() -> Decimal {
    DEFAULT_DEPOSIT_RATE
}

impl TreasuryConfig {
    pub fn new(committee: [AccountId; 3]) -> Self {
        Self {
            committee: committee.to_vec(),
            deposit_rate: DEFAULT_DEPOSIT_RATE,
            withdrawal_salt: None,
        }
    }

    pub fn with_deposit_rate(mut self, rate: Decimal) -> Self {
        self.deposit_rate = rate;
        self
    }

    /// Fix the withdrawal id salt, making ids reproducible.
    pub fn with_withdrawal_salt(mut self, salt: [u8; 32]) -> Self {
        self.withdrawal_salt = Some(salt);
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        AccessGuard::new(&self.committee)?;
        DepositConverter::new(self.deposit_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> [AccountId; 3] {
        [AccountId::new(), AccountId::new(), AccountId::new()]
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = TreasuryConfig::new(members());
        assert_eq!(config.deposit_rate, Decimal::from(1000));
        assert!(config.withdrawal_salt.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let [a, b, c] = members();
        let json = format!(
            r#"{{"committee": ["{a}", "{b}", "{c}"], "deposit_rate": "250"}}"#
        );
        let config = TreasuryConfig::from_json(&json).unwrap();
        assert_eq!(config.committee, vec![a, b, c]);
        assert_eq!(config.deposit_rate, Decimal::from(250));
    }

    #[test]
    fn test_from_json_rejects_short_committee() {
        let [a, b, _] = members();
        let json = format!(r#"{{"committee": ["{a}", "{b}"]}}"#);
        assert_eq!(
            TreasuryConfig::from_json(&json),
            Err(ConfigError::CommitteeSize {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            TreasuryConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_rate() {
        let config = TreasuryConfig::new(members()).with_deposit_rate(Decimal::from(-1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate { .. })
        ));
    }
}
