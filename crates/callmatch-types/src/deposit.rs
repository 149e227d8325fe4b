//! Typed deposit event.
//!
//! The chain scanner works with loosely typed RPC payloads; they are turned
//! into a [`Deposit`] before anything touches the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, CallmatchError, Result, UserId};

/// A confirmed on-chain transfer into the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    /// Transaction hash; unique per deposit.
    pub tx_hash: String,
    pub user_id: UserId,
    pub asset: Asset,
    pub amount: Decimal,
    pub block_number: u64,
}

impl Deposit {
    /// # Errors
    /// Returns [`CallmatchError::InvalidDeposit`] for an empty hash or user,
    /// or a non-positive amount.
    pub fn validate(&self) -> Result<()> {
        if self.tx_hash.trim().is_empty() {
            return Err(CallmatchError::InvalidDeposit {
                reason: "missing transaction hash".into(),
            });
        }
        if self.user_id.is_empty() {
            return Err(CallmatchError::InvalidDeposit {
                reason: "missing user id".into(),
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(CallmatchError::InvalidDeposit {
                reason: format!("amount must be positive, got {}", self.amount),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(amount: Decimal) -> Deposit {
        Deposit {
            tx_hash: "0xfeed".into(),
            user_id: UserId::from("alice"),
            asset: Asset::Quote,
            amount,
            block_number: 42,
        }
    }

    #[test]
    fn valid_deposit() {
        assert!(deposit(Decimal::ONE).validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert!(deposit(Decimal::ZERO).validate().is_err());
    }

    #[test]
    fn rejects_missing_hash() {
        let mut d = deposit(Decimal::ONE);
        d.tx_hash = String::new();
        assert!(matches!(d.validate(), Err(CallmatchError::InvalidDeposit { .. })));
    }

    #[test]
    fn parses_scanner_payload() {
        let json = r#"{"txHash":"0x1","userId":"bob","asset":"BASE","amount":"2.5","blockNumber":7}"#;
        let d: Deposit = serde_json::from_str(json).unwrap();
        assert_eq!(d.asset, Asset::Base);
        assert_eq!(d.amount, Decimal::new(25, 1));
    }
}
