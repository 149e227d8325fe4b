//! Supply conservation invariant checker.
//!
//! ```text
//! ∀ asset: Σ total == Σ deposits − Σ withdrawals ± Σ fees
//! ```
//!
//! `TRADE` deltas move value between counterparties and net to zero, so
//! they never enter the expected figure. If the check fails, some
//! settlement credited one side without debiting the other.

use std::collections::HashMap;

use callmatch_types::numeric::checked_add;
use callmatch_types::{Asset, BalanceLogEntry, CallmatchError, LedgerTxType, Result};
use rust_decimal::Decimal;

/// Per-asset external flows, folded from the balance log.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    deposits: HashMap<Asset, Decimal>,
    withdrawals: HashMap<Asset, Decimal>,
    fees: HashMap<Asset, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole log.
    ///
    /// # Errors
    /// [`CallmatchError::ArithmeticOverflow`] if a running sum does not fit.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a BalanceLogEntry>) -> Result<Self> {
        let mut sc = Self::new();
        for entry in entries {
            sc.record(entry)?;
        }
        Ok(sc)
    }

    /// Account for one log entry.
    ///
    /// # Errors
    /// [`CallmatchError::ArithmeticOverflow`] if the bucket would overflow;
    /// the bucket is left unchanged.
    pub fn record(&mut self, entry: &BalanceLogEntry) -> Result<()> {
        let (bucket, amount) = match entry.tx_type {
            LedgerTxType::Deposit => (&mut self.deposits, entry.delta),
            // Stored as positive outflow.
            LedgerTxType::Withdrawal => (&mut self.withdrawals, -entry.delta),
            LedgerTxType::Fee => (&mut self.fees, entry.delta),
            LedgerTxType::Trade => return Ok(()),
        };
        let sum = bucket.entry(entry.asset).or_default();
        *sum = checked_add(*sum, amount)?;
        Ok(())
    }

    /// Expected Σ total for `asset`.
    ///
    /// # Errors
    /// [`CallmatchError::ArithmeticOverflow`] if the net figure does not fit.
    pub fn expected_supply(&self, asset: Asset) -> Result<Decimal> {
        checked_add(
            self.total_deposits(asset),
            checked_add(self.net_fees(asset), -self.total_withdrawals(asset))?,
        )
    }

    /// # Errors
    /// Returns [`CallmatchError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: Asset, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset)?;
        if actual_supply != expected {
            return Err(CallmatchError::SupplyInvariantViolation {
                reason: format!(
                    "{asset}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={}, fees={})",
                    self.total_deposits(asset),
                    self.total_withdrawals(asset),
                    self.net_fees(asset),
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_deposits(&self, asset: Asset) -> Decimal {
        self.deposits.get(&asset).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: Asset) -> Decimal {
        self.withdrawals.get(&asset).copied().unwrap_or_default()
    }

    /// Signed sum of `FEE` deltas.
    #[must_use]
    pub fn net_fees(&self, asset: Asset) -> Decimal {
        self.fees.get(&asset).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use callmatch_types::UserId;
    use chrono::Utc;

    use super::*;

    fn entry(delta: i64, tx_type: LedgerTxType, asset: Asset) -> BalanceLogEntry {
        BalanceLogEntry {
            id: 0,
            user_id: UserId::from("u"),
            asset,
            delta: Decimal::new(delta, 0),
            tx_type,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(Asset::Base).unwrap(), Decimal::ZERO);
        assert!(sc.verify(Asset::Base, Decimal::ZERO).is_ok());
    }

    #[test]
    fn flows_fold_into_expected_supply() {
        let sc = SupplyConservation::from_entries(&[
            entry(1000, LedgerTxType::Deposit, Asset::Quote),
            entry(500, LedgerTxType::Deposit, Asset::Quote),
            entry(-300, LedgerTxType::Withdrawal, Asset::Quote),
            entry(-2, LedgerTxType::Fee, Asset::Quote),
            entry(-700, LedgerTxType::Trade, Asset::Quote),
        ])
        .unwrap();
        assert_eq!(sc.total_deposits(Asset::Quote), Decimal::new(1500, 0));
        assert_eq!(sc.total_withdrawals(Asset::Quote), Decimal::new(300, 0));
        assert_eq!(sc.expected_supply(Asset::Quote).unwrap(), Decimal::new(1198, 0));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let sc = SupplyConservation::from_entries(&[entry(10, LedgerTxType::Deposit, Asset::Base)])
            .unwrap();
        let err = sc.verify(Asset::Base, Decimal::new(11, 0)).unwrap_err();
        assert!(matches!(err, CallmatchError::SupplyInvariantViolation { .. }));
        assert!(err.to_string().contains("BASE"));
    }

    #[test]
    fn assets_are_independent() {
        let sc = SupplyConservation::from_entries(&[
            entry(5, LedgerTxType::Deposit, Asset::Base),
            entry(50_000, LedgerTxType::Deposit, Asset::Quote),
        ])
        .unwrap();
        assert!(sc.verify(Asset::Base, Decimal::new(5, 0)).is_ok());
        assert!(sc.verify(Asset::Quote, Decimal::new(50_000, 0)).is_ok());
        assert!(sc.verify(Asset::Gas, Decimal::ZERO).is_ok());
    }

    #[test]
    fn overflowing_deposits_are_an_error() {
        let mut sc = SupplyConservation::new();
        let mut big = entry(1, LedgerTxType::Deposit, Asset::Quote);
        big.delta = Decimal::MAX;
        sc.record(&big).unwrap();
        let err = sc.record(&entry(1, LedgerTxType::Deposit, Asset::Quote)).unwrap_err();
        assert!(matches!(err, CallmatchError::ArithmeticOverflow(_)));
        assert_eq!(sc.total_deposits(Asset::Quote), Decimal::MAX);
    }
}
