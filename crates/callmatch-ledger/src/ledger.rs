//! The balance ledger contract.
//!
//! Business outcomes keep the boolean shape: `Ok(false)` means the request
//! was refused and nothing changed. `Err` is reserved for bad arguments
//! (negative amounts, an underflowing log delta, overflow) and storage
//! failures.

use async_trait::async_trait;
use callmatch_types::{
    Asset, Balance, BalanceLogEntry, CallmatchError, LedgerTxType, Result, UserId,
};
use rust_decimal::Decimal;

/// The three balance movements of one settled order.
///
/// `release` leaves `locked` for `free`, then `debit` leaves `free` and
/// `credit` arrives in `free`, both as `TRADE` log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementLegs {
    pub release_asset: Asset,
    pub release: Decimal,
    pub debit_asset: Asset,
    pub debit: Decimal,
    pub credit_asset: Asset,
    pub credit: Decimal,
}

impl SettlementLegs {
    /// # Errors
    /// [`CallmatchError::InvalidAmount`] for the first leg that is not positive.
    pub fn validate(&self) -> Result<()> {
        for amount in [self.release, self.debit, self.credit] {
            if amount <= Decimal::ZERO {
                return Err(CallmatchError::InvalidAmount(amount));
            }
        }
        Ok(())
    }
}

/// Per-(user, asset) balances with `total == free + locked` after every
/// operation.
///
/// Implementations serialize each operation per row: concurrent calls on
/// the same `(user, asset)` must never lose an update.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Move `amount` from free to locked.
    ///
    /// `Ok(false)` if the row does not exist or `free < amount`.
    async fn lock_balance(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool>;

    /// Move `amount` from locked back to free.
    ///
    /// `Ok(false)` if the row does not exist or `locked < amount`.
    async fn release_balance(&self, user: &UserId, amount: Decimal, asset: Asset)
    -> Result<bool>;

    /// Apply a signed delta to `total` and `free` and append a log entry.
    ///
    /// Creates the row on first credit. This and [`withdraw`](Self::withdraw)
    /// are the only ways `total` changes.
    async fn log(
        &self,
        user: &UserId,
        delta: Decimal,
        tx_type: LedgerTxType,
        asset: Asset,
    ) -> Result<BalanceLogEntry>;

    /// Apply all three [`SettlementLegs`] for `user` as one row transaction.
    ///
    /// No other operation on the user's rows can run between the legs.
    /// `Ok(false)` if the release is refused (no row, or `locked < release`);
    /// [`CallmatchError::BalanceUnderflow`] if `free` cannot cover the debit
    /// after the release. Either way nothing changes.
    async fn settle_fill(&self, user: &UserId, legs: &SettlementLegs) -> Result<bool>;

    /// Debit `amount` from `total` and `free`, logging a `WITHDRAWAL`.
    ///
    /// `Ok(false)` if `free < amount`.
    async fn withdraw(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool>;

    /// Current balance row, `None` if never credited.
    async fn balance(&self, user: &UserId, asset: Asset) -> Result<Option<Balance>>;

    /// Every row the user owns, in [`Asset::ALL`] order.
    async fn balances(&self, user: &UserId) -> Result<Vec<(Asset, Balance)>>;
}
