//! Withdrawals with a flat proportional fee.
//!
//! The ledger debits the gross amount; the receipt tells the payout step
//! how much actually leaves for the user's address.

use std::sync::Arc;

use callmatch_types::{Asset, CallmatchError, Result, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::BalanceLedger;

/// Result of an accepted withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub asset: Asset,
    /// Debited from the ledger.
    pub gross: Decimal,
    pub fee: Decimal,
    /// `gross - fee`, paid out on-chain.
    pub net: Decimal,
}

pub struct WithdrawalDesk {
    ledger: Arc<dyn BalanceLedger>,
    fee_rate: Decimal,
}

impl WithdrawalDesk {
    #[must_use]
    pub fn new(ledger: Arc<dyn BalanceLedger>, fee_rate: Decimal) -> Self {
        Self { ledger, fee_rate }
    }

    #[must_use]
    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    /// Split `amount` into fee and net without touching the ledger.
    #[must_use]
    pub fn quote(&self, asset: Asset, amount: Decimal) -> WithdrawalReceipt {
        let fee = amount * self.fee_rate;
        WithdrawalReceipt {
            asset,
            gross: amount,
            fee,
            net: amount - fee,
        }
    }

    /// Debit `amount` of `asset` from `user`.
    ///
    /// # Errors
    /// - [`CallmatchError::InvalidAmount`] if `amount <= 0`
    /// - [`CallmatchError::InsufficientBalance`] if free balance is short
    pub async fn request(
        &self,
        user: &UserId,
        amount: Decimal,
        asset: Asset,
    ) -> Result<WithdrawalReceipt> {
        if amount <= Decimal::ZERO {
            return Err(CallmatchError::InvalidAmount(amount));
        }
        if !self.ledger.withdraw(user, amount, asset).await? {
            let available = self
                .ledger
                .balance(user, asset)
                .await?
                .map_or(Decimal::ZERO, |b| b.free);
            return Err(CallmatchError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        let receipt = self.quote(asset, amount);
        tracing::info!(
            %user,
            %asset,
            gross = %receipt.gross,
            fee = %receipt.fee,
            net = %receipt.net,
            "withdrawal accepted"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use callmatch_types::LedgerTxType;

    use super::*;
    use crate::InMemoryLedger;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    async fn setup() -> (Arc<InMemoryLedger>, WithdrawalDesk, UserId) {
        let ledger = Arc::new(InMemoryLedger::new());
        let user = UserId::from("alice");
        ledger
            .log(&user, dec(1000), LedgerTxType::Deposit, Asset::Quote)
            .await
            .unwrap();
        let desk = WithdrawalDesk::new(ledger.clone(), Decimal::new(1, 3));
        (ledger, desk, user)
    }

    #[tokio::test]
    async fn fee_is_taken_from_gross() {
        let (ledger, desk, user) = setup().await;
        let receipt = desk.request(&user, dec(500), Asset::Quote).await.unwrap();
        assert_eq!(receipt.gross, dec(500));
        assert_eq!(receipt.fee, Decimal::new(5, 1));
        assert_eq!(receipt.net, Decimal::new(4995, 1));

        let b = ledger.balance(&user, Asset::Quote).await.unwrap().unwrap();
        assert_eq!(b.total, dec(500));
        ledger.verify_supply(Asset::Quote).unwrap();
    }

    #[tokio::test]
    async fn receipt_amounts_serialize_as_strings() {
        let (_ledger, desk, user) = setup().await;
        let receipt = desk.request(&user, dec(10), Asset::Quote).await.unwrap();
        let json = serde_json::to_value(receipt).unwrap();
        assert!(json["gross"].is_string());
        assert!(json["net"].is_string());
        let back: WithdrawalReceipt = serde_json::from_value(json).unwrap();
        assert_eq!(back, receipt);
    }

    #[tokio::test]
    async fn insufficient_free_balance() {
        let (ledger, desk, user) = setup().await;
        ledger.lock_balance(&user, dec(900), Asset::Quote).await.unwrap();
        let err = desk.request(&user, dec(200), Asset::Quote).await.unwrap_err();
        match err {
            CallmatchError::InsufficientBalance { needed, available } => {
                assert_eq!(needed, dec(200));
                assert_eq!(available, dec(100));
            }
            other => panic!("unexpected error: {other}"),
        }
        let b = ledger.balance(&user, Asset::Quote).await.unwrap().unwrap();
        assert_eq!(b.total, dec(1000));
    }

    #[tokio::test]
    async fn non_positive_amount_rejected() {
        let (_ledger, desk, user) = setup().await;
        assert!(matches!(
            desk.request(&user, Decimal::ZERO, Asset::Quote).await,
            Err(CallmatchError::InvalidAmount(_))
        ));
    }

    #[test]
    fn zero_fee_rate_pays_out_everything() {
        let desk = WithdrawalDesk::new(Arc::new(InMemoryLedger::new()), Decimal::ZERO);
        let receipt = desk.quote(Asset::Base, dec(7));
        assert_eq!(receipt.net, dec(7));
        assert_eq!(receipt.fee, Decimal::ZERO);
    }
}
