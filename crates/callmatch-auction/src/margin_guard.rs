//! Margin guard: the one place that knows which asset an order locks.
//!
//! - BUY locks `price × quantity` of the quote asset
//! - SELL locks `quantity` of the base asset

use std::sync::Arc;

use callmatch_ledger::BalanceLedger;
use callmatch_types::numeric::checked_mul;
use callmatch_types::{Asset, Instrument, OrderSide, Result, UserId};
use rust_decimal::Decimal;

pub struct MarginGuard {
    ledger: Arc<dyn BalanceLedger>,
    instrument: Instrument,
}

impl MarginGuard {
    #[must_use]
    pub fn new(ledger: Arc<dyn BalanceLedger>, instrument: Instrument) -> Self {
        Self { ledger, instrument }
    }

    #[must_use]
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn BalanceLedger> {
        &self.ledger
    }

    /// Asset and amount an order of this shape must lock.
    ///
    /// # Errors
    /// [`callmatch_types::CallmatchError::ArithmeticOverflow`] if a buy's
    /// `price × quantity` does not fit in a `Decimal`.
    pub fn collateral_for(
        &self,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<(Asset, Decimal)> {
        Ok(match side {
            OrderSide::Buy => (self.instrument.quote, checked_mul(price, quantity)?),
            OrderSide::Sell => (self.instrument.base, quantity),
        })
    }

    pub async fn try_lock(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
        self.ledger.lock_balance(user, amount, asset).await
    }

    pub async fn release_lock(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
        self.ledger.release_balance(user, amount, asset).await
    }
}
