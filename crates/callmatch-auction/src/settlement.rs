//! Per-order settlement of an auction's fills.
//!
//! For an order filled `q` at clearing price `c`:
//!
//! | side | release                 | debit           | credit          |
//! |------|-------------------------|-----------------|-----------------|
//! | BUY  | `q × limit` quote       | `q × c` quote   | `q` base        |
//! | SELL | `q` base                | `q` base        | `q × c` quote   |
//!
//! The buyer's release uses the limit price because that is what was
//! locked at placement; the `q × (limit − c)` difference stays in free.
//! A self-trade releases both locks and its debits and credits cancel.
//!
//! All three legs of one order go to the ledger as a single
//! [`BalanceLedger::settle_fill`] call, so no withdrawal or lock can land
//! between the release and the debit. One order's failure is logged and
//! recorded in the report; the other orders still settle. A failed fill
//! gives up its idempotency claim and may be settled again.

use std::sync::Arc;

use callmatch_ledger::{BalanceLedger, SettlementLegs};
use callmatch_matchcore::{Fill, MatchOutcome};
use callmatch_types::numeric::checked_mul;
use callmatch_types::{AuctionId, CallmatchError, OrderId, OrderSide, Result, UserId, constants};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::idempotency::IdempotencyGuard;
use crate::margin_guard::MarginGuard;

/// One order that could not be settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementFailure {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub error: String,
}

/// Outcome of settling one auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub settled: usize,
    pub failures: Vec<SettlementFailure>,
}

impl SettlementReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Settler {
    guard: Arc<MarginGuard>,
    idempotency: Mutex<IdempotencyGuard>,
}

impl Settler {
    #[must_use]
    pub fn new(guard: Arc<MarginGuard>) -> Self {
        Self::with_capacity(guard, constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE)
    }

    #[must_use]
    pub fn with_capacity(guard: Arc<MarginGuard>, idempotency_cache_size: usize) -> Self {
        Self {
            guard,
            idempotency: Mutex::new(IdempotencyGuard::new(idempotency_cache_size)),
        }
    }

    /// Settle every fill of `outcome`, continuing past failures.
    pub async fn settle(&self, outcome: &MatchOutcome) -> SettlementReport {
        let mut report = SettlementReport::default();
        for fill in &outcome.fills {
            match self
                .settle_fill(outcome.auction_id, outcome.clearing_price, fill)
                .await
            {
                Ok(()) => report.settled += 1,
                Err(err) => {
                    tracing::error!(
                        auction_id = %outcome.auction_id,
                        order_id = %fill.order.id,
                        user = %fill.order.user_id,
                        %err,
                        "settlement failed"
                    );
                    report.failures.push(SettlementFailure {
                        order_id: fill.order.id,
                        user_id: fill.order.user_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Settle one order's fill.
    ///
    /// # Errors
    /// - [`CallmatchError::FillAlreadySettled`] on a repeat, with no ledger call
    /// - [`CallmatchError::ArithmeticOverflow`] if a leg does not fit
    /// - [`CallmatchError::InsufficientLocked`] if the collateral is gone
    /// - any ledger error from the settlement transaction
    ///
    /// On every error other than a repeat the ledger is unchanged and the
    /// fill can be retried.
    pub async fn settle_fill(
        &self,
        auction_id: AuctionId,
        clearing_price: Decimal,
        fill: &Fill,
    ) -> Result<()> {
        let order = &fill.order;
        self.idempotency.lock().mark_settled(auction_id, order.id)?;

        let settled = self.apply(clearing_price, fill).await;
        if settled.is_err() {
            self.idempotency.lock().forget(auction_id, &order.id);
        }
        let legs = settled?;

        tracing::debug!(
            %auction_id,
            order_id = %order.id,
            user = %order.user_id,
            side = %order.side,
            filled = %fill.filled,
            released = %legs.release,
            "order settled"
        );
        Ok(())
    }

    /// The ledger movements for `fill` at `clearing_price`.
    ///
    /// # Errors
    /// [`CallmatchError::ArithmeticOverflow`] if a quote leg does not fit.
    pub fn legs_for(&self, clearing_price: Decimal, fill: &Fill) -> Result<SettlementLegs> {
        let order = &fill.order;
        let q = fill.filled;
        let instrument = self.guard.instrument();
        let (release_asset, release) = self.guard.collateral_for(order.side, order.price, q)?;
        Ok(match order.side {
            OrderSide::Buy => SettlementLegs {
                release_asset,
                release,
                debit_asset: instrument.quote,
                debit: checked_mul(q, clearing_price)?,
                credit_asset: instrument.base,
                credit: q,
            },
            OrderSide::Sell => SettlementLegs {
                release_asset,
                release,
                debit_asset: instrument.base,
                debit: q,
                credit_asset: instrument.quote,
                credit: checked_mul(q, clearing_price)?,
            },
        })
    }

    async fn apply(&self, clearing_price: Decimal, fill: &Fill) -> Result<SettlementLegs> {
        let user = &fill.order.user_id;
        let legs = self.legs_for(clearing_price, fill)?;
        if !self.ledger().settle_fill(user, &legs).await? {
            let locked = self
                .ledger()
                .balance(user, legs.release_asset)
                .await?
                .map_or(Decimal::ZERO, |b| b.locked);
            return Err(CallmatchError::InsufficientLocked {
                needed: legs.release,
                locked,
            });
        }
        Ok(legs)
    }

    /// Whether `(auction_id, order_id)` has been settled and is still
    /// remembered.
    #[must_use]
    pub fn is_settled(&self, auction_id: AuctionId, order_id: &OrderId) -> bool {
        self.idempotency.lock().is_settled(auction_id, order_id)
    }

    fn ledger(&self) -> &Arc<dyn BalanceLedger> {
        self.guard.ledger()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use callmatch_ledger::InMemoryLedger;
    use callmatch_types::*;

    use super::*;

    /// Fails the next settlement transaction once, then behaves.
    struct FlakyLedger {
        inner: Arc<InMemoryLedger>,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl BalanceLedger for FlakyLedger {
        async fn lock_balance(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
            self.inner.lock_balance(user, amount, asset).await
        }

        async fn release_balance(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
            self.inner.release_balance(user, amount, asset).await
        }

        async fn log(
            &self,
            user: &UserId,
            delta: Decimal,
            tx_type: LedgerTxType,
            asset: Asset,
        ) -> Result<BalanceLogEntry> {
            self.inner.log(user, delta, tx_type, asset).await
        }

        async fn settle_fill(&self, user: &UserId, legs: &SettlementLegs) -> Result<bool> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(CallmatchError::LedgerStorage("connection reset".into()));
            }
            self.inner.settle_fill(user, legs).await
        }

        async fn withdraw(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
            self.inner.withdraw(user, amount, asset).await
        }

        async fn balance(&self, user: &UserId, asset: Asset) -> Result<Option<Balance>> {
            self.inner.balance(user, asset).await
        }

        async fn balances(&self, user: &UserId) -> Result<Vec<(Asset, Balance)>> {
            self.inner.balances(user).await
        }
    }

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    async fn setup() -> (Arc<InMemoryLedger>, Settler) {
        let ledger = Arc::new(InMemoryLedger::new());
        let guard = Arc::new(MarginGuard::new(ledger.clone(), Instrument::main()));
        (ledger, Settler::new(guard))
    }

    async fn fund_and_lock(ledger: &InMemoryLedger, user: &UserId, asset: Asset, total: i64, lock: i64) {
        ledger.log(user, dec(total), LedgerTxType::Deposit, asset).await.unwrap();
        assert!(ledger.lock_balance(user, dec(lock), asset).await.unwrap());
    }

    fn fill(user: &UserId, side: OrderSide, price: i64, qty: i64, filled: i64) -> Fill {
        Fill {
            order: Order::dummy_limit_for_user(user.clone(), side, dec(price), dec(qty)),
            filled: dec(filled),
        }
    }

    #[tokio::test]
    async fn buyer_releases_at_limit_and_pays_at_clearing() {
        let (ledger, settler) = setup().await;
        let buyer = UserId::from("buyer");
        // BUY 10 @ 105 locked 1050.
        fund_and_lock(&ledger, &buyer, Asset::Quote, 2000, 1050).await;

        settler
            .settle_fill(AuctionId(1), dec(102), &fill(&buyer, OrderSide::Buy, 105, 10, 10))
            .await
            .unwrap();

        let quote = ledger.balance(&buyer, Asset::Quote).await.unwrap().unwrap();
        assert_eq!(quote.locked, Decimal::ZERO);
        assert_eq!(quote.total, dec(2000 - 1020));
        assert_eq!(quote.free, dec(980));
        let base = ledger.balance(&buyer, Asset::Base).await.unwrap().unwrap();
        assert_eq!(base.total, dec(10));
        assert!(quote.is_consistent() && base.is_consistent());
    }

    #[tokio::test]
    async fn partial_seller_fill_keeps_rest_locked() {
        let (ledger, settler) = setup().await;
        let seller = UserId::from("seller");
        fund_and_lock(&ledger, &seller, Asset::Base, 12, 12).await;

        settler
            .settle_fill(AuctionId(1), dec(102), &fill(&seller, OrderSide::Sell, 101, 12, 7))
            .await
            .unwrap();

        let base = ledger.balance(&seller, Asset::Base).await.unwrap().unwrap();
        assert_eq!((base.total, base.free, base.locked), (dec(5), dec(0), dec(5)));
        let quote = ledger.balance(&seller, Asset::Quote).await.unwrap().unwrap();
        assert_eq!(quote.total, dec(714));
    }

    #[tokio::test]
    async fn self_trade_nets_to_zero() {
        let (ledger, settler) = setup().await;
        let me = UserId::from("me");
        fund_and_lock(&ledger, &me, Asset::Quote, 1000, 100).await;
        fund_and_lock(&ledger, &me, Asset::Base, 10, 1).await;

        settler
            .settle_fill(AuctionId(3), dec(100), &fill(&me, OrderSide::Buy, 100, 1, 1))
            .await
            .unwrap();
        settler
            .settle_fill(AuctionId(3), dec(100), &fill(&me, OrderSide::Sell, 100, 1, 1))
            .await
            .unwrap();

        let quote = ledger.balance(&me, Asset::Quote).await.unwrap().unwrap();
        let base = ledger.balance(&me, Asset::Base).await.unwrap().unwrap();
        assert_eq!(quote, Balance::opened_with(dec(1000)));
        assert_eq!(base, Balance::opened_with(dec(10)));
    }

    #[tokio::test]
    async fn repeated_fill_is_rejected_without_mutation() {
        let (ledger, settler) = setup().await;
        let seller = UserId::from("seller");
        fund_and_lock(&ledger, &seller, Asset::Base, 10, 10).await;
        let f = fill(&seller, OrderSide::Sell, 100, 10, 4);

        settler.settle_fill(AuctionId(1), dec(100), &f).await.unwrap();
        let before = ledger.all_entries().len();
        let err = settler.settle_fill(AuctionId(1), dec(100), &f).await.unwrap_err();
        assert!(matches!(err, CallmatchError::FillAlreadySettled { .. }));
        assert_eq!(ledger.all_entries().len(), before);
        assert_eq!(
            ledger.balance(&seller, Asset::Base).await.unwrap().unwrap().locked,
            dec(6)
        );
    }

    #[tokio::test]
    async fn missing_collateral_is_reported_and_others_settle() {
        let (ledger, settler) = setup().await;
        let honest = UserId::from("honest");
        let broke = UserId::from("broke");
        fund_and_lock(&ledger, &honest, Asset::Base, 5, 5).await;

        let good = fill(&honest, OrderSide::Sell, 100, 5, 5);
        let bad = fill(&broke, OrderSide::Buy, 100, 5, 5);
        let outcome = MatchOutcome {
            auction_id: AuctionId(4),
            clearing_price: dec(100),
            trades: vec![],
            fills: vec![bad.clone(), good],
            remaining: vec![],
            matched_volume: dec(5),
            trade_root: [0; 32],
        };

        let report = settler.settle(&outcome).await;
        assert_eq!(report.settled, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].order_id, bad.order.id);
        assert!(report.failures[0].error.contains("CM_ERR_201"));
        assert!(!report.is_clean());
        assert_eq!(
            ledger.balance(&honest, Asset::Quote).await.unwrap().unwrap().total,
            dec(500)
        );
    }

    #[tokio::test]
    async fn failed_transaction_releases_claim_for_retry() {
        let inner = Arc::new(InMemoryLedger::new());
        let flaky = Arc::new(FlakyLedger {
            inner: inner.clone(),
            fail_next: AtomicBool::new(true),
        });
        let settler = Settler::new(Arc::new(MarginGuard::new(flaky, Instrument::main())));
        let buyer = UserId::from("buyer");
        fund_and_lock(&inner, &buyer, Asset::Quote, 1000, 500).await;
        let f = fill(&buyer, OrderSide::Buy, 100, 5, 5);

        let err = settler.settle_fill(AuctionId(9), dec(98), &f).await.unwrap_err();
        assert!(matches!(err, CallmatchError::LedgerStorage(_)));
        assert!(!settler.is_settled(AuctionId(9), &f.order.id));
        let quote = inner.balance(&buyer, Asset::Quote).await.unwrap().unwrap();
        assert_eq!((quote.free, quote.locked), (dec(500), dec(500)));

        settler.settle_fill(AuctionId(9), dec(98), &f).await.unwrap();
        assert!(settler.is_settled(AuctionId(9), &f.order.id));
        let quote = inner.balance(&buyer, Asset::Quote).await.unwrap().unwrap();
        assert_eq!((quote.total, quote.locked), (dec(510), Decimal::ZERO));
        inner.verify_rows().unwrap();
    }

    #[tokio::test]
    async fn unrepresentable_proceeds_fail_only_that_order() {
        let (ledger, settler) = setup().await;
        let seller = UserId::from("seller");
        let buyer = UserId::from("buyer");
        fund_and_lock(&ledger, &seller, Asset::Base, 10, 10).await;
        fund_and_lock(&ledger, &buyer, Asset::Quote, 100, 100).await;

        let mut big = fill(&seller, OrderSide::Sell, 1, 10, 10);
        big.filled = Decimal::MAX;
        let small = fill(&buyer, OrderSide::Buy, 10, 10, 10);
        let outcome = MatchOutcome {
            auction_id: AuctionId(2),
            clearing_price: dec(10),
            trades: vec![],
            fills: vec![big.clone(), small],
            remaining: vec![],
            matched_volume: dec(10),
            trade_root: [0; 32],
        };

        let report = settler.settle(&outcome).await;
        assert_eq!(report.settled, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].order_id, big.order.id);
        assert!(report.failures[0].error.contains("CM_ERR_106"));
        assert!(!settler.is_settled(AuctionId(2), &big.order.id));

        let base = ledger.balance(&seller, Asset::Base).await.unwrap().unwrap();
        assert_eq!(base.locked, dec(10));
        assert!(ledger.balance(&seller, Asset::Quote).await.unwrap().is_none());
    }
}
