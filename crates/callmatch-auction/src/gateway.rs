//! Order intake and read model for the API layer.
//!
//! Placement is lock-first: collateral is locked before the book sees the
//! order, so a refused lock never leaves a resting order. If the book then
//! rejects the order, the lock is released again.

use std::sync::Arc;

use callmatch_types::{
    Asset, Balance, CallmatchError, Order, OrderId, OrderRequest, Result, UserId,
};
use rust_decimal::Decimal;

use crate::SharedBook;
use crate::margin_guard::MarginGuard;

pub struct OrderGateway {
    book: SharedBook,
    guard: Arc<MarginGuard>,
    decimal_places: u32,
}

impl OrderGateway {
    #[must_use]
    pub fn new(book: SharedBook, guard: Arc<MarginGuard>, decimal_places: u32) -> Self {
        Self {
            book,
            guard,
            decimal_places,
        }
    }

    /// Quantize, validate, lock collateral, then rest the order.
    ///
    /// # Errors
    /// - [`CallmatchError::InvalidOrder`] for bad fields (also after rounding)
    ///   or an order above the size limits
    /// - [`CallmatchError::ArithmeticOverflow`] if the notional does not fit
    /// - [`CallmatchError::InsufficientBalance`] if the lock is refused
    pub async fn place_order(&self, request: OrderRequest) -> Result<Order> {
        let request = request.quantized(self.decimal_places);
        request.validate()?;

        let (asset, amount) =
            self.guard
                .collateral_for(request.side, request.price, request.quantity)?;
        if !self.guard.try_lock(&request.user_id, amount, asset).await? {
            let available = self
                .guard
                .ledger()
                .balance(&request.user_id, asset)
                .await?
                .map_or(Decimal::ZERO, |b| b.free);
            return Err(CallmatchError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let placed = self.book.lock().place_order(
            request.user_id.clone(),
            request.side,
            request.price,
            request.quantity,
        );
        match placed {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    user = %order.user_id,
                    side = %order.side,
                    price = %order.price,
                    quantity = %order.quantity,
                    "order accepted"
                );
                Ok(order)
            }
            Err(err) => {
                self.compensate(&request.user_id, amount, asset).await;
                Err(err)
            }
        }
    }

    /// Cancel an order and release the collateral still behind it.
    ///
    /// `None` when the order is unknown or owned by someone else.
    pub async fn cancel_order(&self, order_id: &OrderId, user: &UserId) -> Result<Option<Order>> {
        let cancelled = self.book.lock().cancel_order(order_id, user);
        let Some(order) = cancelled else {
            return Ok(None);
        };

        // `quantity` is what is still resting after earlier partial fills.
        let (asset, amount) = match self
            .guard
            .collateral_for(order.side, order.price, order.quantity)
        {
            Ok(collateral) => collateral,
            Err(err) => {
                tracing::error!(%order_id, %user, %err, "cannot size collateral of cancelled order");
                return Err(err);
            }
        };
        if !self.guard.release_lock(user, amount, asset).await? {
            tracing::error!(
                %order_id,
                %user,
                %asset,
                %amount,
                "cancelled order had no matching locked collateral"
            );
        }
        tracing::info!(%order_id, %user, "order cancelled");
        Ok(Some(order))
    }

    async fn compensate(&self, user: &UserId, amount: Decimal, asset: Asset) {
        match self.guard.release_lock(user, amount, asset).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(%user, %asset, %amount, "compensating release refused");
            }
            Err(err) => {
                tracing::error!(%user, %asset, %amount, %err, "compensating release failed");
            }
        }
    }

    // =================================================================
    // Read model
    // =================================================================

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.book.lock().orders()
    }

    #[must_use]
    pub fn buy_orders(&self) -> Vec<Order> {
        self.book.lock().buy_orders()
    }

    #[must_use]
    pub fn sell_orders(&self) -> Vec<Order> {
        self.book.lock().sell_orders()
    }

    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.book.lock().order(order_id).cloned()
    }

    pub async fn balances(&self, user: &UserId) -> Result<Vec<(Asset, Balance)>> {
        self.guard.ledger().balances(user).await
    }
}
