//! The order book for the BASE/QUOTE pair.
//!
//! Two [`PriceLevelStore`]s hold the sides:
//! - **Bids** (buys): descending comparator, highest price first
//! - **Asks** (sells): ascending comparator, lowest price first
//!
//! An auxiliary `HashMap<OrderId, (OrderSide, Price)>` finds any resting
//! order's level directly for cancel and lookup.

use std::collections::HashMap;

use callmatch_types::{
    CallmatchError, Order, OrderId, OrderSide, Result, UserId, validate_price_quantity,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::clearing::{ClearingResult, compute_clearing_price};
use crate::level_store::{PriceLevelStore, PriceOrdering};
use crate::price_level::PriceLevel;

/// The order book: bids, asks and the id index.
#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: PriceLevelStore,
    asks: PriceLevelStore,
    /// `OrderId -> (side, price)`; exactly the orders resting in a level.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
    /// Next acceptance sequence. Never reset, so FIFO survives rebuilds.
    next_sequence: u64,
}

impl OrderBook {
    /// Create a new empty order book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bids: PriceLevelStore::new(PriceOrdering::descending()),
            asks: PriceLevelStore::new(PriceOrdering::ascending()),
            index: HashMap::new(),
            next_sequence: 0,
        }
    }

    // =================================================================
    // Placement
    // =================================================================

    /// Accept a new limit order: assign id and sequence, then rest it.
    ///
    /// Collateral must already be locked by the caller.
    pub fn place_order(
        &mut self,
        user_id: UserId,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Order> {
        validate_price_quantity(price, quantity)?;
        let order = Order {
            id: OrderId::new(),
            user_id,
            side,
            price,
            quantity,
            sequence: self.next_sequence,
            created_at: Utc::now(),
        };
        self.insert_order(order.clone())?;
        Ok(order)
    }

    /// Rest an existing order, keeping its id, sequence and timestamp.
    pub fn insert_order(&mut self, order: Order) -> Result<()> {
        if self.index.contains_key(&order.id) {
            return Err(CallmatchError::DuplicateOrder(order.id));
        }
        validate_price_quantity(order.price, order.quantity)?;

        let (id, side, price, sequence) = (order.id, order.side, order.price, order.sequence);
        let store = self.side_mut(side);
        let pushed = store.get_or_insert(price).push_back(order);
        if pushed.is_err() && store.get(&price).is_some_and(PriceLevel::is_empty) {
            store.remove(&price);
        }
        pushed?;

        self.next_sequence = self.next_sequence.max(sequence + 1);
        self.index.insert(id, (side, price));
        Ok(())
    }

    // =================================================================
    // Cancellation
    // =================================================================

    /// Cancel `order_id` on behalf of `user_id`.
    ///
    /// Returns `None` when the order does not exist *or* belongs to someone
    /// else; the caller cannot tell the two apart.
    pub fn cancel_order(&mut self, order_id: &OrderId, user_id: &UserId) -> Option<Order> {
        let (side, price) = *self.index.get(order_id)?;

        let owner = match self.side(side).get(&price).and_then(|l| l.get(order_id)) {
            Some(order) => order.user_id.clone(),
            None => {
                tracing::error!(
                    %order_id,
                    %side,
                    %price,
                    "indexed order missing from its price level; dropping index entry"
                );
                self.index.remove(order_id);
                return None;
            }
        };
        if owner != *user_id {
            tracing::debug!(%order_id, %user_id, "cancel rejected: not the owner");
            return None;
        }

        let store = self.side_mut(side);
        let level = store.get_mut(&price)?;
        let order = level.remove_order(order_id)?;
        if level.is_empty() {
            store.remove(&price);
        }
        self.index.remove(order_id);
        Some(order)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// All bids, best price first, FIFO within a level.
    #[must_use]
    pub fn buy_orders(&self) -> Vec<Order> {
        self.bids.values().flat_map(PriceLevel::orders).cloned().collect()
    }

    /// All asks, best price first, FIFO within a level.
    #[must_use]
    pub fn sell_orders(&self) -> Vec<Order> {
        self.asks.values().flat_map(PriceLevel::orders).cloned().collect()
    }

    /// Bids followed by asks.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        let mut all = self.buy_orders();
        all.extend(self.sell_orders());
        all
    }

    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(order_id)?;
        self.side(*side).get(price)?.get(order_id)
    }

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best().map(PriceLevel::price)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best().map(PriceLevel::price)
    }

    /// Total number of orders currently in the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Bid levels from best (highest) to worst.
    pub fn bid_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Ask levels from best (lowest) to worst.
    pub fn ask_levels(&self) -> impl Iterator<Item = &PriceLevel> {
        self.asks.values()
    }

    /// Search for the uniform clearing price of the current book.
    ///
    /// # Errors
    /// [`CallmatchError::ArithmeticOverflow`] if a demand or supply sum
    /// does not fit in a `Decimal`.
    pub fn find_clearing_price(&self) -> Result<ClearingResult> {
        compute_clearing_price(self)
    }

    // =================================================================
    // Maintenance
    // =================================================================

    /// Replace the whole book with `orders`.
    ///
    /// Orders keep their ids and sequences and are re-rested in sequence
    /// order, so time priority within a level is unchanged. Duplicates and
    /// zero-quantity orders are dropped with an error log. Returns how many
    /// orders were rested.
    pub fn update_orders(&mut self, mut orders: Vec<Order>) -> usize {
        self.clear();
        orders.sort_by_key(|o| o.sequence);
        let mut rested = 0;
        for order in orders {
            let order_id = order.id;
            match self.insert_order(order) {
                Ok(()) => rested += 1,
                Err(err) => tracing::error!(%order_id, %err, "dropping order while rebuilding book"),
            }
        }
        rested
    }

    /// Remove every order. The sequence counter keeps running.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.index.clear();
    }

    /// Verify the index ↔ level bijection and the no-empty-level rule.
    pub fn check_consistency(&self) -> Result<()> {
        let mut resting = 0usize;
        for (side, store) in [(OrderSide::Buy, &self.bids), (OrderSide::Sell, &self.asks)] {
            for level in store.values() {
                if level.is_empty() {
                    return Err(CallmatchError::BookInconsistency {
                        reason: format!("empty {side} level at {}", level.price()),
                    });
                }
                for order in level.orders() {
                    resting += 1;
                    if order.side != side || order.price != level.price() {
                        return Err(CallmatchError::BookInconsistency {
                            reason: format!("order {} rests on the wrong level", order.id),
                        });
                    }
                    if self.index.get(&order.id) != Some(&(side, level.price())) {
                        return Err(CallmatchError::BookInconsistency {
                            reason: format!("order {} missing from index", order.id),
                        });
                    }
                }
            }
        }
        if resting != self.index.len() {
            return Err(CallmatchError::BookInconsistency {
                reason: format!(
                    "index holds {} orders but levels hold {resting}",
                    self.index.len()
                ),
            });
        }
        Ok(())
    }

    fn side(&self, side: OrderSide) -> &PriceLevelStore {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: OrderSide) -> &mut PriceLevelStore {
        match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
