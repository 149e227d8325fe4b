//! Pure call-auction matcher.
//!
//! Given the book's orders and a clearing `(price, volume)`, produce the
//! trades, the per-order fills, and the orders that go back on the book.
//! No side effects: the caller commits the remainder and settles fills.
//!
//! ## Algorithm
//!
//! 1. Partition: bids priced `>= price` and asks priced `<= price` are
//!    eligible; everything else is carried forward untouched.
//! 2. Walk eligible bids and asks with two cursors, in book order (best
//!    price first, FIFO within a level). Each step fills
//!    `min(remaining bid, remaining ask)` at the clearing price.
//! 3. Stop when a side is exhausted or the matched total reaches the
//!    clearing volume.
//! 4. Remainder = carried orders + eligible orders with quantity left,
//!    deduplicated by id and sorted by acceptance sequence.
//!
//! Remaining quantities live in side vectors indexed like the eligible
//! lists, so the input orders are never mutated mid-walk.

use std::collections::HashSet;

use callmatch_types::{AuctionId, Order, OrderId, OrderSide, Trade, TradeId};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::determinism::compute_trade_root;

/// One order's share of an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// The order as it rested before the auction.
    pub order: Order,
    /// Quantity executed this cycle.
    pub filled: Decimal,
}

impl Fill {
    /// Quantity left on the order after this cycle.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.order.quantity - self.filled
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Everything one matching pass produced.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub auction_id: AuctionId,
    pub clearing_price: Decimal,
    /// Trades in execution order.
    pub trades: Vec<Trade>,
    /// Orders with a non-zero fill: eligible bids first, then asks.
    pub fills: Vec<Fill>,
    /// New book contents, in acceptance order.
    pub remaining: Vec<Order>,
    /// Σ trade quantity.
    pub matched_volume: Decimal,
    /// SHA-256 over the trades, see [`compute_trade_root`].
    pub trade_root: [u8; 32],
}

impl MatchOutcome {
    #[must_use]
    pub fn trade_root_hex(&self) -> String {
        hex::encode(self.trade_root)
    }

    /// Fill for `order_id`, if it traded.
    #[must_use]
    pub fn fill_for(&self, order_id: &OrderId) -> Option<&Fill> {
        self.fills.iter().find(|f| f.order.id == *order_id)
    }
}

/// Match `buys` against `sells` at the uniform `clearing_price`.
///
/// `buys` and `sells` must be in book order, as returned by
/// [`OrderBook::buy_orders`](crate::OrderBook::buy_orders) and
/// [`OrderBook::sell_orders`](crate::OrderBook::sell_orders).
#[must_use]
pub fn match_at_clearing(
    auction_id: AuctionId,
    buys: &[Order],
    sells: &[Order],
    clearing_price: Decimal,
    volume: Decimal,
) -> MatchOutcome {
    let (eligible_buys, carried_buys): (Vec<&Order>, Vec<&Order>) =
        buys.iter().partition(|o| o.is_matchable_at(clearing_price));
    let (eligible_sells, carried_sells): (Vec<&Order>, Vec<&Order>) =
        sells.iter().partition(|o| o.is_matchable_at(clearing_price));

    let mut buy_left: Vec<Decimal> = eligible_buys.iter().map(|o| o.quantity).collect();
    let mut sell_left: Vec<Decimal> = eligible_sells.iter().map(|o| o.quantity).collect();

    let executed_at = Utc::now();
    let mut trades = Vec::new();
    let mut matched = Decimal::ZERO;
    let mut fill_seq: u64 = 0;
    let (mut b, mut s) = (0usize, 0usize);

    while b < eligible_buys.len() && s < eligible_sells.len() && matched < volume {
        let qty = buy_left[b].min(sell_left[s]).min(volume - matched);
        let (buy, sell) = (eligible_buys[b], eligible_sells[s]);

        if qty > Decimal::ZERO {
            let trade = Trade {
                id: TradeId::deterministic(auction_id, fill_seq),
                auction_id,
                price: clearing_price,
                quantity: qty,
                buy_order_id: buy.id,
                buyer_id: buy.user_id.clone(),
                sell_order_id: sell.id,
                seller_id: sell.user_id.clone(),
                executed_at,
            };
            tracing::debug!(
                %auction_id,
                trade_id = %trade.id,
                buy_order_id = %buy.id,
                sell_order_id = %sell.id,
                quantity = %qty,
                price = %clearing_price,
                "fill"
            );
            trades.push(trade);
            fill_seq += 1;
            matched += qty;
            buy_left[b] -= qty;
            sell_left[s] -= qty;
        }

        if buy_left[b].is_zero() {
            b += 1;
        }
        if sell_left[s].is_zero() {
            s += 1;
        }
    }

    let mut fills = Vec::new();
    let mut remaining = Vec::new();
    let eligible = eligible_buys
        .iter()
        .zip(&buy_left)
        .chain(eligible_sells.iter().zip(&sell_left));
    for (order, left) in eligible {
        let filled = order.quantity - *left;
        if filled > Decimal::ZERO {
            fills.push(Fill {
                order: (*order).clone(),
                filled,
            });
        }
        if *left > Decimal::ZERO {
            let mut rest = (*order).clone();
            rest.quantity = *left;
            remaining.push(rest);
        }
    }
    remaining.extend(carried_buys.into_iter().chain(carried_sells).cloned());
    let remaining = dedup_by_id(auction_id, remaining);

    let trade_root = compute_trade_root(&trades);
    MatchOutcome {
        auction_id,
        clearing_price,
        trades,
        fills,
        remaining,
        matched_volume: matched,
        trade_root,
    }
}

/// Drop repeated ids (first occurrence wins) and restore acceptance order.
fn dedup_by_id(auction_id: AuctionId, orders: Vec<Order>) -> Vec<Order> {
    let mut seen = HashSet::with_capacity(orders.len());
    let mut out: Vec<Order> = orders
        .into_iter()
        .filter(|o| {
            let fresh = seen.insert(o.id);
            if !fresh {
                tracing::warn!(%auction_id, order_id = %o.id, "duplicate order in remainder dropped");
            }
            fresh
        })
        .collect();
    out.sort_by_key(|o| o.sequence);
    out
}

/// Total filled quantity on `side`.
#[must_use]
pub fn side_volume(fills: &[Fill], side: OrderSide) -> Decimal {
    fills
        .iter()
        .filter(|f| f.order.side == side)
        .map(|f| f.filled)
        .sum()
}
