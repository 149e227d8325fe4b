//! Uniform clearing price search for call auctions.
//!
//! Every distinct resting price is a candidate. At candidate `p`:
//! - demand = Σ qty of bids priced `>= p`
//! - supply = Σ qty of asks priced `<= p`
//! - volume = min(demand, supply)
//!
//! The clearing price maximizes volume. Candidates are scanned from the
//! highest price down and only a strictly larger volume replaces the
//! current best, so equal-volume ties resolve to the **highest** price.

use callmatch_types::numeric::checked_sum;
use callmatch_types::{Order, Result};
use rust_decimal::Decimal;

use crate::OrderBook;

/// Result of clearing price computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingResult {
    /// The uniform clearing price, if supply and demand cross.
    pub clearing_price: Option<Decimal>,
    /// Total matchable volume at the clearing price.
    pub volume: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl ClearingResult {
    fn none(best_bid: Option<Decimal>, best_ask: Option<Decimal>) -> Self {
        Self {
            clearing_price: None,
            volume: Decimal::ZERO,
            best_bid,
            best_ask,
        }
    }

    /// `true` when a price was found and something will trade.
    #[must_use]
    pub fn has_trades(&self) -> bool {
        self.clearing_price.is_some() && self.volume > Decimal::ZERO
    }
}

/// Compute the clearing price of the book from its aggregated levels.
pub fn compute_clearing_price(book: &OrderBook) -> Result<ClearingResult> {
    let bids: Vec<(Decimal, Decimal)> = book
        .bid_levels()
        .map(|level| (level.price(), level.total_quantity()))
        .collect();
    let asks: Vec<(Decimal, Decimal)> = book
        .ask_levels()
        .map(|level| (level.price(), level.total_quantity()))
        .collect();
    clear_levels(&bids, &asks)
}

/// Compute the clearing price straight from order lists.
///
/// Input order is irrelevant; the result depends only on the multiset of
/// `(price, quantity)` pairs on each side.
pub fn clear_orders(buys: &[Order], sells: &[Order]) -> Result<ClearingResult> {
    let bids: Vec<(Decimal, Decimal)> = buys.iter().map(|o| (o.price, o.quantity)).collect();
    let asks: Vec<(Decimal, Decimal)> = sells.iter().map(|o| (o.price, o.quantity)).collect();
    clear_levels(&bids, &asks)
}

/// Core search over `(price, quantity)` pairs. Pairs may repeat a price.
///
/// # Errors
/// [`callmatch_types::CallmatchError::ArithmeticOverflow`] if a side's
/// cumulative quantity does not fit in a `Decimal`.
pub fn clear_levels(
    bids: &[(Decimal, Decimal)],
    asks: &[(Decimal, Decimal)],
) -> Result<ClearingResult> {
    let best_bid = bids.iter().map(|(p, _)| *p).max();
    let best_ask = asks.iter().map(|(p, _)| *p).min();

    match (best_bid, best_ask) {
        (Some(bid), Some(ask)) if bid >= ask => {}
        _ => return Ok(ClearingResult::none(best_bid, best_ask)),
    }

    let mut candidates: Vec<Decimal> = bids.iter().chain(asks).map(|(p, _)| *p).collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.dedup();

    let mut best_price = None;
    let mut best_volume = Decimal::ZERO;
    for price in candidates {
        let demand = checked_sum(bids.iter().filter(|(p, _)| *p >= price).map(|(_, q)| *q))?;
        let supply = checked_sum(asks.iter().filter(|(p, _)| *p <= price).map(|(_, q)| *q))?;
        let volume = demand.min(supply);
        if volume > best_volume {
            best_volume = volume;
            best_price = Some(price);
        }
    }

    Ok(match best_price {
        Some(price) => ClearingResult {
            clearing_price: Some(price),
            volume: best_volume,
            best_bid,
            best_ask,
        },
        None => ClearingResult::none(best_bid, best_ask),
    })
}
