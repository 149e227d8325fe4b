//! Trade records produced by the auction matcher.
//!
//! Trades are ephemeral: the engine hands them to settlement and the
//! publisher and does not keep them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numeric::checked_mul;
use crate::{AuctionId, OrderId, Result, TradeId, UserId};

/// A single fill between one buy order and one sell order at the
/// auction's clearing price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub auction_id: AuctionId,
    /// Uniform clearing price of the cycle.
    pub price: Decimal,
    /// Executed quantity in the base asset.
    pub quantity: Decimal,
    pub buy_order_id: OrderId,
    pub buyer_id: UserId,
    pub sell_order_id: OrderId,
    pub seller_id: UserId,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Quote amount exchanged: `price × quantity`.
    pub fn quote_amount(&self) -> Result<Decimal> {
        checked_mul(self.price, self.quantity)
    }

    #[must_use]
    pub fn is_self_trade(&self) -> bool {
        self.buyer_id == self.seller_id
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} @ {}",
            self.id, self.auction_id, self.quantity, self.price,
        )
    }
}
