//! Order types.
//!
//! Only simple limit orders exist. `quantity` is what is still resting; it
//! shrinks as the order fills and an order at zero never stays on the book.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ORDER_NOTIONAL, MAX_ORDER_QUANTITY};
use crate::numeric::{checked_mul, quantize};
use crate::{CallmatchError, OrderId, Result, UserId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = CallmatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(CallmatchError::InvalidSide(other.to_string())),
        }
    }
}

/// A resting limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub side: OrderSide,
    pub price: Decimal,
    /// Unfilled quantity still resting on the book.
    pub quantity: Decimal,
    /// Acceptance sequence; strictly increasing, breaks ties within a level.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order participates in an auction clearing at `price`.
    #[must_use]
    pub fn is_matchable_at(&self, price: Decimal) -> bool {
        match self.side {
            OrderSide::Buy => self.price >= price,
            OrderSide::Sell => self.price <= price,
        }
    }

    /// Quote value of the resting quantity at the order's own limit price.
    pub fn notional(&self) -> Result<Decimal> {
        checked_mul(self.price, self.quantity)
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order[{}] {} {} {} @ {}",
            self.id, self.user_id, self.side, self.quantity, self.price
        )
    }
}

/// An order intent as it arrives from the API layer, before acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub user_id: UserId,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderRequest {
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, side: OrderSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            side,
            price,
            quantity,
        }
    }

    /// Round price and quantity to `places` decimal places.
    #[must_use]
    pub fn quantized(mut self, places: u32) -> Self {
        self.price = quantize(self.price, places);
        self.quantity = quantize(self.quantity, places);
        self
    }

    /// Reject requests that may never reach the book.
    ///
    /// # Errors
    /// Returns [`CallmatchError::InvalidOrder`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(CallmatchError::InvalidOrder {
                reason: "missing user id".into(),
            });
        }
        validate_price_quantity(self.price, self.quantity)
    }
}

/// Shared check for price and quantity: both positive, and the order small
/// enough that its collateral and every book-wide sum stay representable.
///
/// # Errors
/// - [`CallmatchError::InvalidOrder`] if either value is not positive or a
///   size limit is exceeded
/// - [`CallmatchError::ArithmeticOverflow`] if `price × quantity` does not
///   fit in a `Decimal`
pub fn validate_price_quantity(price: Decimal, quantity: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(CallmatchError::InvalidOrder {
            reason: format!("price must be positive, got {price}"),
        });
    }
    if quantity <= Decimal::ZERO {
        return Err(CallmatchError::InvalidOrder {
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }
    let notional = checked_mul(price, quantity)?;
    if quantity > Decimal::from(MAX_ORDER_QUANTITY) {
        return Err(CallmatchError::InvalidOrder {
            reason: format!("quantity {quantity} exceeds {MAX_ORDER_QUANTITY}"),
        });
    }
    if notional > Decimal::from(MAX_ORDER_NOTIONAL) {
        return Err(CallmatchError::InvalidOrder {
            reason: format!("notional {notional} exceeds {MAX_ORDER_NOTIONAL}"),
        });
    }
    Ok(())
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(side: OrderSide, price: Decimal, qty: Decimal) -> Self {
        Self::dummy_limit_for_user(UserId::new(OrderId::new().to_string()), side, price, qty)
    }

    pub fn dummy_limit_for_user(
        user_id: UserId,
        side: OrderSide,
        price: Decimal,
        qty: Decimal,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            side,
            price,
            quantity: qty,
            sequence: 0,
            created_at: Utc::now(),
        }
    }
}
