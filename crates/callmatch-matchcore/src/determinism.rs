//! Trade-root hashing for comparing auction runs.
//!
//! Matching the same book in the same auction must yield the same trades.
//! The trade root is a single SHA-256 over every trade's identifying
//! fields, so two runs compare with one equality check.

use callmatch_types::Trade;
use sha2::{Digest, Sha256};

/// Compute the trade root over `trades`, in order.
///
/// Covers trade id, auction id, both order ids, both user ids, price and
/// quantity. Execution timestamps are excluded.
#[must_use]
pub fn compute_trade_root(trades: &[Trade]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"callmatch:trade_root:v1:");
    hasher.update((trades.len() as u64).to_le_bytes());

    for trade in trades {
        hasher.update(trade.id.0.as_bytes());
        hasher.update(trade.auction_id.0.to_le_bytes());
        hasher.update(trade.buy_order_id.0.as_bytes());
        hasher.update(trade.sell_order_id.0.as_bytes());
        // Length-prefix the variable-width fields.
        for field in [
            trade.buyer_id.as_str().to_owned(),
            trade.seller_id.as_str().to_owned(),
            trade.price.normalize().to_string(),
            trade.quantity.normalize().to_string(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Verify that `expected_root` matches the root recomputed from `trades`.
#[must_use]
pub fn verify_trade_root(trades: &[Trade], expected_root: &[u8; 32]) -> bool {
    compute_trade_root(trades) == *expected_root
}
