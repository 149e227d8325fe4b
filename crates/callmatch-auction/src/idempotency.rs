//! Settlement idempotency guard.
//!
//! Each `(auction, order)` fill settles at most once. A repeat attempt
//! returns [`CallmatchError::FillAlreadySettled`] before any ledger call.
//!
//! The guard keeps a bounded FIFO so memory stays predictable in
//! long-running nodes.

use std::collections::{HashSet, VecDeque};

use callmatch_types::{AuctionId, CallmatchError, OrderId, Result};

type FillKey = (AuctionId, OrderId);

#[derive(Debug)]
pub struct IdempotencyGuard {
    settled: HashSet<FillKey>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<FillKey>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "IdempotencyGuard max_size must be > 0");
        Self {
            settled: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Claim a fill for settlement.
    ///
    /// # Errors
    /// [`CallmatchError::FillAlreadySettled`] if it was claimed before.
    pub fn mark_settled(&mut self, auction_id: AuctionId, order_id: OrderId) -> Result<()> {
        let key = (auction_id, order_id);
        if self.settled.contains(&key) {
            return Err(CallmatchError::FillAlreadySettled {
                auction_id,
                order_id,
            });
        }
        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
        self.settled.insert(key);
        self.order.push_back(key);
        Ok(())
    }

    /// Drop a claim whose settlement did not go through, so the fill can
    /// be retried. Returns whether the claim was present.
    pub fn forget(&mut self, auction_id: AuctionId, order_id: &OrderId) -> bool {
        let key = (auction_id, *order_id);
        if !self.settled.remove(&key) {
            return false;
        }
        self.order.retain(|k| *k != key);
        true
    }

    #[must_use]
    pub fn is_settled(&self, auction_id: AuctionId, order_id: &OrderId) -> bool {
        self.settled.contains(&(auction_id, *order_id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}
