//! Audit trail of auction outcomes, one record per cycle.

use std::collections::VecDeque;

use callmatch_types::{AuctionId, AuctionResult};
use parking_lot::Mutex;

/// Bounded, oldest-evicted log of [`AuctionResult`]s.
#[derive(Debug)]
pub struct AuctionHistory {
    results: Mutex<VecDeque<AuctionResult>>,
    capacity: usize,
}

impl AuctionHistory {
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "AuctionHistory capacity must be > 0");
        Self {
            results: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn record(&self, result: AuctionResult) {
        let mut results = self.results.lock();
        if results.len() >= self.capacity {
            results.pop_front();
        }
        results.push_back(result);
    }

    #[must_use]
    pub fn get(&self, auction_id: AuctionId) -> Option<AuctionResult> {
        self.results
            .lock()
            .iter()
            .rev()
            .find(|r| r.auction_id == auction_id)
            .cloned()
    }

    /// Up to `limit` results, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuctionResult> {
        self.results.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Everything retained, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<AuctionResult> {
        self.results.lock().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}
