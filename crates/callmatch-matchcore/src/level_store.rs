//! Ordered price → level map for one side of the book.
//!
//! Keeps a sorted key vector next to a hash map of levels. New keys are
//! placed by binary search under an injected [`PriceOrdering`], so the same
//! store type serves bids (descending) and asks (ascending) and the book
//! never special-cases side when it scans best-price-first.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// Comparison strategy deciding which price is "better" on a side.
#[derive(Debug, Clone, Copy)]
pub struct PriceOrdering {
    name: &'static str,
    cmp: fn(&Decimal, &Decimal) -> Ordering,
}

impl PriceOrdering {
    /// Highest price first (bids).
    #[must_use]
    pub fn descending() -> Self {
        Self {
            name: "descending",
            cmp: |a, b| b.cmp(a),
        }
    }

    /// Lowest price first (asks).
    #[must_use]
    pub fn ascending() -> Self {
        Self {
            name: "ascending",
            cmp: |a, b| a.cmp(b),
        }
    }

    /// `Less` when `a` sorts before `b`.
    #[must_use]
    pub fn compare(&self, a: &Decimal, b: &Decimal) -> Ordering {
        (self.cmp)(a, b)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Sorted map from price to [`PriceLevel`].
#[derive(Debug, Clone)]
pub struct PriceLevelStore {
    ordering: PriceOrdering,
    /// Prices in side order, best first.
    keys: Vec<Decimal>,
    levels: HashMap<Decimal, PriceLevel>,
}

impl PriceLevelStore {
    #[must_use]
    pub fn new(ordering: PriceOrdering) -> Self {
        Self {
            ordering,
            keys: Vec::new(),
            levels: HashMap::new(),
        }
    }

    #[must_use]
    pub fn ordering(&self) -> PriceOrdering {
        self.ordering
    }

    /// Insert or replace the level at `price`.
    pub fn upsert(&mut self, price: Decimal, level: PriceLevel) {
        if !self.levels.contains_key(&price) {
            let idx = self.insertion_index(&price);
            self.keys.insert(idx, price);
        }
        self.levels.insert(price, level);
    }

    /// The level at `price`, created empty if absent.
    pub fn get_or_insert(&mut self, price: Decimal) -> &mut PriceLevel {
        if !self.levels.contains_key(&price) {
            let idx = self.insertion_index(&price);
            self.keys.insert(idx, price);
        }
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
    }

    #[must_use]
    pub fn get(&self, price: &Decimal) -> Option<&PriceLevel> {
        self.levels.get(price)
    }

    pub fn get_mut(&mut self, price: &Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(price)
    }

    /// Remove the level at `price`, returning it.
    pub fn remove(&mut self, price: &Decimal) -> Option<PriceLevel> {
        let level = self.levels.remove(price)?;
        if let Ok(idx) = self
            .keys
            .binary_search_by(|k| self.ordering.compare(k, price))
        {
            self.keys.remove(idx);
        }
        Some(level)
    }

    /// Levels in side order, best price first.
    pub fn values(&self) -> impl Iterator<Item = &PriceLevel> {
        self.keys.iter().filter_map(|k| self.levels.get(k))
    }

    /// Prices in side order, best first.
    pub fn prices(&self) -> impl Iterator<Item = &Decimal> {
        self.keys.iter()
    }

    /// The best level on this side.
    #[must_use]
    pub fn best(&self) -> Option<&PriceLevel> {
        self.keys.first().and_then(|k| self.levels.get(k))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of distinct price levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.levels.clear();
    }

    /// Upper-bound position for `price`: after every key that sorts
    /// before or equal to it.
    fn insertion_index(&self, price: &Decimal) -> usize {
        self.keys
            .partition_point(|k| self.ordering.compare(price, k) != Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn store_with(ordering: PriceOrdering, prices: &[i64]) -> PriceLevelStore {
        let mut store = PriceLevelStore::new(ordering);
        for p in prices {
            store.upsert(dec(*p), PriceLevel::new(dec(*p)));
        }
        store
    }

    #[test]
    fn descending_store_orders_highest_first() {
        let store = store_with(PriceOrdering::descending(), &[100, 105, 95, 102]);
        let prices: Vec<Decimal> = store.values().map(PriceLevel::price).collect();
        assert_eq!(prices, vec![dec(105), dec(102), dec(100), dec(95)]);
        assert_eq!(store.best().unwrap().price(), dec(105));
    }

    #[test]
    fn ascending_store_orders_lowest_first() {
        let store = store_with(PriceOrdering::ascending(), &[100, 105, 95, 102]);
        let prices: Vec<Decimal> = store.prices().copied().collect();
        assert_eq!(prices, vec![dec(95), dec(100), dec(102), dec(105)]);
    }

    #[test]
    fn upsert_existing_key_does_not_duplicate() {
        let mut store = store_with(PriceOrdering::ascending(), &[100, 101]);
        store.upsert(dec(100), PriceLevel::new(dec(100)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.prices().count(), 2);
    }

    #[test]
    fn keys_use_exact_decimal_equality() {
        let mut store = PriceLevelStore::new(PriceOrdering::ascending());
        store.upsert(Decimal::new(1000, 1), PriceLevel::new(Decimal::new(1000, 1)));
        // 100.00 == 100.0 exactly, so it is the same level.
        assert!(store.get(&Decimal::new(10000, 2)).is_some());
        store.get_or_insert(Decimal::new(10000, 2));
        assert_eq!(store.len(), 1);
        // 100.00001 is a different level.
        store.get_or_insert(Decimal::new(10_000_001, 5));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_drops_key_and_level() {
        let mut store = store_with(PriceOrdering::descending(), &[100, 105, 95]);
        assert!(store.remove(&dec(100)).is_some());
        assert!(store.remove(&dec(100)).is_none());
        let prices: Vec<Decimal> = store.prices().copied().collect();
        assert_eq!(prices, vec![dec(105), dec(95)]);
    }

    #[test]
    fn get_or_insert_creates_empty_level() {
        let mut store = PriceLevelStore::new(PriceOrdering::ascending());
        assert!(store.is_empty());
        let level = store.get_or_insert(dec(7));
        assert!(level.is_empty());
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
        assert!(store.best().is_none());
    }

    #[test]
    fn ordering_names() {
        assert_eq!(PriceOrdering::descending().name(), "descending");
        assert_eq!(
            PriceOrdering::ascending().compare(&dec(1), &dec(2)),
            Ordering::Less
        );
        assert_eq!(
            PriceOrdering::descending().compare(&dec(1), &dec(2)),
            Ordering::Greater
        );
    }
}
