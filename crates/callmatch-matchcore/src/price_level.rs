//! One price on one side of the book: a FIFO queue of resting orders.

use std::collections::VecDeque;

use callmatch_types::numeric::checked_add;
use callmatch_types::{Order, OrderId, Result};
use rust_decimal::Decimal;

/// Resting orders sharing a price, oldest at the front.
///
/// `total_quantity` is kept in step with every push and removal so depth
/// queries never walk the queue.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Decimal,
    queue: VecDeque<Order>,
    total_quantity: Decimal,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            queue: VecDeque::new(),
            total_quantity: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Enqueue behind every order already at this price.
    ///
    /// Leaves the level untouched if the running total would overflow.
    pub fn push_back(&mut self, order: Order) -> Result<()> {
        self.total_quantity = checked_add(self.total_quantity, order.quantity)?;
        self.queue.push_back(order);
        Ok(())
    }

    /// The order with time priority.
    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.queue.front()
    }

    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.total_quantity
    }

    /// Take `order_id` out of the queue, keeping the others in place.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let at = self.queue.iter().position(|o| &o.id == order_id)?;
        let removed = self.queue.remove(at)?;
        self.total_quantity -= removed.quantity;
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.queue.iter().find(|o| &o.id == order_id)
    }

    /// Front to back.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.queue.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use callmatch_types::*;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn resting(qty: i64, sequence: u64) -> Order {
        Order {
            sequence,
            ..Order::dummy_limit(OrderSide::Sell, dec(250), dec(qty))
        }
    }

    #[test]
    fn queue_is_first_in_first_out() {
        let mut level = PriceLevel::new(dec(250));
        let early = resting(4, 7);
        let early_id = early.id;
        level.push_back(early).unwrap();
        level.push_back(resting(2, 9)).unwrap();

        assert_eq!(level.front().map(|o| o.id), Some(early_id));
        let seqs: Vec<u64> = level.orders().map(|o| o.sequence).collect();
        assert_eq!(seqs, vec![7, 9]);
    }

    #[test]
    fn removal_from_the_middle_keeps_order_and_total() {
        let mut level = PriceLevel::new(dec(250));
        let orders: Vec<Order> = [(1, 0), (2, 1), (3, 2)].map(|(q, s)| resting(q, s)).into();
        let middle = orders[1].id;
        for o in orders {
            level.push_back(o).unwrap();
        }
        assert_eq!(level.total_quantity(), dec(6));

        let taken = level.remove_order(&middle).unwrap();
        assert_eq!(taken.quantity, dec(2));
        assert_eq!(level.total_quantity(), dec(4));
        let seqs: Vec<u64> = level.orders().map(|o| o.sequence).collect();
        assert_eq!(seqs, vec![0, 2]);
        assert!(level.get(&middle).is_none());
    }

    #[test]
    fn unknown_id_changes_nothing() {
        let mut level = PriceLevel::new(dec(250));
        level.push_back(resting(3, 0)).unwrap();
        assert!(level.remove_order(&OrderId::new()).is_none());
        assert_eq!((level.len(), level.total_quantity()), (1, dec(3)));
    }

    #[test]
    fn overflowing_total_is_refused() {
        let mut level = PriceLevel::new(dec(250));
        level.push_back(resting(3, 0)).unwrap();
        let mut giant = resting(1, 1);
        giant.quantity = Decimal::MAX;
        assert!(matches!(
            level.push_back(giant),
            Err(CallmatchError::ArithmeticOverflow(_))
        ));
        assert_eq!((level.len(), level.total_quantity()), (1, dec(3)));
    }

    #[test]
    fn draining_leaves_an_empty_level() {
        let mut level = PriceLevel::new(dec(250));
        let only = resting(1, 0);
        let id = only.id;
        level.push_back(only).unwrap();
        level.remove_order(&id);
        assert!(level.is_empty());
        assert!(level.front().is_none());
        assert_eq!(level.total_quantity(), Decimal::ZERO);
        assert_eq!(level.price(), dec(250));
    }
}
