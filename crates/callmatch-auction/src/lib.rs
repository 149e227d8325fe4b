//! # callmatch-auction
//!
//! **Auction plane for Callmatch.**
//!
//! Wires the pure matching core to the balance ledger:
//!
//! 1. [`OrderGateway`] quantizes and validates intake, locks collateral
//!    through the [`MarginGuard`], then rests the order
//! 2. [`AuctionEngine`] runs one cycle: clear, match, commit the book,
//!    settle every fill, publish
//! 3. [`AuctionScheduler`] triggers a cycle every period and never lets
//!    two overlap
//!
//! The book is shared as a [`SharedBook`]. Its lock is never held across
//! an `.await`.

use std::sync::Arc;

use callmatch_matchcore::OrderBook;
use parking_lot::Mutex;

pub mod engine;
pub mod gateway;
pub mod history;
pub mod idempotency;
pub mod margin_guard;
pub mod publisher;
pub mod scheduler;
pub mod settlement;

pub use engine::{AuctionEngine, AuctionReport};
pub use gateway::OrderGateway;
pub use history::AuctionHistory;
pub use idempotency::IdempotencyGuard;
pub use margin_guard::MarginGuard;
pub use publisher::{AuctionPublisher, LogPublisher};
pub use scheduler::{AuctionScheduler, SchedulerHandle, SchedulerStats};
pub use settlement::{SettlementFailure, SettlementReport, Settler};

/// The one order book, shared by intake and the auction engine.
pub type SharedBook = Arc<Mutex<OrderBook>>;

/// An empty [`SharedBook`].
#[must_use]
pub fn shared_book() -> SharedBook {
    Arc::new(Mutex::new(OrderBook::new()))
}
