//! # callmatch-matchcore
//!
//! **Pure call-auction core for Callmatch.**
//!
//! The book, the clearing-price search and the matcher. Nothing here
//! touches balances or performs I/O:
//!
//! - **Price-level stores** ordered by an injected comparator per side
//! - **Uniform clearing price**: maximum executable volume, highest price on ties
//! - **Price-time priority**: best price first, FIFO within a level
//! - **Deterministic output**: same book → same trades and trade root

pub mod clearing;
pub mod determinism;
pub mod level_store;
pub mod matcher;
pub mod orderbook;
pub mod price_level;

pub use clearing::{ClearingResult, clear_levels, clear_orders, compute_clearing_price};
pub use determinism::{compute_trade_root, verify_trade_root};
pub use level_store::{PriceLevelStore, PriceOrdering};
pub use matcher::{Fill, MatchOutcome, match_at_clearing, side_volume};
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
