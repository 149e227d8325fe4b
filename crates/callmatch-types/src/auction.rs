//! Auction cycle types.
//!
//! Each cycle moves through
//! **IDLE → CLEARING → MATCHING → SETTLING → PUBLISHING → IDLE**
//! and produces exactly one [`AuctionResult`].

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AuctionId;

/// Phase of the auction state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// No cycle running; the book accepts placements and cancels.
    Idle,
    /// Reading the book and searching for the clearing price.
    Clearing,
    /// Walking eligible orders and writing the remainder back to the book.
    Matching,
    /// Releasing collateral and logging balance deltas for every fill.
    Settling,
    /// Recording and handing the result to the publisher.
    Publishing,
}

impl AuctionPhase {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Clearing,
            Self::Clearing => Self::Matching,
            Self::Matching => Self::Settling,
            Self::Settling => Self::Publishing,
            Self::Publishing => Self::Idle,
        }
    }
}

impl fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Clearing => write!(f, "CLEARING"),
            Self::Matching => write!(f, "MATCHING"),
            Self::Settling => write!(f, "SETTLING"),
            Self::Publishing => write!(f, "PUBLISHING"),
        }
    }
}

/// Outcome tag of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Completed,
    NoTrades,
    NoOrders,
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::NoTrades => write!(f, "no_trades"),
            Self::NoOrders => write!(f, "no_orders"),
        }
    }
}

/// Immutable result of one auction cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionResult {
    pub auction_id: AuctionId,
    pub clearing_price: Option<Decimal>,
    pub volume: Decimal,
    pub trade_count: usize,
    pub status: AuctionStatus,
    pub completed_at: DateTime<Utc>,
}

impl AuctionResult {
    #[must_use]
    pub fn no_orders(auction_id: AuctionId) -> Self {
        Self {
            auction_id,
            clearing_price: None,
            volume: Decimal::ZERO,
            trade_count: 0,
            status: AuctionStatus::NoOrders,
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn no_trades(auction_id: AuctionId) -> Self {
        Self {
            auction_id,
            clearing_price: None,
            volume: Decimal::ZERO,
            trade_count: 0,
            status: AuctionStatus::NoTrades,
            completed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn completed(
        auction_id: AuctionId,
        clearing_price: Decimal,
        volume: Decimal,
        trade_count: usize,
    ) -> Self {
        Self {
            auction_id,
            clearing_price: Some(clearing_price),
            volume,
            trade_count,
            status: AuctionStatus::Completed,
            completed_at: Utc::now(),
        }
    }
}
