//! The auction engine: one call-auction cycle per [`AuctionEngine::run_auction`].
//!
//! ```text
//! IDLE → CLEARING → MATCHING → SETTLING → PUBLISHING → IDLE
//! ```
//!
//! CLEARING and MATCHING run under the book lock as one critical section:
//! the clearing search sees a consistent snapshot, and the remainder is
//! written back before the lock is released. Orders placed or cancelled
//! later land on the already-updated book. SETTLING and PUBLISHING run
//! outside the lock and never change the committed book.
//!
//! Cycles never overlap. A trigger that arrives while a cycle is still
//! running is skipped, not queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use callmatch_matchcore::{ClearingResult, MatchOutcome, match_at_clearing};
use callmatch_types::{AuctionId, AuctionPhase, AuctionResult, CallmatchError, Trade};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::Instrument as _;

use crate::SharedBook;
use crate::history::AuctionHistory;
use crate::margin_guard::MarginGuard;
use crate::publisher::AuctionPublisher;
use crate::settlement::{SettlementReport, Settler};

/// Everything one cycle produced.
#[derive(Debug, Clone)]
pub struct AuctionReport {
    pub result: AuctionResult,
    pub trades: Vec<Trade>,
    /// Hex trade root, present when the cycle matched.
    pub trade_root: Option<String>,
    pub settlement: SettlementReport,
}

enum Cleared {
    NoOrders,
    NoTrades(ClearingResult),
    /// The clearing search itself failed; the book was not touched.
    Unclearable(CallmatchError),
    Matched(MatchOutcome),
}

pub struct AuctionEngine {
    book: SharedBook,
    settler: Settler,
    publisher: Arc<dyn AuctionPublisher>,
    history: Arc<AuctionHistory>,
    running: AtomicBool,
    last_auction: AtomicU64,
    phase: Mutex<AuctionPhase>,
}

/// Holds the re-entrancy flag for one cycle; drops back to IDLE.
struct RunGuard<'a> {
    engine: &'a AuctionEngine,
}

impl<'a> RunGuard<'a> {
    fn acquire(engine: &'a AuctionEngine) -> Option<Self> {
        engine
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { engine })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.engine.phase.lock() = AuctionPhase::Idle;
        self.engine.running.store(false, Ordering::Release);
    }
}

impl AuctionEngine {
    #[must_use]
    pub fn new(
        book: SharedBook,
        guard: Arc<MarginGuard>,
        publisher: Arc<dyn AuctionPublisher>,
        history: Arc<AuctionHistory>,
    ) -> Self {
        Self::with_settler(book, Settler::new(guard), publisher, history)
    }

    #[must_use]
    pub fn with_settler(
        book: SharedBook,
        settler: Settler,
        publisher: Arc<dyn AuctionPublisher>,
        history: Arc<AuctionHistory>,
    ) -> Self {
        Self {
            book,
            settler,
            publisher,
            history,
            running: AtomicBool::new(false),
            last_auction: AtomicU64::new(0),
            phase: Mutex::new(AuctionPhase::Idle),
        }
    }

    /// Run one cycle. `None` if another cycle is still in progress.
    pub async fn run_auction(&self) -> Option<AuctionReport> {
        let Some(_running) = RunGuard::acquire(self) else {
            tracing::warn!(phase = %self.phase(), "auction skipped: previous cycle still running");
            return None;
        };
        let auction_id = AuctionId(self.last_auction.fetch_add(1, Ordering::AcqRel) + 1);
        let span = tracing::info_span!("auction", %auction_id);
        Some(self.run_cycle(auction_id).instrument(span).await)
    }

    async fn run_cycle(&self, auction_id: AuctionId) -> AuctionReport {
        let (result, trades, trade_root, settlement) = match self.clear_and_match(auction_id) {
            Cleared::NoOrders => {
                tracing::info!("no orders");
                (
                    AuctionResult::no_orders(auction_id),
                    Vec::new(),
                    None,
                    SettlementReport::default(),
                )
            }
            Cleared::NoTrades(clearing) => {
                tracing::info!(best_bid = ?clearing.best_bid, best_ask = ?clearing.best_ask, "no cross");
                (
                    AuctionResult::no_trades(auction_id),
                    Vec::new(),
                    None,
                    SettlementReport::default(),
                )
            }
            Cleared::Unclearable(err) => {
                tracing::error!(%err, "clearing failed; book left as is");
                (
                    AuctionResult::no_trades(auction_id),
                    Vec::new(),
                    None,
                    SettlementReport::default(),
                )
            }
            Cleared::Matched(outcome) => {
                self.set_phase(AuctionPhase::Settling);
                let settlement = self.settler.settle(&outcome).await;
                let result = AuctionResult::completed(
                    auction_id,
                    outcome.clearing_price,
                    outcome.matched_volume,
                    outcome.trades.len(),
                );
                let root = outcome.trade_root_hex();
                (result, outcome.trades, Some(root), settlement)
            }
        };

        self.set_phase(AuctionPhase::Publishing);
        self.publish(&result, &trades).await;
        self.history.record(result.clone());

        tracing::info!(
            status = %result.status,
            clearing_price = ?result.clearing_price,
            volume = %result.volume,
            trades = result.trade_count,
            settled = settlement.settled,
            settlement_failures = settlement.failures.len(),
            "auction finished"
        );
        AuctionReport {
            result,
            trades,
            trade_root,
            settlement,
        }
    }

    /// CLEARING and MATCHING under one hold of the book lock.
    fn clear_and_match(&self, auction_id: AuctionId) -> Cleared {
        let mut book = self.book.lock();
        self.set_phase(AuctionPhase::Clearing);
        if book.is_empty() {
            return Cleared::NoOrders;
        }

        let clearing = match book.find_clearing_price() {
            Ok(clearing) => clearing,
            Err(err) => return Cleared::Unclearable(err),
        };
        let price = match clearing.clearing_price {
            Some(price) if clearing.volume > Decimal::ZERO => price,
            _ => return Cleared::NoTrades(clearing),
        };

        self.set_phase(AuctionPhase::Matching);
        let outcome = match_at_clearing(
            auction_id,
            &book.buy_orders(),
            &book.sell_orders(),
            price,
            clearing.volume,
        );
        if outcome.matched_volume != clearing.volume {
            tracing::error!(
                matched = %outcome.matched_volume,
                expected = %clearing.volume,
                "matched volume differs from clearing volume"
            );
        }

        let rested = book.update_orders(outcome.remaining.clone());
        if let Err(err) = book.check_consistency() {
            tracing::error!(%err, "book inconsistent after recombination");
        }
        tracing::debug!(
            %price,
            volume = %clearing.volume,
            trades = outcome.trades.len(),
            remaining = rested,
            "book committed"
        );
        Cleared::Matched(outcome)
    }

    async fn publish(&self, result: &AuctionResult, trades: &[Trade]) {
        if let Err(err) = self.publisher.publish_auction(result).await {
            tracing::error!(%err, "publishing auction result failed");
        }
        if !trades.is_empty() {
            if let Err(err) = self.publisher.publish_trades(trades).await {
                tracing::error!(%err, count = trades.len(), "publishing trades failed");
            }
        }
    }

    fn set_phase(&self, phase: AuctionPhase) {
        *self.phase.lock() = phase;
        tracing::trace!(%phase, "phase");
    }

    #[must_use]
    pub fn phase(&self) -> AuctionPhase {
        *self.phase.lock()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Id of the most recently started cycle.
    #[must_use]
    pub fn last_auction_id(&self) -> Option<AuctionId> {
        match self.last_auction.load(Ordering::Acquire) {
            0 => None,
            n => Some(AuctionId(n)),
        }
    }

    #[must_use]
    pub fn book(&self) -> &SharedBook {
        &self.book
    }

    #[must_use]
    pub fn history(&self) -> &Arc<AuctionHistory> {
        &self.history
    }
}
