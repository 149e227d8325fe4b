//! Composition root: every shared component is built here, once.

use std::sync::Arc;

use callmatch_auction::{
    AuctionEngine, AuctionHistory, AuctionScheduler, LogPublisher, MarginGuard, OrderGateway,
    SchedulerHandle, shared_book,
};
use callmatch_ledger::{BalanceLedger, DepositCreditor, InMemoryLedger, WithdrawalDesk};
use callmatch_types::EngineConfig;

pub struct Node {
    pub config: EngineConfig,
    pub ledger: Arc<InMemoryLedger>,
    pub gateway: OrderGateway,
    pub deposits: DepositCreditor,
    pub withdrawals: WithdrawalDesk,
    pub engine: Arc<AuctionEngine>,
}

impl Node {
    #[must_use]
    pub fn build(config: EngineConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let shared: Arc<dyn BalanceLedger> = ledger.clone();
        let guard = Arc::new(MarginGuard::new(shared.clone(), config.instrument));
        let book = shared_book();
        let history = Arc::new(AuctionHistory::new(config.auction_history_capacity));

        let gateway = OrderGateway::new(book.clone(), guard.clone(), config.decimal_places);
        let engine = Arc::new(AuctionEngine::new(
            book,
            guard,
            Arc::new(LogPublisher),
            history,
        ));
        let deposits = DepositCreditor::new(shared.clone(), config.deposit_dedup_capacity);
        let withdrawals = WithdrawalDesk::new(shared, config.withdrawal_fee_rate);

        Self {
            config,
            ledger,
            gateway,
            deposits,
            withdrawals,
            engine,
        }
    }

    /// Start the periodic auction on the current runtime.
    #[must_use]
    pub fn start_auctions(&self) -> SchedulerHandle {
        AuctionScheduler::spawn(self.engine.clone(), self.config.auction_interval())
    }
}
