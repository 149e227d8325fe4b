//! Outbound notification of auction outcomes.
//!
//! Publishing is best-effort. By the time a publisher runs, the book and
//! the ledger are already committed and nothing is rolled back on error.

use async_trait::async_trait;
use callmatch_types::{AuctionResult, Result, Trade};

/// Receives every cycle's result and, when non-empty, its trades.
#[async_trait]
pub trait AuctionPublisher: Send + Sync {
    async fn publish_auction(&self, result: &AuctionResult) -> Result<()>;

    /// Never called with an empty slice.
    async fn publish_trades(&self, trades: &[Trade]) -> Result<()>;
}

/// Publishes as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl AuctionPublisher for LogPublisher {
    async fn publish_auction(&self, result: &AuctionResult) -> Result<()> {
        tracing::info!(
            auction_id = %result.auction_id,
            status = %result.status,
            clearing_price = ?result.clearing_price,
            volume = %result.volume,
            trades = result.trade_count,
            "auction published"
        );
        Ok(())
    }

    async fn publish_trades(&self, trades: &[Trade]) -> Result<()> {
        for trade in trades {
            tracing::info!(
                trade_id = %trade.id,
                auction_id = %trade.auction_id,
                buyer = %trade.buyer_id,
                seller = %trade.seller_id,
                price = %trade.price,
                quantity = %trade.quantity,
                "trade published"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use callmatch_types::AuctionId;

    use super::*;

    #[tokio::test]
    async fn log_publisher_never_fails() {
        let publisher = LogPublisher;
        publisher
            .publish_auction(&AuctionResult::no_orders(AuctionId(1)))
            .await
            .unwrap();
        publisher.publish_trades(&[]).await.unwrap();
    }
}
