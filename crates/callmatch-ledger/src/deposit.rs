//! Crediting confirmed on-chain deposits.
//!
//! The chain scanner hands over typed [`Deposit`] events. Each transaction
//! hash is credited at most once; the remembered hashes form a bounded
//! FIFO so a long-running node keeps a fixed footprint.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use callmatch_types::{BalanceLogEntry, Deposit, LedgerTxType, Result};
use parking_lot::Mutex;

use crate::BalanceLedger;

/// What happened to a submitted deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    Credited(BalanceLogEntry),
    /// The hash was already credited; nothing changed.
    Duplicate,
}

#[derive(Debug)]
struct SeenHashes {
    set: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenHashes {
    /// `false` if `hash` is already present.
    fn insert(&mut self, hash: &str) -> bool {
        if self.set.contains(hash) {
            return false;
        }
        if self.set.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.set.insert(hash.to_owned());
        self.order.push_back(hash.to_owned());
        true
    }

    fn forget(&mut self, hash: &str) {
        self.set.remove(hash);
        if let Some(pos) = self.order.iter().rposition(|h| h == hash) {
            self.order.remove(pos);
        }
    }
}

/// Credits deposits through [`BalanceLedger::log`] exactly once per hash.
pub struct DepositCreditor {
    ledger: Arc<dyn BalanceLedger>,
    seen: Mutex<SeenHashes>,
}

impl DepositCreditor {
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(ledger: Arc<dyn BalanceLedger>, capacity: usize) -> Self {
        assert!(capacity > 0, "DepositCreditor capacity must be > 0");
        Self {
            ledger,
            seen: Mutex::new(SeenHashes {
                set: HashSet::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Validate and credit `deposit`.
    ///
    /// The hash is claimed before the ledger write and released again if
    /// the write fails, so a concurrent duplicate never double-credits and
    /// a failed credit can be retried.
    pub async fn credit(&self, deposit: &Deposit) -> Result<DepositOutcome> {
        deposit.validate()?;
        if !self.seen.lock().insert(&deposit.tx_hash) {
            tracing::info!(tx_hash = %deposit.tx_hash, "duplicate deposit ignored");
            return Ok(DepositOutcome::Duplicate);
        }

        match self
            .ledger
            .log(
                &deposit.user_id,
                deposit.amount,
                LedgerTxType::Deposit,
                deposit.asset,
            )
            .await
        {
            Ok(entry) => {
                tracing::info!(
                    tx_hash = %deposit.tx_hash,
                    user = %deposit.user_id,
                    asset = %deposit.asset,
                    amount = %deposit.amount,
                    block = deposit.block_number,
                    "deposit credited"
                );
                Ok(DepositOutcome::Credited(entry))
            }
            Err(err) => {
                self.seen.lock().forget(&deposit.tx_hash);
                tracing::error!(tx_hash = %deposit.tx_hash, %err, "deposit credit failed");
                Err(err)
            }
        }
    }

    /// Whether `tx_hash` is currently remembered as credited.
    #[must_use]
    pub fn is_credited(&self, tx_hash: &str) -> bool {
        self.seen.lock().set.contains(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use callmatch_types::{Asset, CallmatchError, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::InMemoryLedger;

    fn deposit(hash: &str, amount: i64) -> Deposit {
        Deposit {
            tx_hash: hash.into(),
            user_id: UserId::from("0xalice"),
            asset: Asset::Quote,
            amount: Decimal::new(amount, 0),
            block_number: 42,
        }
    }

    #[tokio::test]
    async fn credits_once_per_hash() {
        let ledger = Arc::new(InMemoryLedger::new());
        let creditor = DepositCreditor::new(ledger.clone(), 16);

        let first = creditor.credit(&deposit("0x01", 100)).await.unwrap();
        assert!(matches!(first, DepositOutcome::Credited(ref e) if e.tx_type == LedgerTxType::Deposit));
        let again = creditor.credit(&deposit("0x01", 100)).await.unwrap();
        assert_eq!(again, DepositOutcome::Duplicate);

        let user = UserId::from("0xalice");
        let b = ledger.balance(&user, Asset::Quote).await.unwrap().unwrap();
        assert_eq!(b.total, Decimal::new(100, 0));
        assert!(creditor.is_credited("0x01"));
    }

    #[tokio::test]
    async fn invalid_deposits_rejected_and_not_remembered() {
        let ledger = Arc::new(InMemoryLedger::new());
        let creditor = DepositCreditor::new(ledger.clone(), 16);

        let err = creditor.credit(&deposit("0x02", 0)).await.unwrap_err();
        assert!(matches!(err, CallmatchError::InvalidDeposit { .. }));
        assert!(!creditor.is_credited("0x02"));
        assert_eq!(ledger.row_count(), 0);
    }

    #[tokio::test]
    async fn oldest_hash_evicted_at_capacity() {
        let ledger = Arc::new(InMemoryLedger::new());
        let creditor = DepositCreditor::new(ledger, 2);
        creditor.credit(&deposit("0xa", 1)).await.unwrap();
        creditor.credit(&deposit("0xb", 1)).await.unwrap();
        creditor.credit(&deposit("0xc", 1)).await.unwrap();
        assert!(!creditor.is_credited("0xa"));
        assert!(creditor.is_credited("0xb"));
        assert!(creditor.is_credited("0xc"));
    }

    #[test]
    fn forget_releases_claim() {
        let mut seen = SeenHashes {
            set: HashSet::new(),
            order: VecDeque::new(),
            capacity: 4,
        };
        assert!(seen.insert("x"));
        assert!(!seen.insert("x"));
        seen.forget("x");
        assert!(seen.insert("x"));
        assert_eq!(seen.order.len(), 1);
    }
}
