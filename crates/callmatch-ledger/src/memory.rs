//! In-memory [`BalanceLedger`].
//!
//! One `parking_lot::Mutex` guards rows and log together, so every
//! operation is a single read-modify-write and the log never disagrees
//! with the rows it produced. The guard is never held across an `.await`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use callmatch_types::numeric::{checked_add, checked_sum};
use callmatch_types::{
    Asset, Balance, BalanceLogEntry, CallmatchError, LedgerTxType, Result, UserId,
};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::supply::SupplyConservation;
use crate::{BalanceLedger, SettlementLegs};

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(UserId, Asset), Balance>,
    /// Append-only; `entries[i].id == i + 1`.
    entries: Vec<BalanceLogEntry>,
}

impl LedgerState {
    fn append(
        &mut self,
        user: &UserId,
        delta: Decimal,
        tx_type: LedgerTxType,
        asset: Asset,
    ) -> BalanceLogEntry {
        let entry = BalanceLogEntry {
            id: self.entries.len() as u64 + 1,
            user_id: user.clone(),
            asset,
            delta,
            tx_type,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        entry
    }

    fn row(&self, user: &UserId, asset: Asset) -> Option<Balance> {
        self.balances.get(&(user.clone(), asset)).copied()
    }

    fn column_sum(&self, asset: Asset, column: impl Fn(&Balance) -> Decimal) -> Result<Decimal> {
        checked_sum(
            self.balances
                .iter()
                .filter(|((_, a), _)| *a == asset)
                .map(|(_, b)| column(b)),
        )
    }
}

/// Ledger kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log entries for one row, oldest first.
    #[must_use]
    pub fn entries(&self, user: &UserId, asset: Asset) -> Vec<BalanceLogEntry> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id == *user && e.asset == asset)
            .cloned()
            .collect()
    }

    /// The whole log, oldest first.
    #[must_use]
    pub fn all_entries(&self) -> Vec<BalanceLogEntry> {
        self.state.lock().entries.clone()
    }

    /// Σ logged deltas for one row. Always equals the row's `total`.
    pub fn replay_total(&self, user: &UserId, asset: Asset) -> Result<Decimal> {
        checked_sum(
            self.state
                .lock()
                .entries
                .iter()
                .filter(|e| e.user_id == *user && e.asset == asset)
                .map(|e| e.delta),
        )
    }

    /// Σ `total` over every user holding `asset`.
    pub fn total_supply(&self, asset: Asset) -> Result<Decimal> {
        self.state.lock().column_sum(asset, |b| b.total)
    }

    /// Σ `locked` over every user holding `asset`.
    pub fn total_locked(&self, asset: Asset) -> Result<Decimal> {
        self.state.lock().column_sum(asset, |b| b.locked)
    }

    /// Check that supply equals external inflows minus outflows.
    ///
    /// # Errors
    /// - [`CallmatchError::SupplyInvariantViolation`] on mismatch
    /// - [`CallmatchError::ArithmeticOverflow`] if a sum does not fit
    pub fn verify_supply(&self, asset: Asset) -> Result<()> {
        let state = self.state.lock();
        let conservation = SupplyConservation::from_entries(&state.entries)?;
        let actual = state.column_sum(asset, |b| b.total)?;
        conservation.verify(asset, actual)
    }

    /// Check every row: `total == free + locked`, no negatives, and `total`
    /// equal to its replayed log.
    ///
    /// # Errors
    /// [`CallmatchError::SupplyInvariantViolation`] naming the first bad row.
    pub fn verify_rows(&self) -> Result<()> {
        let state = self.state.lock();
        let mut replayed: HashMap<(&UserId, Asset), Decimal> = HashMap::new();
        for e in &state.entries {
            let sum = replayed.entry((&e.user_id, e.asset)).or_default();
            *sum = checked_add(*sum, e.delta)?;
        }
        for ((user, asset), balance) in &state.balances {
            if !balance.is_consistent() {
                return Err(CallmatchError::SupplyInvariantViolation {
                    reason: format!("{user}/{asset}: inconsistent row {balance:?}"),
                });
            }
            let logged = replayed.get(&(user, *asset)).copied().unwrap_or_default();
            if logged != balance.total {
                return Err(CallmatchError::SupplyInvariantViolation {
                    reason: format!("{user}/{asset}: total {} but log sums to {logged}", balance.total),
                });
            }
        }
        Ok(())
    }

    /// Number of balance rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.state.lock().balances.len()
    }
}

fn reject_negative(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CallmatchError::InvalidAmount(amount));
    }
    Ok(())
}

#[async_trait]
impl BalanceLedger for InMemoryLedger {
    async fn lock_balance(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
        reject_negative(amount)?;
        let mut state = self.state.lock();
        let Some(row) = state.balances.get_mut(&(user.clone(), asset)) else {
            tracing::warn!(%user, %asset, %amount, "lock refused: no balance row");
            return Ok(false);
        };
        if row.free < amount {
            tracing::warn!(%user, %asset, %amount, free = %row.free, "lock refused: insufficient free balance");
            return Ok(false);
        }
        row.locked = checked_add(row.locked, amount)?;
        row.free -= amount;
        tracing::debug!(%user, %asset, %amount, "locked");
        Ok(true)
    }

    async fn release_balance(
        &self,
        user: &UserId,
        amount: Decimal,
        asset: Asset,
    ) -> Result<bool> {
        reject_negative(amount)?;
        let mut state = self.state.lock();
        let Some(row) = state.balances.get_mut(&(user.clone(), asset)) else {
            return Ok(false);
        };
        if row.locked < amount {
            tracing::warn!(%user, %asset, %amount, locked = %row.locked, "release refused: insufficient locked balance");
            return Ok(false);
        }
        row.free = checked_add(row.free, amount)?;
        row.locked -= amount;
        tracing::debug!(%user, %asset, %amount, "released");
        Ok(true)
    }

    async fn log(
        &self,
        user: &UserId,
        delta: Decimal,
        tx_type: LedgerTxType,
        asset: Asset,
    ) -> Result<BalanceLogEntry> {
        if delta.is_zero() {
            return Err(CallmatchError::InvalidAmount(delta));
        }
        let mut state = self.state.lock();
        let current = state.row(user, asset).unwrap_or_default();
        let free = checked_add(current.free, delta)?;
        if free < Decimal::ZERO {
            return Err(CallmatchError::BalanceUnderflow);
        }
        let total = checked_add(current.total, delta)?;

        state.balances.insert(
            (user.clone(), asset),
            Balance {
                free,
                total,
                ..current
            },
        );
        let entry = state.append(user, delta, tx_type, asset);
        tracing::debug!(%user, %asset, %delta, %tx_type, entry_id = entry.id, "logged");
        Ok(entry)
    }

    async fn settle_fill(&self, user: &UserId, legs: &SettlementLegs) -> Result<bool> {
        legs.validate()?;
        let mut state = self.state.lock();

        // Legs may share an asset, so they are applied to staged copies and
        // written back only once every leg has succeeded.
        let mut staged: BTreeMap<Asset, Balance> = BTreeMap::new();
        let Some(mut row) = state.row(user, legs.release_asset) else {
            tracing::warn!(%user, asset = %legs.release_asset, "settlement refused: no balance row");
            return Ok(false);
        };
        if row.locked < legs.release {
            tracing::warn!(
                %user,
                asset = %legs.release_asset,
                release = %legs.release,
                locked = %row.locked,
                "settlement refused: insufficient locked balance"
            );
            return Ok(false);
        }
        row.locked -= legs.release;
        row.free = checked_add(row.free, legs.release)?;
        staged.insert(legs.release_asset, row);

        let mut row = staged
            .get(&legs.debit_asset)
            .copied()
            .or_else(|| state.row(user, legs.debit_asset))
            .unwrap_or_default();
        if row.free < legs.debit {
            return Err(CallmatchError::BalanceUnderflow);
        }
        row.free -= legs.debit;
        row.total -= legs.debit;
        staged.insert(legs.debit_asset, row);

        let mut row = staged
            .get(&legs.credit_asset)
            .copied()
            .or_else(|| state.row(user, legs.credit_asset))
            .unwrap_or_default();
        row.free = checked_add(row.free, legs.credit)?;
        row.total = checked_add(row.total, legs.credit)?;
        staged.insert(legs.credit_asset, row);

        for (asset, row) in staged {
            state.balances.insert((user.clone(), asset), row);
        }
        state.append(user, -legs.debit, LedgerTxType::Trade, legs.debit_asset);
        state.append(user, legs.credit, LedgerTxType::Trade, legs.credit_asset);
        tracing::debug!(
            %user,
            released = %legs.release,
            debited = %legs.debit,
            credited = %legs.credit,
            "fill settled"
        );
        Ok(true)
    }

    async fn withdraw(&self, user: &UserId, amount: Decimal, asset: Asset) -> Result<bool> {
        reject_negative(amount)?;
        let mut state = self.state.lock();
        let Some(row) = state.balances.get_mut(&(user.clone(), asset)) else {
            return Ok(false);
        };
        if row.free < amount {
            return Ok(false);
        }
        row.total -= amount;
        row.free -= amount;
        state.append(user, -amount, LedgerTxType::Withdrawal, asset);
        tracing::info!(%user, %asset, %amount, "withdrawn");
        Ok(true)
    }

    async fn balance(&self, user: &UserId, asset: Asset) -> Result<Option<Balance>> {
        Ok(self.state.lock().balances.get(&(user.clone(), asset)).copied())
    }

    async fn balances(&self, user: &UserId) -> Result<Vec<(Asset, Balance)>> {
        let state = self.state.lock();
        Ok(Asset::ALL
            .into_iter()
            .filter_map(|asset| {
                state
                    .balances
                    .get(&(user.clone(), asset))
                    .map(|b| (asset, *b))
            })
            .collect())
    }
}
