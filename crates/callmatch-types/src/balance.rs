//! Balance types for the ledger.
//!
//! Every (user, asset) balance carries `total`, `free` and `locked` with
//! `total == free + locked`. `locked` backs resting orders; `free` is
//! spendable.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Asset, UserId};

/// One (user, asset) balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub total: Decimal,
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    /// A fresh row created by a first credit of `amount`.
    #[must_use]
    pub fn opened_with(amount: Decimal) -> Self {
        Self {
            total: amount,
            free: amount,
            locked: Decimal::ZERO,
        }
    }

    /// `total == free + locked` and nothing is negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.free + self.locked
            && !self.free.is_sign_negative()
            && !self.locked.is_sign_negative()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total.is_zero() && self.locked.is_zero()
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::opened_with(Decimal::ZERO)
    }
}

/// Why a balance's `total` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerTxType {
    Deposit,
    Withdrawal,
    Fee,
    Trade,
}

impl fmt::Display for LedgerTxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::Fee => write!(f, "FEE"),
            Self::Trade => write!(f, "TRADE"),
        }
    }
}

/// Append-only record of one signed delta applied to a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLogEntry {
    pub id: u64,
    pub user_id: UserId,
    pub asset: Asset,
    pub delta: Decimal,
    pub tx_type: LedgerTxType,
    pub created_at: DateTime<Utc>,
}
