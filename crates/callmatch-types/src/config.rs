//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CallmatchError, Instrument, Result, constants};

/// Configuration of one engine process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The traded pair.
    pub instrument: Instrument,
    /// Seconds between auction cycles.
    pub auction_interval_secs: u64,
    /// Decimal places intake prices and quantities are rounded to.
    pub decimal_places: u32,
    /// Fraction of each withdrawal kept as fee, in `[0, 1)`.
    pub withdrawal_fee_rate: Decimal,
    /// Deposit hashes remembered for deduplication.
    pub deposit_dedup_capacity: usize,
    /// Auction results retained in the audit history.
    pub auction_history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::main(),
            auction_interval_secs: constants::AUCTION_INTERVAL_SECS,
            decimal_places: constants::DECIMAL_PLACES,
            withdrawal_fee_rate: Decimal::new(constants::DEFAULT_WITHDRAWAL_FEE_RATE_BPS, 4),
            deposit_dedup_capacity: constants::DEFAULT_DEPOSIT_DEDUP_CAPACITY,
            auction_history_capacity: constants::DEFAULT_AUCTION_HISTORY_CAPACITY,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn auction_interval(&self) -> Duration {
        Duration::from_secs(self.auction_interval_secs)
    }

    /// # Errors
    /// Returns [`CallmatchError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.auction_interval_secs == 0 {
            return Err(CallmatchError::Configuration(
                "auction_interval_secs must be at least 1".into(),
            ));
        }
        if self.decimal_places > constants::MAX_DECIMAL_PLACES {
            return Err(CallmatchError::Configuration(format!(
                "decimal_places must be at most {}",
                constants::MAX_DECIMAL_PLACES
            )));
        }
        if self.withdrawal_fee_rate.is_sign_negative() || self.withdrawal_fee_rate >= Decimal::ONE {
            return Err(CallmatchError::Configuration(format!(
                "withdrawal_fee_rate must be in [0, 1), got {}",
                self.withdrawal_fee_rate
            )));
        }
        if self.deposit_dedup_capacity == 0 || self.auction_history_capacity == 0 {
            return Err(CallmatchError::Configuration(
                "capacities must be non-zero".into(),
            ));
        }
        if self.instrument.base == self.instrument.quote {
            return Err(CallmatchError::Configuration(
                "instrument base and quote must differ".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CallmatchError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
