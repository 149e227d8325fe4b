//! System-wide constants for the Callmatch engine.

/// Default period between auction cycles, in seconds.
pub const AUCTION_INTERVAL_SECS: u64 = 5;

/// Decimal places intake prices and quantities are rounded to.
pub const DECIMAL_PLACES: u32 = 5;

/// Largest scale `rust_decimal` can represent.
pub const MAX_DECIMAL_PLACES: u32 = 28;

/// Largest quantity one order may carry (10^15).
pub const MAX_ORDER_QUANTITY: i64 = 1_000_000_000_000_000;

/// Largest `price × quantity` one order may carry (10^18).
///
/// Keeps book-wide sums of quantities and notionals far inside `Decimal`
/// range.
pub const MAX_ORDER_NOTIONAL: i64 = 1_000_000_000_000_000_000;

/// Default withdrawal fee, as a fraction of the withdrawn amount (0.1%).
pub const DEFAULT_WITHDRAWAL_FEE_RATE_BPS: i64 = 10;

/// Number of deposit transaction hashes remembered for deduplication.
pub const DEFAULT_DEPOSIT_DEDUP_CAPACITY: usize = 100_000;

/// Number of auction results kept in the audit history.
pub const DEFAULT_AUCTION_HISTORY_CAPACITY: usize = 10_000;

/// Number of settled fills remembered for at-most-once settlement.
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 500_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Callmatch";
