//! # callmatch-ledger
//!
//! Balances for the Callmatch engine.
//!
//! Every `(user, asset)` row holds `total`, `free` and `locked` with
//! `total == free + locked` after every call. `locked` moves only through
//! paired lock/release; `total` moves only through `log` and `withdraw`,
//! each of which appends to the audit log.
//!
//! - [`BalanceLedger`]: the async contract the engine settles against
//! - [`InMemoryLedger`]: the process-local implementation with audit helpers
//! - [`SupplyConservation`]: Σ totals vs. external flows
//! - [`DepositCreditor`] / [`WithdrawalDesk`]: the money-in and money-out edges

pub mod deposit;
pub mod ledger;
pub mod memory;
pub mod supply;
pub mod withdrawal;

pub use deposit::{DepositCreditor, DepositOutcome};
pub use ledger::{BalanceLedger, SettlementLegs};
pub use memory::InMemoryLedger;
pub use supply::SupplyConservation;
pub use withdrawal::{WithdrawalDesk, WithdrawalReceipt};
