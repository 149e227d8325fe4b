//! # callmatch-types
//!
//! Shared types, errors, and configuration for the **Callmatch** call-auction
//! engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`TradeId`], [`AuctionId`]
//! - **Assets**: [`Asset`], [`Instrument`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderRequest`]
//! - **Trade model**: [`Trade`]
//! - **Auction model**: [`AuctionPhase`], [`AuctionStatus`], [`AuctionResult`]
//! - **Ledger model**: [`Balance`], [`BalanceLogEntry`], [`LedgerTxType`], [`Deposit`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`CallmatchError`] with `CM_ERR_` prefix codes
//! - **Decimal helpers**: [`numeric::quantize`], [`numeric::parse_decimal`],
//!   [`numeric::checked_mul`], [`numeric::checked_sum`]

pub mod asset;
pub mod auction;
pub mod balance;
pub mod config;
pub mod constants;
pub mod deposit;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;

pub use asset::*;
pub use auction::*;
pub use balance::*;
pub use config::*;
pub use deposit::*;
pub use error::*;
pub use ids::*;
pub use order::*;
pub use trade::*;

// Constants and numeric helpers are accessed through their modules.
