//! Error types for the Callmatch engine.
//!
//! All errors use the `CM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / input validation
//! - 2xx: Balance
//! - 5xx: Book and ledger consistency
//! - 6xx: Collaborators (ledger storage, publisher)
//! - 9xx: General / internal

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AuctionId, OrderId};

/// How an error is handled at the auction-cycle boundary.
///
/// Validation errors go back to the immediate caller. Consistency and
/// collaborator errors are logged and contained inside the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Consistency,
    Collaborator,
    Internal,
}

/// Central error enum for all Callmatch operations.
#[derive(Debug, Error)]
pub enum CallmatchError {
    // =================================================================
    // Order / input errors (1xx)
    // =================================================================
    /// The order does not exist, or belongs to someone else.
    #[error("CM_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (missing fields, bad values, etc.).
    #[error("CM_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("CM_ERR_102: Invalid order side: {0}")]
    InvalidSide(String),

    #[error("CM_ERR_103: Invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("CM_ERR_104: Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("CM_ERR_105: Invalid deposit: {reason}")]
    InvalidDeposit { reason: String },

    /// A product or sum does not fit in a `Decimal`.
    #[error("CM_ERR_106: Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    // =================================================================
    // Balance errors (2xx)
    // =================================================================
    /// Not enough free balance to lock or withdraw.
    #[error("CM_ERR_200: Insufficient free balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough locked balance to release.
    #[error("CM_ERR_201: Insufficient locked balance: need {needed}, have {locked}")]
    InsufficientLocked { needed: Decimal, locked: Decimal },

    /// A logged delta would drive the balance negative.
    #[error("CM_ERR_202: Balance underflow")]
    BalanceUnderflow,

    /// Amounts passed to lock/release/withdraw must not be negative.
    #[error("CM_ERR_203: Invalid amount: {0}")]
    InvalidAmount(Decimal),

    // =================================================================
    // Consistency errors (5xx)
    // =================================================================
    /// The id index and the price levels disagree.
    #[error("CM_ERR_500: Book inconsistency: {reason}")]
    BookInconsistency { reason: String },

    /// An order id appeared twice where it must be unique.
    #[error("CM_ERR_501: Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// A fill was settled twice.
    #[error("CM_ERR_502: Fill already settled: {order_id} in {auction_id}")]
    FillAlreadySettled {
        auction_id: AuctionId,
        order_id: OrderId,
    },

    /// Sum of balances no longer matches the deposit/withdrawal history.
    #[error("CM_ERR_503: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Collaborator errors (6xx)
    // =================================================================
    #[error("CM_ERR_600: Ledger storage failure: {0}")]
    LedgerStorage(String),

    #[error("CM_ERR_601: Publish failed: {0}")]
    PublishFailed(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("CM_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("CM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("CM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    #[error("CM_ERR_903: I/O error: {0}")]
    Io(String),
}

impl CallmatchError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OrderNotFound(_)
            | Self::InvalidOrder { .. }
            | Self::InvalidSide(_)
            | Self::InvalidDecimal(_)
            | Self::UnknownAsset(_)
            | Self::InvalidDeposit { .. }
            | Self::ArithmeticOverflow(_)
            | Self::InsufficientBalance { .. }
            | Self::InsufficientLocked { .. }
            | Self::BalanceUnderflow
            | Self::InvalidAmount(_) => ErrorClass::Validation,
            Self::BookInconsistency { .. }
            | Self::DuplicateOrder(_)
            | Self::FillAlreadySettled { .. }
            | Self::SupplyInvariantViolation { .. } => ErrorClass::Consistency,
            Self::LedgerStorage(_) | Self::PublishFailed(_) => ErrorClass::Collaborator,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) | Self::Io(_) => {
                ErrorClass::Internal
            }
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CallmatchError>;

impl From<std::io::Error> for CallmatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CallmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CallmatchError::OrderNotFound(OrderId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("CM_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = CallmatchError::InsufficientBalance {
            needed: Decimal::new(100, 0),
            available: Decimal::new(50, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("CM_ERR_200"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(
            CallmatchError::InvalidSide("X".into()).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            CallmatchError::ArithmeticOverflow("x".into()).class(),
            ErrorClass::Validation
        );
        assert_eq!(
            CallmatchError::BookInconsistency { reason: "x".into() }.class(),
            ErrorClass::Consistency
        );
        assert_eq!(
            CallmatchError::PublishFailed("down".into()).class(),
            ErrorClass::Collaborator
        );
        assert_eq!(
            CallmatchError::Configuration("bad".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn all_errors_have_cm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CallmatchError::BalanceUnderflow),
            Box::new(CallmatchError::InvalidAmount(Decimal::NEGATIVE_ONE)),
            Box::new(CallmatchError::LedgerStorage("db".into())),
            Box::new(CallmatchError::Internal("test".into())),
            Box::new(CallmatchError::FillAlreadySettled {
                auction_id: AuctionId(1),
                order_id: OrderId::new(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CM_ERR_"),
                "Error missing CM_ERR_ prefix: {msg}"
            );
        }
    }
}
