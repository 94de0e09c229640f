//! Curve error types
//!
//! Every rejection leaves the curve untouched: a failing call mutates nothing.

use solana_sdk::pubkey::Pubkey;

use super::ledger::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("payment must be greater than zero")]
    InvalidPayment,
    #[error("payment too small to buy a positive amount at the current price")]
    QuoteTooSmall,
    #[error("slippage exceeded: expected at least {minimum}, got {actual}")]
    SlippageExceeded { minimum: u128, actual: u128 },
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },
    #[error("insufficient supply: requested {requested}, issued {issued}")]
    InsufficientSupply { requested: u128, issued: u128 },
    #[error("trading is closed, the curve has migrated")]
    TradingClosed,
    #[error("reentrant call blocked")]
    ReentrancyBlocked,
    #[error("caller is not the owner")]
    Unauthorized,
    #[error("recovery timelock not expired, unlocks after {unlocks_at}")]
    TimelockNotExpired { unlocks_at: i64 },
    #[error("curve has already migrated")]
    AlreadyMigrated,
    #[error("reserve shortfall: reserve {reserve}, required {required}")]
    ReserveShortfall { reserve: u128, required: u128 },
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("value transfer rejected: {0}")]
    TransferFailed(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("rollback incomplete after {cause}: ledger refused the reversal: {ledger}")]
    RollbackFailed { cause: String, ledger: String },
    #[error("new owner must not be the default address")]
    InvalidOwner,
    #[error("market cap threshold must be greater than zero")]
    InvalidThreshold,
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("creation fee too low: required {required}, provided {provided}")]
    CreationFeeTooLow { required: u128, provided: u128 },
    #[error("curve not found: {0}")]
    CurveNotFound(Pubkey),
    #[error("no liquidity migration pending")]
    MigrationNotPending,
    #[error("snapshot does not match ledger: {0}")]
    SnapshotMismatch(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl CurveError {
    /// A zero-amount quote: nothing to do, not a malfunction
    pub fn is_no_op(&self) -> bool {
        matches!(self, CurveError::QuoteTooSmall)
    }

    /// Invariant violations and programming errors, never user mistakes
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CurveError::ReserveShortfall { .. }
                | CurveError::ArithmeticOverflow
                | CurveError::RollbackFailed { .. }
        )
    }
}

pub type CurveResult<T> = Result<T, CurveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CurveError::QuoteTooSmall.is_no_op());
        assert!(!CurveError::QuoteTooSmall.is_fatal());
        assert!(CurveError::ArithmeticOverflow.is_fatal());
        assert!(CurveError::ReserveShortfall { reserve: 1, required: 2 }.is_fatal());
        assert!(!CurveError::TradingClosed.is_fatal());
        assert!(CurveError::RollbackFailed { cause: "x".into(), ledger: "y".into() }.is_fatal());
        assert!(!CurveError::SlippageExceeded { minimum: 2, actual: 1 }.is_no_op());
    }

    #[test]
    fn test_ledger_error_converts() {
        let err: CurveError = LedgerError::SupplyOverflow.into();
        assert!(matches!(err, CurveError::Ledger(_)));
        assert!(err.to_string().contains("ledger"));
    }
}
