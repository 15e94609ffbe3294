//! Error taxonomy for custody operations

use crate::registry::ConfigurationError;
use crate::types::{Address, Amount, TxId};
use thiserror::Error;

/// Reasons the transfer primitive refuses to move value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Invalid destination: cannot transfer to the custody address itself")]
    SelfTransfer,
    #[error("Destination {destination} rejected the transfer: {reason}")]
    Rejected { destination: Address, reason: String },
    #[error("Balance overflow")]
    Overflow,
}

/// Errors returned by custody operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Not a signer: {0}")]
    NotAuthorized(Address),
    #[error("Transaction not found: {0}")]
    UnknownTransaction(TxId),
    #[error("Transaction already executed: {0}")]
    AlreadyExecuted(TxId),
    #[error("Transaction {id} already approved by {signer}")]
    DuplicateApproval { id: TxId, signer: Address },
    #[error("Not enough approvals for transaction {id}: have {have}, need {need}")]
    InsufficientApprovals { id: TxId, have: usize, need: usize },
    #[error("Transfer for transaction {id} failed: {reason}")]
    TransferFailed {
        id: TxId,
        #[source]
        reason: TransferError,
    },
}

/// Closed set of error kinds callers can branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    NotAuthorized,
    UnknownTransaction,
    AlreadyExecuted,
    DuplicateApproval,
    InsufficientApprovals,
    TransferFailed,
}

impl CustodyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CustodyError::Configuration(_) => ErrorKind::Configuration,
            CustodyError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            CustodyError::UnknownTransaction(_) => ErrorKind::UnknownTransaction,
            CustodyError::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            CustodyError::DuplicateApproval { .. } => ErrorKind::DuplicateApproval,
            CustodyError::InsufficientApprovals { .. } => ErrorKind::InsufficientApprovals,
            CustodyError::TransferFailed { .. } => ErrorKind::TransferFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CustodyError::DuplicateApproval {
            id: 0,
            signer: Address::from("alice"),
        };
        assert_eq!(err.kind(), ErrorKind::DuplicateApproval);
        assert_eq!(err.to_string(), "Transaction 0 already approved by alice");

        let err = CustodyError::from(ConfigurationError::ZeroThreshold);
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_transfer_failure_keeps_source() {
        use std::error::Error as _;

        let err = CustodyError::TransferFailed {
            id: 3,
            reason: TransferError::InsufficientBalance { have: 1, need: 5 },
        };
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("Insufficient balance: have 1, need 5".to_string())
        );
    }
}
