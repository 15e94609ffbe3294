//! Transfer proposals awaiting approval
//!
//! A `Transaction` is created by submission, gains approvals one signer at
//! a time, and is marked executed at most once. Records are never deleted.

use crate::types::{Address, Amount, Payload, TxId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a transaction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Waiting for more approvals
    AwaitingApprovals,
    /// Has enough approvals, may be executed
    Ready,
    /// Settled; terminal
    Executed,
}

/// A proposed transfer out of the pool
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Sequence number assigned at submission
    pub id: TxId,
    /// Recipient of the transfer
    pub destination: Address,
    /// Amount to move
    pub amount: Amount,
    /// Data forwarded to the destination
    pub payload: Payload,
    /// Signer that submitted the proposal
    pub submitter: Address,
    /// Signers that approved, in approval order
    pub approvals: Vec<Address>,
    /// Whether the transfer has settled
    pub executed: bool,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
    /// Settlement timestamp
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction with no approvals
    pub fn new(
        id: TxId,
        submitter: Address,
        destination: Address,
        amount: Amount,
        payload: Payload,
    ) -> Self {
        Self {
            id,
            destination,
            amount,
            payload,
            submitter,
            approvals: Vec::new(),
            executed: false,
            submitted_at: Utc::now(),
            executed_at: None,
        }
    }

    pub fn has_approved(&self, signer: &Address) -> bool {
        self.approvals.iter().any(|a| a == signer)
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    /// Check whether the approval count has reached `threshold`
    pub fn meets_threshold(&self, threshold: usize) -> bool {
        self.approvals.len() >= threshold
    }

    pub fn status(&self, threshold: usize) -> TransactionStatus {
        if self.executed {
            TransactionStatus::Executed
        } else if self.meets_threshold(threshold) {
            TransactionStatus::Ready
        } else {
            TransactionStatus::AwaitingApprovals
        }
    }

    /// The request handed to the transfer primitive
    pub fn transfer_request(&self) -> TransferRequest {
        TransferRequest {
            id: self.id,
            destination: self.destination.clone(),
            amount: self.amount,
            payload: self.payload.clone(),
        }
    }
}

/// Arguments of a single value movement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRequest {
    /// Transaction being settled
    pub id: TxId,
    pub destination: Address,
    pub amount: Amount,
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction::new(
            0,
            Address::from("signer1"),
            Address::from("dest"),
            1_000,
            Payload::empty(),
        )
    }

    #[test]
    fn test_new_transaction_is_pending() {
        let tx = sample_tx();

        assert!(!tx.executed);
        assert!(tx.executed_at.is_none());
        assert_eq!(tx.approval_count(), 0);
        assert!(!tx.has_approved(&Address::from("signer1")));
        assert_eq!(tx.status(2), TransactionStatus::AwaitingApprovals);
    }

    #[test]
    fn test_status_follows_threshold() {
        let mut tx = sample_tx();
        tx.approvals.push(Address::from("signer1"));
        assert_eq!(tx.status(2), TransactionStatus::AwaitingApprovals);
        assert_eq!(tx.status(1), TransactionStatus::Ready);

        tx.approvals.push(Address::from("signer2"));
        assert!(tx.meets_threshold(2));
        assert_eq!(tx.status(2), TransactionStatus::Ready);

        tx.executed = true;
        assert_eq!(tx.status(2), TransactionStatus::Executed);
    }

    #[test]
    fn test_transfer_request() {
        let tx = Transaction::new(
            7,
            Address::from("signer1"),
            Address::from("dest"),
            42,
            Payload::from(vec![0xab]),
        );
        let request = tx.transfer_request();

        assert_eq!(request.id, 7);
        assert_eq!(request.destination, Address::from("dest"));
        assert_eq!(request.amount, 42);
        assert_eq!(request.payload.to_hex(), "0xab");
    }
}
