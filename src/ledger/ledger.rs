//! Transaction ledger
//!
//! Owns the ordered list of proposals and enforces their state transitions.
//! Caller authorization is checked by `Custody` against the registry before
//! any method here is reached.

use crate::ledger::transaction::{Transaction, TransferRequest};
use crate::registry::Registry;
use crate::storage::StorageError;
use crate::types::{Address, Amount, CustodyError, Payload, TxId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Append-only store of transactions, indexed by id
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    /// Rebuild a ledger from persisted records
    ///
    /// Ids must be dense and in order. Every approval must name a distinct
    /// member of `registry`, and executed records must carry a quorum.
    pub fn from_records(
        transactions: Vec<Transaction>,
        registry: &Registry,
    ) -> Result<Self, StorageError> {
        for (index, tx) in transactions.iter().enumerate() {
            if tx.id != index as TxId {
                return Err(StorageError::InvalidData(format!(
                    "transaction at position {} has id {}",
                    index, tx.id
                )));
            }

            let mut seen = HashSet::new();
            for signer in &tx.approvals {
                if !registry.is_signer(signer) {
                    return Err(StorageError::InvalidData(format!(
                        "transaction {} approved by non-signer {}",
                        tx.id, signer
                    )));
                }
                if !seen.insert(signer) {
                    return Err(StorageError::InvalidData(format!(
                        "transaction {} approved twice by {}",
                        tx.id, signer
                    )));
                }
            }

            if tx.executed != tx.executed_at.is_some() {
                return Err(StorageError::InvalidData(format!(
                    "transaction {} has inconsistent execution state",
                    tx.id
                )));
            }

            if tx.executed && !tx.meets_threshold(registry.threshold()) {
                return Err(StorageError::InvalidData(format!(
                    "transaction {} executed with {} of {} approvals",
                    tx.id,
                    tx.approval_count(),
                    registry.threshold()
                )));
            }
        }

        Ok(Self { transactions })
    }

    /// Append a new pending transaction and return its id
    pub(crate) fn submit(
        &mut self,
        submitter: Address,
        destination: Address,
        amount: Amount,
        payload: Payload,
    ) -> TxId {
        let id = self.transactions.len() as TxId;
        self.transactions
            .push(Transaction::new(id, submitter, destination, amount, payload));
        id
    }

    /// Record `signer`'s approval and return the new approval count
    pub(crate) fn approve(&mut self, id: TxId, signer: &Address) -> Result<usize, CustodyError> {
        let tx = self.get_mut(id)?;

        if tx.executed {
            return Err(CustodyError::AlreadyExecuted(id));
        }

        if tx.has_approved(signer) {
            return Err(CustodyError::DuplicateApproval {
                id,
                signer: signer.clone(),
            });
        }

        tx.approvals.push(signer.clone());
        Ok(tx.approvals.len())
    }

    /// Check quorum and mark the transaction executed in one step
    ///
    /// Returns the request to hand to the transfer primitive. Nothing is
    /// mutated when an error is returned.
    pub(crate) fn begin_execution(
        &mut self,
        id: TxId,
        threshold: usize,
    ) -> Result<TransferRequest, CustodyError> {
        let tx = self.get_mut(id)?;

        if tx.executed {
            return Err(CustodyError::AlreadyExecuted(id));
        }

        if !tx.meets_threshold(threshold) {
            return Err(CustodyError::InsufficientApprovals {
                id,
                have: tx.approval_count(),
                need: threshold,
            });
        }

        tx.executed = true;
        tx.executed_at = Some(Utc::now());
        Ok(tx.transfer_request())
    }

    pub fn get(&self, id: TxId) -> Option<&Transaction> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.transactions.get(index))
    }

    fn get_mut(&mut self, id: TxId) -> Result<&mut Transaction, CustodyError> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.transactions.get_mut(index))
            .ok_or(CustodyError::UnknownTransaction(id))
    }

    /// Look up a transaction, reporting unknown ids as errors
    pub fn require(&self, id: TxId) -> Result<&Transaction, CustodyError> {
        self.get(id).ok_or(CustodyError::UnknownTransaction(id))
    }

    /// Number of submitted transactions, executed or not
    pub fn count(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn list(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn pending(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|tx| !tx.executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CustodyConfig;

    fn signer(n: u8) -> Address {
        Address::from(format!("signer{}", n))
    }

    fn ledger_with_one() -> TransactionLedger {
        let mut ledger = TransactionLedger::new();
        ledger.submit(signer(1), Address::from("dest"), 1, Payload::empty());
        ledger
    }

    #[test]
    fn test_ids_are_dense() {
        let mut ledger = TransactionLedger::new();
        assert!(ledger.is_empty());

        for expected in 0..5 {
            let id = ledger.submit(signer(1), Address::from("dest"), 10, Payload::empty());
            assert_eq!(id, expected);
        }
        assert_eq!(ledger.count(), 5);
        assert_eq!(ledger.get(4).map(|tx| tx.id), Some(4));
        assert!(ledger.get(5).is_none());
    }

    #[test]
    fn test_submission_does_not_approve() {
        let ledger = ledger_with_one();
        let tx = ledger.get(0).unwrap();

        assert_eq!(tx.submitter, signer(1));
        assert_eq!(tx.approval_count(), 0);
    }

    #[test]
    fn test_approve_rejects_duplicates() {
        let mut ledger = ledger_with_one();

        assert_eq!(ledger.approve(0, &signer(2)), Ok(1));
        assert_eq!(
            ledger.approve(0, &signer(2)),
            Err(CustodyError::DuplicateApproval {
                id: 0,
                signer: signer(2)
            })
        );
        assert_eq!(ledger.get(0).unwrap().approval_count(), 1);
        assert_eq!(ledger.approve(0, &signer(1)), Ok(2));
    }

    #[test]
    fn test_approve_unknown() {
        let mut ledger = ledger_with_one();
        assert_eq!(
            ledger.approve(9, &signer(1)),
            Err(CustodyError::UnknownTransaction(9))
        );
    }

    #[test]
    fn test_begin_execution_checks_quorum() {
        let mut ledger = ledger_with_one();
        ledger.approve(0, &signer(2)).unwrap();

        assert_eq!(
            ledger.begin_execution(0, 2),
            Err(CustodyError::InsufficientApprovals {
                id: 0,
                have: 1,
                need: 2
            })
        );
        assert!(!ledger.get(0).unwrap().executed);

        ledger.approve(0, &signer(1)).unwrap();
        let request = ledger.begin_execution(0, 2).unwrap();
        assert_eq!(request.id, 0);
        assert_eq!(request.amount, 1);

        let tx = ledger.get(0).unwrap();
        assert!(tx.executed);
        assert!(tx.executed_at.is_some());
    }

    #[test]
    fn test_executed_is_terminal() {
        let mut ledger = ledger_with_one();
        ledger.approve(0, &signer(1)).unwrap();
        ledger.begin_execution(0, 1).unwrap();

        assert_eq!(
            ledger.begin_execution(0, 1),
            Err(CustodyError::AlreadyExecuted(0))
        );
        assert_eq!(
            ledger.approve(0, &signer(3)),
            Err(CustodyError::AlreadyExecuted(0))
        );
        assert_eq!(ledger.get(0).unwrap().approval_count(), 1);
        assert_eq!(ledger.pending().count(), 0);
    }

    #[test]
    fn test_from_records_validation() {
        let registry = Registry::new(CustodyConfig::new(vec![signer(1), signer(2)], 2)).unwrap();

        let mut ledger = ledger_with_one();
        ledger.approve(0, &signer(1)).unwrap();
        ledger.submit(signer(2), Address::from("dest"), 2, Payload::empty());
        let restored = TransactionLedger::from_records(ledger.list().to_vec(), &registry).unwrap();
        assert_eq!(restored.count(), 2);

        let mut gap = ledger.list().to_vec();
        gap.remove(0);
        assert!(TransactionLedger::from_records(gap, &registry).is_err());

        let mut outsider = ledger.list().to_vec();
        outsider[1].approvals.push(Address::from("mallory"));
        assert!(TransactionLedger::from_records(outsider, &registry).is_err());

        let mut doubled = ledger.list().to_vec();
        doubled[0].approvals.push(signer(1));
        assert!(TransactionLedger::from_records(doubled, &registry).is_err());

        let mut half_done = ledger.list().to_vec();
        half_done[0].executed = true;
        assert!(TransactionLedger::from_records(half_done, &registry).is_err());

        // tx 0 carries one approval against a threshold of two
        let mut unsettled = ledger.list().to_vec();
        unsettled[0].executed = true;
        unsettled[0].executed_at = Some(Utc::now());
        assert!(matches!(
            TransactionLedger::from_records(unsettled.clone(), &registry),
            Err(StorageError::InvalidData(_))
        ));

        unsettled[0].approvals.push(signer(2));
        assert!(TransactionLedger::from_records(unsettled, &registry).is_ok());
    }
}
