//! Seams between the custody engine and the value-transfer primitive

use crate::ledger::{Transaction, TransferRequest};
use crate::types::{Address, Amount, CustodyError, Payload, TransferError, TxId};

/// Entry points available to code running during a transfer
///
/// Destination code receives one of these and may call straight back into
/// the engine that is paying it.
pub trait CustodyHandle {
    /// Address under which the pool holds custody funds
    fn custody_address(&self) -> &Address;

    fn submit(
        &self,
        caller: &Address,
        destination: Address,
        amount: Amount,
        payload: Payload,
    ) -> Result<TxId, CustodyError>;

    fn approve(&self, caller: &Address, id: TxId) -> Result<(), CustodyError>;

    fn execute(&self, caller: &Address, id: TxId) -> Result<(), CustodyError>;

    fn transaction(&self, id: TxId) -> Option<Transaction>;
}

/// The only path by which value leaves the pool
pub trait TransferPrimitive: Send + Sync {
    /// Saved state restored when an execution rolls back
    type Checkpoint;

    /// Move `request.amount` from the pool to `request.destination`
    ///
    /// May run arbitrary destination code, which may re-enter `custody`.
    fn transfer(
        &self,
        request: &TransferRequest,
        custody: &dyn CustodyHandle,
    ) -> Result<(), TransferError>;

    /// Credit the pool
    fn deposit(&self, from: &Address, amount: Amount) -> Result<(), TransferError>;

    /// Current pool balance
    fn balance(&self) -> Amount;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn rollback(&self, checkpoint: Self::Checkpoint);
}
