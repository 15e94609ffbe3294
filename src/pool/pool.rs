//! In-memory custody pool
//!
//! Balances per address, with the custody address holding the pooled funds.
//! Implements `TransferPrimitive` so the engine can move value out of it.

use crate::custody::{CustodyHandle, TransferPrimitive};
use crate::ledger::TransferRequest;
use crate::pool::receiver::Receiver;
use crate::types::{Address, Amount, TransferError, TxId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Number of transfer records kept in history
pub const MAX_HISTORY: usize = 100;

/// A completed movement of value out of the pool
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    pub id: TxId,
    pub destination: Address,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

/// Balances and history; the unit of checkpoint and rollback
#[derive(Clone, Debug, Default)]
pub struct PoolState {
    balances: HashMap<Address, Amount>,
    history: Vec<TransferRecord>,
}

impl PoolState {
    fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn credit(&mut self, address: &Address, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balances.entry(address.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TransferError::Overflow)?;
        Ok(())
    }
}

/// Single-asset pool with optional programmable destinations
pub struct Pool {
    owner: Address,
    state: Mutex<PoolState>,
    receivers: Mutex<HashMap<Address, Arc<dyn Receiver>>>,
}

impl Pool {
    /// Create an empty pool holding funds under `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            state: Mutex::new(PoolState::default()),
            receivers: Mutex::new(HashMap::new()),
        }
    }

    /// Address holding the pooled funds
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Get balance of an address
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.state.lock().balance_of(address)
    }

    /// Attach code that runs whenever `address` is paid
    pub fn register_receiver<R: Receiver + 'static>(&self, address: Address, receiver: R) {
        log::debug!("Receiver registered for {}", address);
        self.receivers.lock().insert(address, Arc::new(receiver));
    }

    pub fn remove_receiver(&self, address: &Address) -> bool {
        self.receivers.lock().remove(address).is_some()
    }

    /// Most recent transfers, oldest first
    pub fn history(&self) -> Vec<TransferRecord> {
        self.state.lock().history.clone()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("owner", &self.owner)
            .field("balance", &self.balance_of(&self.owner))
            .field("receivers", &self.receivers.lock().len())
            .finish()
    }
}

impl TransferPrimitive for Pool {
    type Checkpoint = PoolState;

    fn transfer(
        &self,
        request: &TransferRequest,
        custody: &dyn CustodyHandle,
    ) -> Result<(), TransferError> {
        if request.destination == self.owner {
            return Err(TransferError::SelfTransfer);
        }

        {
            let mut state = self.state.lock();
            let have = state.balance_of(&self.owner);
            if have < request.amount {
                return Err(TransferError::InsufficientBalance {
                    have,
                    need: request.amount,
                });
            }

            state.credit(&request.destination, request.amount)?;
            state.balances.insert(self.owner.clone(), have - request.amount);

            state.history.push(TransferRecord {
                id: request.id,
                destination: request.destination.clone(),
                amount: request.amount,
                timestamp: Utc::now(),
            });
            if state.history.len() > MAX_HISTORY {
                state.history.remove(0);
            }
        }

        // Locks are released before destination code runs, so it may re-enter.
        let receiver = self.receivers.lock().get(&request.destination).cloned();
        if let Some(receiver) = receiver {
            receiver
                .on_receive(custody, request)
                .map_err(|reason| TransferError::Rejected {
                    destination: request.destination.clone(),
                    reason,
                })?;
        }

        Ok(())
    }

    fn deposit(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::InvalidAmount);
        }

        self.state.lock().credit(&self.owner, amount)?;
        log::debug!("Pool {} credited {} by {}", self.owner, amount, from);
        Ok(())
    }

    fn balance(&self) -> Amount {
        self.balance_of(&self.owner)
    }

    fn checkpoint(&self) -> PoolState {
        self.state.lock().clone()
    }

    fn rollback(&self, checkpoint: PoolState) {
        *self.state.lock() = checkpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Transaction;
    use crate::pool::{RejectAll, RequirePayload};
    use crate::types::{CustodyError, Payload};

    /// Handle for driving the pool without an engine behind it
    struct Detached(Address);

    impl CustodyHandle for Detached {
        fn custody_address(&self) -> &Address {
            &self.0
        }

        fn submit(
            &self,
            caller: &Address,
            _: Address,
            _: Amount,
            _: Payload,
        ) -> Result<TxId, CustodyError> {
            Err(CustodyError::NotAuthorized(caller.clone()))
        }

        fn approve(&self, caller: &Address, _: TxId) -> Result<(), CustodyError> {
            Err(CustodyError::NotAuthorized(caller.clone()))
        }

        fn execute(&self, _: &Address, id: TxId) -> Result<(), CustodyError> {
            Err(CustodyError::UnknownTransaction(id))
        }

        fn transaction(&self, _: TxId) -> Option<Transaction> {
            None
        }
    }

    fn request(destination: &str, amount: Amount) -> TransferRequest {
        TransferRequest {
            id: 0,
            destination: Address::from(destination),
            amount,
            payload: Payload::empty(),
        }
    }

    fn funded_pool(amount: Amount) -> (Pool, Detached) {
        let owner = Address::from("vault");
        let pool = Pool::new(owner.clone());
        pool.deposit(&Address::from("funder"), amount).unwrap();
        (pool, Detached(owner))
    }

    #[test]
    fn test_deposit() {
        let (pool, _) = funded_pool(10);
        assert_eq!(pool.balance(), 10);

        pool.deposit(&Address::from("funder"), 5).unwrap();
        assert_eq!(pool.balance(), 15);
        assert_eq!(
            pool.deposit(&Address::from("funder"), 0),
            Err(TransferError::InvalidAmount)
        );
    }

    #[test]
    fn test_transfer_moves_value() {
        let (pool, handle) = funded_pool(10);

        pool.transfer(&request("bob", 4), &handle).unwrap();

        assert_eq!(pool.balance(), 6);
        assert_eq!(pool.balance_of(&Address::from("bob")), 4);
        assert_eq!(pool.history().len(), 1);
        assert_eq!(pool.history()[0].amount, 4);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let (pool, handle) = funded_pool(3);

        assert_eq!(
            pool.transfer(&request("bob", 4), &handle),
            Err(TransferError::InsufficientBalance { have: 3, need: 4 })
        );
        assert_eq!(pool.balance(), 3);
        assert!(pool.history().is_empty());
    }

    #[test]
    fn test_self_transfer_rejected() {
        let (pool, handle) = funded_pool(3);
        assert_eq!(
            pool.transfer(&request("vault", 1), &handle),
            Err(TransferError::SelfTransfer)
        );
    }

    #[test]
    fn test_zero_amount_transfer() {
        let (pool, handle) = funded_pool(3);
        pool.transfer(&request("bob", 0), &handle).unwrap();
        assert_eq!(pool.balance(), 3);
    }

    #[test]
    fn test_receiver_rejection() {
        let (pool, handle) = funded_pool(10);
        pool.register_receiver(Address::from("wall"), RejectAll::new("closed"));

        assert_eq!(
            pool.transfer(&request("wall", 1), &handle),
            Err(TransferError::Rejected {
                destination: Address::from("wall"),
                reason: "closed".to_string()
            })
        );

        assert!(pool.remove_receiver(&Address::from("wall")));
        assert!(!pool.remove_receiver(&Address::from("wall")));
    }

    #[test]
    fn test_payload_forwarded_to_receiver() {
        let (pool, handle) = funded_pool(10);
        pool.register_receiver(Address::from("gate"), RequirePayload);

        assert!(pool.transfer(&request("gate", 1), &handle).is_err());

        let mut with_payload = request("gate", 1);
        with_payload.payload = Payload::from(vec![1u8]);
        assert!(pool.transfer(&with_payload, &handle).is_ok());
    }

    #[test]
    fn test_checkpoint_rollback() {
        let (pool, handle) = funded_pool(10);
        let checkpoint = pool.checkpoint();

        pool.transfer(&request("bob", 7), &handle).unwrap();
        assert_eq!(pool.balance(), 3);

        pool.rollback(checkpoint);
        assert_eq!(pool.balance(), 10);
        assert_eq!(pool.balance_of(&Address::from("bob")), 0);
        assert!(pool.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let (pool, handle) = funded_pool(1_000);
        for _ in 0..(MAX_HISTORY + 5) {
            pool.transfer(&request("bob", 1), &handle).unwrap();
        }
        assert_eq!(pool.history().len(), MAX_HISTORY);
    }
}
