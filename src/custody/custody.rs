//! Custody engine
//!
//! Ties the registry, the transaction ledger and the transfer primitive
//! together behind one context object. Every mutator runs under a
//! re-entrant lock, so calls from different threads are linearizable while
//! destination code running during a transfer can still call back in.
//!
//! Execution is all-or-nothing: the ledger, the pool and the pending event
//! outbox are checkpointed before a transaction is marked executed, and all
//! three are restored if the transfer fails or unwinds. That includes
//! anything a re-entrant caller did in the meantime.
//!
//! The transfer primitive is owned by the engine and never handed out, so
//! value leaves the pool only through `execute`.

use crate::custody::handle::{CustodyHandle, TransferPrimitive};
use crate::ledger::{
    CustodyEvent, EventBroadcaster, Transaction, TransactionLedger, TransactionStatus,
};
use crate::pool::{Pool, Receiver, TransferRecord};
use crate::registry::{ConfigurationError, CustodyConfig, Registry};
use crate::storage::{LedgerSnapshot, StorageError};
use crate::types::{Address, Amount, CustodyError, Payload, TransferError, TxId};
use chrono::Utc;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use tokio::sync::broadcast;

/// State restored wholesale when an execution rolls back
#[derive(Clone, Debug, Default)]
struct LedgerState {
    ledger: TransactionLedger,
    /// Events from the current outermost operation, not yet published
    outbox: Vec<CustodyEvent>,
}

#[derive(Debug, Default)]
struct Session {
    state: LedgerState,
    /// Nesting depth of in-flight operations on the lock-holding thread
    depth: usize,
}

/// One level of operation nesting
///
/// Released on return and on unwind alike. Leaving the outermost level
/// publishes the events committed so far.
struct Nesting<'a> {
    session: &'a RefCell<Session>,
    events: &'a EventBroadcaster,
}

impl<'a> Nesting<'a> {
    fn enter(session: &'a RefCell<Session>, events: &'a EventBroadcaster) -> Self {
        session.borrow_mut().depth += 1;
        Self { session, events }
    }
}

impl Drop for Nesting<'_> {
    fn drop(&mut self) {
        let committed = match self.session.try_borrow_mut() {
            Ok(mut session) => {
                session.depth -= 1;
                if session.depth == 0 {
                    std::mem::take(&mut session.state.outbox)
                } else {
                    Vec::new()
                }
            }
            Err(_) => return,
        };
        for event in committed {
            self.events.broadcast(event);
        }
    }
}

/// Checkpoints taken before a transfer, restored on drop unless committed
struct Rollback<'a, P: TransferPrimitive> {
    session: &'a RefCell<Session>,
    primitive: &'a P,
    saved: Option<(LedgerState, P::Checkpoint)>,
}

impl<P: TransferPrimitive> Rollback<'_, P> {
    fn commit(mut self) {
        self.saved = None;
    }
}

impl<P: TransferPrimitive> Drop for Rollback<'_, P> {
    fn drop(&mut self) {
        if let Some((state, checkpoint)) = self.saved.take() {
            self.primitive.rollback(checkpoint);
            if let Ok(mut session) = self.session.try_borrow_mut() {
                session.state = state;
            }
        }
    }
}

/// M-of-N custody over a single pool of value
pub struct Custody<P: TransferPrimitive = Pool> {
    registry: Registry,
    session: ReentrantMutex<RefCell<Session>>,
    primitive: P,
    events: EventBroadcaster,
}

impl Custody<Pool> {
    /// Build an engine backed by a fresh in-memory pool
    pub fn with_pool(config: CustodyConfig) -> Result<Self, ConfigurationError> {
        let registry = Registry::new(config)?;
        let pool = Pool::new(registry.address().clone());
        Ok(Self::from_parts(registry, TransactionLedger::new(), pool))
    }

    /// Rebuild an engine from a snapshot with an empty in-memory pool
    pub fn restore_with_pool(snapshot: LedgerSnapshot) -> Result<Self, StorageError> {
        let registry = Registry::new(snapshot.config)?;
        let ledger = TransactionLedger::from_records(snapshot.transactions, &registry)?;
        let pool = Pool::new(registry.address().clone());
        Ok(Self::from_parts(registry, ledger, pool))
    }

    /// Balance held by `account` in the pool's book
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.primitive.balance_of(account)
    }

    /// Most recent settled transfers, oldest first
    pub fn transfer_history(&self) -> Vec<TransferRecord> {
        self.primitive.history()
    }

    /// Attach destination code that runs when `address` is paid
    pub fn register_receiver<R: Receiver + 'static>(&self, address: Address, receiver: R) {
        self.primitive.register_receiver(address, receiver);
    }

    pub fn remove_receiver(&self, address: &Address) -> bool {
        self.primitive.remove_receiver(address)
    }
}

impl<P: TransferPrimitive> Custody<P> {
    /// Build an engine over an external transfer primitive
    ///
    /// # Errors
    /// Returns a `ConfigurationError` if the signer set or threshold is invalid.
    pub fn new(config: CustodyConfig, primitive: P) -> Result<Self, ConfigurationError> {
        let registry = Registry::new(config)?;
        Ok(Self::from_parts(registry, TransactionLedger::new(), primitive))
    }

    /// Rebuild an engine from a persisted snapshot
    pub fn restore(snapshot: LedgerSnapshot, primitive: P) -> Result<Self, StorageError> {
        let registry = Registry::new(snapshot.config)?;
        let ledger = TransactionLedger::from_records(snapshot.transactions, &registry)?;
        Ok(Self::from_parts(registry, ledger, primitive))
    }

    fn from_parts(registry: Registry, ledger: TransactionLedger, primitive: P) -> Self {
        Self {
            registry,
            session: ReentrantMutex::new(RefCell::new(Session {
                state: LedgerState {
                    ledger,
                    outbox: Vec::new(),
                },
                depth: 0,
            })),
            primitive,
            events: EventBroadcaster::new(),
        }
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Propose a transfer out of the pool
    ///
    /// The submission does not count as the submitter's approval.
    pub fn submit(
        &self,
        caller: &Address,
        destination: Address,
        amount: Amount,
        payload: Payload,
    ) -> Result<TxId, CustodyError> {
        self.authorize(caller)?;

        self.operate(|session| {
            let mut session = session.borrow_mut();
            let state = &mut session.state;
            let id = state
                .ledger
                .submit(caller.clone(), destination.clone(), amount, payload);

            log::info!(
                "Transaction {} submitted by {}: {} to {}",
                id,
                caller,
                amount,
                destination
            );
            state.outbox.push(CustodyEvent::Submitted {
                id,
                destination,
                amount,
            });
            Ok(id)
        })
    }

    /// Record `caller`'s approval of a pending transaction
    pub fn approve(&self, caller: &Address, id: TxId) -> Result<(), CustodyError> {
        self.authorize(caller)?;

        self.operate(|session| {
            let mut session = session.borrow_mut();
            let state = &mut session.state;
            let approvals = state.ledger.approve(id, caller)?;

            log::debug!(
                "Transaction {} approved by {} ({}/{})",
                id,
                caller,
                approvals,
                self.registry.threshold()
            );
            state.outbox.push(CustodyEvent::Approved {
                id,
                signer: caller.clone(),
                approvals,
            });
            Ok(())
        })
    }

    /// Settle a transaction that has reached quorum
    ///
    /// Anyone may trigger execution. The transaction is marked executed
    /// before the transfer primitive runs, so any re-entrant call for the
    /// same id sees it as settled.
    pub fn execute(&self, caller: &Address, id: TxId) -> Result<(), CustodyError> {
        self.operate(|session| {
            let threshold = self.registry.threshold();

            let (request, checkpoint) = {
                let mut session = session.borrow_mut();
                let checkpoint = session.state.clone();
                let request = session.state.ledger.begin_execution(id, threshold)?;
                (request, checkpoint)
            };
            let rollback = Rollback {
                session,
                primitive: &self.primitive,
                saved: Some((checkpoint, self.primitive.checkpoint())),
            };

            log::debug!("Transaction {} checkpointed, transferring", id);

            // No ledger borrow is held here; destination code may re-enter.
            match self.primitive.transfer(&request, self) {
                Ok(()) => {
                    rollback.commit();
                    log::info!(
                        "Transaction {} executed by {}: {} to {}",
                        id,
                        caller,
                        request.amount,
                        request.destination
                    );
                    session
                        .borrow_mut()
                        .state
                        .outbox
                        .push(CustodyEvent::Executed { id });
                    Ok(())
                }
                Err(reason) => {
                    drop(rollback);

                    log::warn!("Transaction {} rolled back: {}", id, reason);
                    Err(CustodyError::TransferFailed { id, reason })
                }
            }
        })
    }

    /// Add value to the pool
    pub fn deposit(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        self.operate(|session| {
            self.primitive.deposit(from, amount)?;

            log::info!("Deposit of {} from {}", amount, from);
            session
                .borrow_mut()
                .state
                .outbox
                .push(CustodyEvent::Deposited {
                    from: from.clone(),
                    amount,
                });
            Ok(())
        })
    }

    fn authorize(&self, caller: &Address) -> Result<(), CustodyError> {
        if self.registry.is_signer(caller) {
            Ok(())
        } else {
            log::warn!("Rejected call from non-signer {}", caller);
            Err(CustodyError::NotAuthorized(caller.clone()))
        }
    }

    /// Run `op` under the session lock
    ///
    /// Committed events are published once the outermost operation returns.
    fn operate<T, E>(&self, op: impl FnOnce(&RefCell<Session>) -> Result<T, E>) -> Result<T, E> {
        let guard = self.session.lock();
        let _nesting = Nesting::enter(&guard, &self.events);
        op(&*guard)
    }

    fn read<T>(&self, f: impl FnOnce(&TransactionLedger) -> T) -> T {
        let guard = self.session.lock();
        let session = guard.borrow();
        f(&session.state.ledger)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn address(&self) -> &Address {
        self.registry.address()
    }

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.registry.is_signer(identity)
    }

    pub fn threshold(&self) -> usize {
        self.registry.threshold()
    }

    pub fn signer_at(&self, index: usize) -> Option<&Address> {
        self.registry.signer_at(index)
    }

    pub fn signer_count(&self) -> usize {
        self.registry.signer_count()
    }

    /// Pool balance as reported by the transfer primitive
    pub fn balance(&self) -> Amount {
        self.primitive.balance()
    }

    /// Number of submitted transactions, executed or not
    pub fn transaction_count(&self) -> usize {
        self.read(|ledger| ledger.count())
    }

    pub fn transaction(&self, id: TxId) -> Option<Transaction> {
        self.read(|ledger| ledger.get(id).cloned())
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.read(|ledger| ledger.list().to_vec())
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.read(|ledger| ledger.pending().cloned().collect())
    }

    fn inspect<T>(&self, id: TxId, f: impl FnOnce(&Transaction) -> T) -> Result<T, CustodyError> {
        self.read(|ledger| ledger.require(id).map(f))
    }

    pub fn destination(&self, id: TxId) -> Result<Address, CustodyError> {
        self.inspect(id, |tx| tx.destination.clone())
    }

    pub fn amount(&self, id: TxId) -> Result<Amount, CustodyError> {
        self.inspect(id, |tx| tx.amount)
    }

    pub fn payload(&self, id: TxId) -> Result<Payload, CustodyError> {
        self.inspect(id, |tx| tx.payload.clone())
    }

    pub fn is_executed(&self, id: TxId) -> Result<bool, CustodyError> {
        self.inspect(id, |tx| tx.executed)
    }

    pub fn has_approved(&self, id: TxId, signer: &Address) -> Result<bool, CustodyError> {
        self.inspect(id, |tx| tx.has_approved(signer))
    }

    pub fn approvals(&self, id: TxId) -> Result<Vec<Address>, CustodyError> {
        self.inspect(id, |tx| tx.approvals.clone())
    }

    pub fn approval_count(&self, id: TxId) -> Result<usize, CustodyError> {
        self.inspect(id, |tx| tx.approval_count())
    }

    pub fn status(&self, id: TxId) -> Result<TransactionStatus, CustodyError> {
        let threshold = self.registry.threshold();
        self.inspect(id, |tx| tx.status(threshold))
    }

    /// Subscribe to committed custody events
    pub fn subscribe(&self) -> broadcast::Receiver<CustodyEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Export the audit record for persistence
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            config: self.registry.config().clone(),
            transactions: self.transactions(),
            saved_at: Utc::now(),
        }
    }
}

impl<P: TransferPrimitive> CustodyHandle for Custody<P> {
    fn custody_address(&self) -> &Address {
        self.registry.address()
    }

    fn submit(
        &self,
        caller: &Address,
        destination: Address,
        amount: Amount,
        payload: Payload,
    ) -> Result<TxId, CustodyError> {
        Custody::submit(self, caller, destination, amount, payload)
    }

    fn approve(&self, caller: &Address, id: TxId) -> Result<(), CustodyError> {
        Custody::approve(self, caller, id)
    }

    fn execute(&self, caller: &Address, id: TxId) -> Result<(), CustodyError> {
        Custody::execute(self, caller, id)
    }

    fn transaction(&self, id: TxId) -> Option<Transaction> {
        Custody::transaction(self, id)
    }
}
