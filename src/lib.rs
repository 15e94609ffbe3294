//! Multisig Custody: an M-of-N threshold custody engine in Rust
//!
//! A fixed set of signers jointly controls a pool of value. No transfer out
//! of the pool takes effect until `threshold` distinct signers approve it.
//! This crate provides:
//! - An immutable signer registry with deterministic custody addresses
//! - A transaction ledger with submit / approve / execute transitions
//! - Exactly-once settlement, safe against replay and re-entrant destinations
//! - All-or-nothing execution with checkpoint and rollback around transfers
//! - An in-memory pool with programmable receivers
//! - Event notifications and JSON persistence of the audit record
//!
//! # Example
//!
//! ```rust
//! use multisig_custody::{Address, Custody, CustodyConfig, CustodyError, Payload};
//!
//! let signers = vec![
//!     Address::from("signer1"),
//!     Address::from("signer2"),
//!     Address::from("signer3"),
//! ];
//! let custody = Custody::with_pool(CustodyConfig::new(signers.clone(), 2)).unwrap();
//! custody.deposit(&signers[0], 10).unwrap();
//!
//! let id = custody
//!     .submit(&signers[0], Address::from("dest"), 1, Payload::empty())
//!     .unwrap();
//! custody.approve(&signers[1], id).unwrap();
//!
//! // One approval is not enough
//! assert!(matches!(
//!     custody.execute(&signers[0], id),
//!     Err(CustodyError::InsufficientApprovals { .. })
//! ));
//!
//! custody.approve(&signers[0], id).unwrap();
//! custody.execute(&signers[0], id).unwrap();
//! assert_eq!(custody.balance(), 9);
//! ```

pub mod crypto;
pub mod custody;
pub mod ledger;
pub mod pool;
pub mod registry;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use custody::{Custody, CustodyHandle, TransferPrimitive};
pub use ledger::{
    CustodyEvent, EventBroadcaster, Transaction, TransactionLedger, TransactionStatus,
    TransferRequest,
};
pub use pool::{Pool, Receiver};
pub use registry::{ConfigurationError, CustodyConfig, Registry};
pub use storage::{LedgerSnapshot, Storage, StorageConfig, StorageError};
pub use types::{Address, Amount, CustodyError, ErrorKind, Payload, TransferError, TxId};
