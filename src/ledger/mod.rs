//! Transaction ledger
//!
//! Tracks proposed transfers, their approvals and their settlement state.
//!
//! The ledger's transitions are driven only by `Custody`, which checks the
//! caller against the registry first. From outside the crate the ledger is
//! read-only.

pub mod events;
pub mod ledger;
pub mod transaction;

pub use events::{CustodyEvent, EventBroadcaster};
pub use ledger::TransactionLedger;
pub use transaction::{Transaction, TransactionStatus, TransferRequest};
