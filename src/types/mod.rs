//! Shared value types and the error taxonomy

pub mod address;
pub mod error;

pub use address::{Address, Amount, ParseError, Payload, TxId};
pub use error::{CustodyError, ErrorKind, TransferError};
