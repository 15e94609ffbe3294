//! In-memory value-transfer primitive
//!
//! Holds pooled funds under the custody address and pays destinations,
//! running any receiver code registered for them.

pub mod pool;
pub mod receiver;

pub use pool::{Pool, PoolState, TransferRecord, MAX_HISTORY};
pub use receiver::{Receiver, RejectAll, RequirePayload};
