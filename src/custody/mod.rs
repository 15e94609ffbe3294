//! Custody engine
//!
//! The context object that validates callers, records approvals and settles
//! transfers exactly once.
//!
//! # Example
//!
//! ```rust
//! use multisig_custody::custody::Custody;
//! use multisig_custody::registry::CustodyConfig;
//! use multisig_custody::types::{Address, Payload};
//!
//! let signers = vec![Address::from("alice"), Address::from("bob"), Address::from("carol")];
//! let custody = Custody::with_pool(CustodyConfig::new(signers.clone(), 2)).unwrap();
//! custody.deposit(&signers[0], 10).unwrap();
//!
//! let id = custody
//!     .submit(&signers[0], Address::from("dest"), 4, Payload::empty())
//!     .unwrap();
//! custody.approve(&signers[0], id).unwrap();
//! custody.approve(&signers[1], id).unwrap();
//!
//! // Anyone may trigger execution once quorum is reached
//! custody.execute(&Address::from("relayer"), id).unwrap();
//! assert_eq!(custody.balance(), 6);
//! ```

pub mod custody;
pub mod handle;

pub use custody::Custody;
pub use handle::{CustodyHandle, TransferPrimitive};
