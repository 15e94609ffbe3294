//! Signer registry
//!
//! Holds the fixed signer set and quorum size of a custody pool.
//!
//! # Example
//!
//! ```rust
//! use multisig_custody::registry::{CustodyConfig, Registry};
//! use multisig_custody::types::Address;
//!
//! let signers = vec![Address::from("alice"), Address::from("bob"), Address::from("carol")];
//! let registry = Registry::new(CustodyConfig::new(signers, 2)).unwrap();
//!
//! assert!(registry.is_signer(&Address::from("bob")));
//! assert_eq!(registry.description(), "2-of-3");
//! ```

pub mod config;
pub mod registry;

pub use config::{ConfigurationError, CustodyConfig};
pub use registry::Registry;
