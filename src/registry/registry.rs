//! Signer registry
//!
//! Source of truth for who may act and how many approvals are enough.

use crate::crypto::derive_address;
use crate::registry::config::{ConfigurationError, CustodyConfig};
use crate::types::Address;
use std::collections::HashSet;

/// Immutable signer set and threshold
#[derive(Clone, Debug)]
pub struct Registry {
    config: CustodyConfig,
    members: HashSet<Address>,
    address: Address,
}

impl Registry {
    /// Build a registry from a configuration
    ///
    /// # Errors
    /// Returns a `ConfigurationError` if the threshold or signer list is
    /// invalid. A registry that fails here can never be used.
    pub fn new(config: CustodyConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let members = config.signers.iter().cloned().collect();
        let address = Self::generate_address(&config);

        log::info!(
            "Registry ready: {}-of-{} at {}",
            config.threshold,
            config.signers.len(),
            address
        );

        Ok(Self {
            config,
            members,
            address,
        })
    }

    /// Custody address derived from threshold and sorted signers
    ///
    /// The same signer set always yields the same address, regardless of order.
    fn generate_address(config: &CustodyConfig) -> Address {
        let mut sorted: Vec<&str> = config.signers.iter().map(Address::as_str).collect();
        sorted.sort_unstable();

        let preimage = format!("{}:{}", config.threshold, sorted.join(","));
        Address::from(derive_address(preimage.as_bytes()))
    }

    pub fn is_signer(&self, identity: &Address) -> bool {
        self.members.contains(identity)
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    pub fn signer_at(&self, index: usize) -> Option<&Address> {
        self.config.signers.get(index)
    }

    pub fn signer_count(&self) -> usize {
        self.config.signers.len()
    }

    pub fn signers(&self) -> &[Address] {
        &self.config.signers
    }

    /// Address under which the pool holds custody funds
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.config.label.as_deref()
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.config.threshold, self.config.signers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signers() -> Vec<Address> {
        vec![
            Address::from("signer1"),
            Address::from("signer2"),
            Address::from("signer3"),
        ]
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new(CustodyConfig::new(sample_signers(), 2)).unwrap();

        assert_eq!(registry.threshold(), 2);
        assert_eq!(registry.signer_count(), 3);
        assert_eq!(registry.description(), "2-of-3");
        assert!(registry.label().is_none());
    }

    #[test]
    fn test_signer_enumeration() {
        let signers = sample_signers();
        let registry = Registry::new(CustodyConfig::new(signers.clone(), 2)).unwrap();

        assert_eq!(registry.signer_at(0), Some(&signers[0]));
        assert_eq!(registry.signer_at(1), Some(&signers[1]));
        assert_eq!(registry.signer_at(2), Some(&signers[2]));
        assert_eq!(registry.signer_at(3), None);
        assert_eq!(registry.signers(), signers.as_slice());
    }

    #[test]
    fn test_is_signer() {
        let registry = Registry::new(CustodyConfig::new(sample_signers(), 2)).unwrap();

        assert!(registry.is_signer(&Address::from("signer1")));
        assert!(registry.is_signer(&Address::from("signer3")));
        assert!(!registry.is_signer(&Address::from("other")));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        assert_eq!(
            Registry::new(CustodyConfig::new(sample_signers(), 0)).unwrap_err(),
            ConfigurationError::ZeroThreshold
        );
        assert!(Registry::new(CustodyConfig::new(sample_signers(), 4)).is_err());

        let mut duplicated = sample_signers();
        duplicated.push(Address::from("signer2"));
        assert_eq!(
            Registry::new(CustodyConfig::new(duplicated, 2)).unwrap_err(),
            ConfigurationError::DuplicateSigner(Address::from("signer2"))
        );
    }

    #[test]
    fn test_address_determinism() {
        let forward = Registry::new(CustodyConfig::new(sample_signers(), 2)).unwrap();

        let mut reversed_signers = sample_signers();
        reversed_signers.reverse();
        let reversed = Registry::new(CustodyConfig::new(reversed_signers, 2)).unwrap();

        let other_threshold = Registry::new(CustodyConfig::new(sample_signers(), 3)).unwrap();

        assert!(forward.address().as_str().starts_with("0x"));
        assert_eq!(forward.address(), reversed.address());
        assert_ne!(forward.address(), other_threshold.address());
    }
}
