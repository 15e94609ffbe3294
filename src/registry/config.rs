//! Signer set configuration
//!
//! A `CustodyConfig` describes who may act and how many acts are enough.
//! It is validated once, when the registry is built, and never changes after.

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors found while building a registry. These are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid threshold: threshold must be at least 1")]
    ZeroThreshold,
    #[error("Invalid threshold: threshold {threshold} exceeds signer count {signers}")]
    ThresholdExceedsSigners { threshold: usize, signers: usize },
    #[error("Duplicate signer: {0}")]
    DuplicateSigner(Address),
    #[error("Cannot read configuration: {0}")]
    Unreadable(String),
    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// Configuration for a custody registry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustodyConfig {
    /// Authorized signers, in enumeration order
    pub signers: Vec<Address>,
    /// Minimum distinct approvals required (M in M-of-N)
    pub threshold: usize,
    /// Optional human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CustodyConfig {
    /// Create a new configuration without validating it
    pub fn new(signers: Vec<Address>, threshold: usize) -> Self {
        Self {
            signers,
            threshold,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Unreadable(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(raw: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(raw).map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }

    /// Check the threshold and signer list
    ///
    /// # Errors
    /// Returns error if the threshold is zero, exceeds the signer count, or
    /// the signer list contains duplicates.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.threshold == 0 {
            return Err(ConfigurationError::ZeroThreshold);
        }

        if self.threshold > self.signers.len() {
            return Err(ConfigurationError::ThresholdExceedsSigners {
                threshold: self.threshold,
                signers: self.signers.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.signers.len());
        for signer in &self.signers {
            if !seen.insert(signer) {
                return Err(ConfigurationError::DuplicateSigner(signer.clone()));
            }
        }

        Ok(())
    }
}
