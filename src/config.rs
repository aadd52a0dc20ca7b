//! Certificate authority configuration.

use crate::crypto::rsa_key::DEFAULT_KEY_BITS;
use crate::error::{CaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a [`CertificateAuthority`](crate::ca::CertificateAuthority).
///
/// Missing fields in a JSON file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaConfig {
    /// Common name prefix of the root issuer (default: "Test Root CA ").
    pub root_cn_prefix: String,
    /// Common name prefix of the intermediate issuer (default: "Test Intermediate CA ").
    pub intermediate_cn_prefix: String,
    /// RSA modulus size for issuer keys (default: 2048).
    pub key_bits: usize,
    /// Lifetime of root and intermediate certificates in years (default: 30).
    pub issuer_validity_years: u32,
    /// Lifetime of leaf certificates in years (default: 5).
    pub leaf_validity_years: u32,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            root_cn_prefix: "Test Root CA ".into(),
            intermediate_cn_prefix: "Test Intermediate CA ".into(),
            key_bits: DEFAULT_KEY_BITS,
            issuer_validity_years: 30,
            leaf_validity_years: 5,
        }
    }
}

impl CaConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: CaConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the CA cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.key_bits < DEFAULT_KEY_BITS {
            return Err(CaError::ConfigError(format!(
                "key_bits must be at least {}, got {}",
                DEFAULT_KEY_BITS, self.key_bits
            )));
        }
        if self.issuer_validity_years == 0 || self.leaf_validity_years == 0 {
            return Err(CaError::ConfigError(
                "validity periods must be at least one year".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = CaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_bits, 2048);
        assert_eq!(config.issuer_validity_years, 30);
        assert_eq!(config.leaf_validity_years, 5);
    }

    #[test]
    fn test_rejects_small_keys() {
        let config = CaConfig {
            key_bits: 1024,
            ..CaConfig::default()
        };
        assert!(matches!(config.validate(), Err(CaError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_zero_validity() {
        let config = CaConfig {
            leaf_validity_years: 0,
            ..CaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"root_cn_prefix": "Lab Root ", "leaf_validity_years": 1}}"#).unwrap();

        let config = CaConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.root_cn_prefix, "Lab Root ");
        assert_eq!(config.leaf_validity_years, 1);
        assert_eq!(config.intermediate_cn_prefix, "Test Intermediate CA ");
    }

    #[test]
    fn test_load_invalid_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = CaConfig::from_json_file(file.path());
        assert!(matches!(result, Err(CaError::JsonError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = CaConfig::from_json_file(Path::new("/nonexistent/ca.json"));
        assert!(matches!(result, Err(CaError::StorageError(_))));
    }
}
