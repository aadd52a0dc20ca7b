//! In-memory certificate store keyed by certificate identifier.

use crate::cert::certificate::Certificate;
use crate::error::{CaError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A thread-safe registry of issued certificates.
///
/// Inserting a second certificate with an identifier that is already
/// present is an error; nothing is overwritten.
#[derive(Debug, Default)]
pub struct MemoryStore {
    certificates: RwLock<HashMap<String, Arc<Certificate>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate, returning its identifier.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use acme_testca::ca::CertificateAuthority;
    /// use acme_testca::config::CaConfig;
    /// use acme_testca::storage::memory::MemoryStore;
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(MemoryStore::new());
    /// let ca = CertificateAuthority::new(store.clone(), CaConfig::default());
    /// let root = ca.root_certificate().unwrap().clone();
    ///
    /// // The root was recorded during bootstrap; recording it again fails.
    /// assert!(store.insert(root).is_err());
    /// ```
    pub fn insert(&self, certificate: Arc<Certificate>) -> Result<String> {
        let mut certificates = self
            .certificates
            .write()
            .map_err(|e| CaError::CertificateError(format!("Certificate store poisoned: {}", e)))?;

        let id = certificate.id().to_string();
        if certificates.contains_key(&id) {
            return Err(CaError::AlreadyExists(format!(
                "Certificate with ID '{}' already exists",
                id
            )));
        }

        certificates.insert(id.clone(), certificate);
        Ok(id)
    }

    /// Look up a certificate by identifier.
    pub fn get(&self, id: &str) -> Option<Arc<Certificate>> {
        self.certificates
            .read()
            .ok()
            .and_then(|certificates| certificates.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.certificates
            .read()
            .map(|certificates| certificates.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
