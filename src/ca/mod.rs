//! The certificate authority.
//!
//! A [`CertificateAuthority`] owns a root issuer and an intermediate issuer
//! signed by the root. Leaf certificates are always issued by the
//! intermediate. The issuers are created once at construction and never
//! change, so a constructed authority can be shared across threads freely.

pub mod completion;

use crate::cert::certificate::Certificate;
use crate::cert::factory::{issue_issuer_certificate, sign_and_record};
use crate::cert::template::CertificateTemplate;
use crate::config::CaConfig;
use crate::crypto::rsa_key::{generate_rsa_key, RsaKeyPair};
use crate::crypto::serial::make_serial;
use crate::error::{CaError, Result};
use crate::storage::memory::MemoryStore;
use spki::SubjectPublicKeyInfoOwned;
use std::sync::Arc;
use tracing::info;

/// A signing key together with its own certificate.
#[derive(Debug)]
pub struct Issuer {
    key: RsaKeyPair,
    certificate: Arc<Certificate>,
}

impl Issuer {
    pub fn new(key: RsaKeyPair, certificate: Arc<Certificate>) -> Self {
        Self { key, certificate }
    }

    pub fn key(&self) -> &RsaKeyPair {
        &self.key
    }

    pub fn certificate(&self) -> &Arc<Certificate> {
        &self.certificate
    }
}

/// Root and intermediate issuers plus the store they record into.
#[derive(Debug)]
pub struct CertificateAuthority {
    config: CaConfig,
    store: Arc<MemoryStore>,
    root: Option<Issuer>,
    intermediate: Option<Issuer>,
}

impl CertificateAuthority {
    /// Bootstrap a new authority with a fresh root and intermediate.
    ///
    /// # Panics
    ///
    /// Panics if either issuer cannot be created.
    pub fn new(store: Arc<MemoryStore>, config: CaConfig) -> Self {
        match Self::try_new(store, config) {
            Ok(ca) => ca,
            Err(e) => panic!("Error creating certificate authority: {}", e),
        }
    }

    /// Bootstrap a new authority, returning bootstrap failures as errors.
    pub fn try_new(store: Arc<MemoryStore>, config: CaConfig) -> Result<Self> {
        config.validate()?;
        let mut ca = Self::uninitialized(store, config);
        ca.init_root_issuer()?;
        ca.init_intermediate_issuer()?;
        Ok(ca)
    }

    fn uninitialized(store: Arc<MemoryStore>, config: CaConfig) -> Self {
        Self {
            config,
            store,
            root: None,
            intermediate: None,
        }
    }

    /// Generate the self-signed root issuer.
    pub fn init_root_issuer(&mut self) -> Result<()> {
        let key = generate_rsa_key(self.config.key_bits)?;
        let cert = issue_issuer_certificate(
            &self.store,
            &key,
            &self.config.root_cn_prefix,
            None,
            self.config.issuer_validity_years,
        )?;

        info!(serial = %cert.id(), "Generated new root issuer");
        self.root = Some(Issuer::new(key, cert));
        Ok(())
    }

    /// Generate the intermediate issuer, signed by the root.
    pub fn init_intermediate_issuer(&mut self) -> Result<()> {
        let root = self.root.as_ref().ok_or_else(|| {
            CaError::Precondition(
                "intermediate issuer requested before the root issuer exists".to_string(),
            )
        })?;

        let key = generate_rsa_key(self.config.key_bits)?;
        let cert = issue_issuer_certificate(
            &self.store,
            &key,
            &self.config.intermediate_cn_prefix,
            Some(root),
            self.config.issuer_validity_years,
        )?;

        info!(serial = %cert.id(), "Generated new intermediate issuer");
        self.intermediate = Some(Issuer::new(key, cert));
        Ok(())
    }

    /// Issue a leaf certificate for `domain_names`, bound to `subject_public_key`.
    ///
    /// The first name becomes the subject common name and every name is
    /// listed as a DNS subject alternative name, in order.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use acme_testca::ca::CertificateAuthority;
    /// use acme_testca::config::CaConfig;
    /// use acme_testca::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
    /// use acme_testca::storage::memory::MemoryStore;
    /// use std::sync::Arc;
    ///
    /// # fn example() -> acme_testca::error::Result<()> {
    /// let ca = CertificateAuthority::try_new(Arc::new(MemoryStore::new()), CaConfig::default())?;
    /// let subject = generate_rsa_key(DEFAULT_KEY_BITS)?;
    ///
    /// let cert = ca.issue_certificate(
    ///     &["example.test".to_string()],
    ///     &subject.subject_public_key_info()?,
    /// )?;
    /// assert_eq!(cert.dns_names()?, vec!["example.test".to_string()]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn issue_certificate(
        &self,
        domain_names: &[String],
        subject_public_key: &SubjectPublicKeyInfoOwned,
    ) -> Result<Arc<Certificate>> {
        let template =
            CertificateTemplate::leaf(make_serial(), domain_names, self.config.leaf_validity_years)?;

        let issuer = self.intermediate.as_ref().ok_or_else(|| {
            CaError::Precondition("cannot sign certificate without an intermediate issuer".into())
        })?;

        let tbs = template.build_tbs(subject_public_key.clone(), Some(issuer.certificate()))?;
        sign_and_record(
            &self.store,
            tbs,
            issuer.key(),
            Some(issuer.certificate().clone()),
        )
    }

    /// The self-signed root certificate, once bootstrapped.
    pub fn root_certificate(&self) -> Option<&Arc<Certificate>> {
        self.root.as_ref().map(Issuer::certificate)
    }

    /// The intermediate certificate that signs leaves, once bootstrapped.
    pub fn intermediate_certificate(&self) -> Option<&Arc<Certificate>> {
        self.intermediate.as_ref().map(Issuer::certificate)
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn config(&self) -> &CaConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rsa_key::DEFAULT_KEY_BITS;

    #[test]
    fn test_intermediate_requires_root() {
        let mut ca =
            CertificateAuthority::uninitialized(Arc::new(MemoryStore::new()), CaConfig::default());
        let result = ca.init_intermediate_issuer();

        assert!(matches!(result, Err(CaError::Precondition(_))));
        assert!(ca.store().is_empty());
    }

    #[test]
    fn test_issue_requires_intermediate() {
        let mut ca =
            CertificateAuthority::uninitialized(Arc::new(MemoryStore::new()), CaConfig::default());
        ca.init_root_issuer().unwrap();

        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let spki = key.subject_public_key_info().unwrap();
        let result = ca.issue_certificate(&["example.test".to_string()], &spki);

        assert!(matches!(result, Err(CaError::Precondition(_))));
        assert_eq!(ca.store().len(), 1);
    }

    #[test]
    fn test_issue_requires_domain_names() {
        let ca = CertificateAuthority::new(Arc::new(MemoryStore::new()), CaConfig::default());
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let spki = key.subject_public_key_info().unwrap();

        let result = ca.issue_certificate(&[], &spki);
        assert!(matches!(result, Err(CaError::InvalidInput(_))));
        assert_eq!(ca.store().len(), 2);
    }

    #[test]
    fn test_bootstrap_records_both_issuers() {
        let store = Arc::new(MemoryStore::new());
        let ca = CertificateAuthority::new(store.clone(), CaConfig::default());

        assert_eq!(store.len(), 2);
        let root = ca.root_certificate().unwrap();
        let intermediate = ca.intermediate_certificate().unwrap();
        assert!(store.get(root.id()).is_some());
        assert!(store.get(intermediate.id()).is_some());
        assert!(root.common_name().unwrap().starts_with("Test Root CA "));
        assert!(intermediate
            .common_name()
            .unwrap()
            .starts_with("Test Intermediate CA "));
    }

    #[test]
    fn test_try_new_rejects_invalid_config() {
        let config = CaConfig {
            key_bits: 512,
            ..CaConfig::default()
        };
        let result = CertificateAuthority::try_new(Arc::new(MemoryStore::new()), config);
        assert!(matches!(result, Err(CaError::ConfigError(_))));
    }

    #[test]
    fn test_authority_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CertificateAuthority>();
    }
}
