//! Certificate signing and recording.
//!
//! Every certificate the CA produces goes through [`sign_and_record`]: the
//! TBS structure is signed, the result is encoded, decoded again into a
//! [`Certificate`] and inserted into the store.

use crate::ca::Issuer;
use crate::cert::certificate::Certificate;
use crate::cert::template::CertificateTemplate;
use crate::crypto::rsa_key::{sha256_with_rsa_algorithm, RsaKeyPair};
use crate::crypto::serial::make_serial;
use crate::error::{CaError, Result};
use crate::storage::memory::MemoryStore;
use der::Encode;
use std::sync::Arc;
use x509_cert::TbsCertificate;

/// Create a root or intermediate certificate for `subject_key`.
///
/// With a `signer` the certificate is issued by that issuer and signed with
/// its key; without one it is self-signed by `subject_key`.
///
/// # Example
///
/// ```no_run
/// use acme_testca::cert::factory::issue_issuer_certificate;
/// use acme_testca::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
/// use acme_testca::storage::memory::MemoryStore;
///
/// # fn example() -> acme_testca::error::Result<()> {
/// let store = MemoryStore::new();
/// let key = generate_rsa_key(DEFAULT_KEY_BITS)?;
/// let root = issue_issuer_certificate(&store, &key, "My Root CA ", None, 30)?;
/// assert!(root.issuer().is_none());
/// # Ok(())
/// # }
/// ```
pub fn issue_issuer_certificate(
    store: &MemoryStore,
    subject_key: &RsaKeyPair,
    common_name_prefix: &str,
    signer: Option<&Issuer>,
    validity_years: u32,
) -> Result<Arc<Certificate>> {
    let template = CertificateTemplate::issuer(make_serial(), common_name_prefix, validity_years);
    let spki = subject_key.subject_public_key_info()?;

    match signer {
        Some(issuer) => {
            let tbs = template.build_tbs(spki, Some(issuer.certificate()))?;
            sign_and_record(
                store,
                tbs,
                issuer.key(),
                Some(issuer.certificate().clone()),
            )
        }
        None => {
            let tbs = template.build_tbs(spki, None)?;
            sign_and_record(store, tbs, subject_key, None)
        }
    }
}

/// Sign `tbs` with `signing_key`, parse the result and insert it into `store`.
pub fn sign_and_record(
    store: &MemoryStore,
    tbs: TbsCertificate,
    signing_key: &RsaKeyPair,
    issuer: Option<Arc<Certificate>>,
) -> Result<Arc<Certificate>> {
    let tbs_der = tbs
        .to_der()
        .map_err(|e| CaError::CertificateError(format!("Failed to encode TBS: {}", e)))?;
    let signature = signing_key.sign_to_bitstring(&tbs_der)?;

    let cert = x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm: sha256_with_rsa_algorithm(),
        signature,
    };
    let der = cert.to_der().map_err(|e| {
        CaError::CertificateError(format!("Failed to encode certificate: {}", e))
    })?;

    let certificate = Arc::new(Certificate::from_der(der, issuer)?);
    store.insert(certificate.clone())?;
    Ok(certificate)
}
