//! Certificate signing requests.
//!
//! Orders carry their CSR already parsed into the requested DNS names and
//! the subject public key. [`ParsedCsr::from_der`] performs that parsing for
//! PKCS#10 requests signed with sha256WithRSAEncryption, and [`encode_csr`]
//! produces such requests.

use crate::cert::template::{create_rdn_sequence, encode_extension, subject_alt_name};
use crate::crypto::rsa_key::{sha256_with_rsa_algorithm, verify_sha256_rsa, RsaKeyPair};
use crate::error::{CaError, Result};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::SetOfVec;
use der::{Any, Decode, Encode};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::attr::Attribute;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::request::{CertReq, CertReqInfo, ExtensionReq, Version};

/// PKCS#9 extensionRequest attribute.
const EXTENSION_REQUEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// The parts of a signing request the CA needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsr {
    pub dns_names: Vec<String>,
    pub public_key: SubjectPublicKeyInfoOwned,
}

impl ParsedCsr {
    pub fn new(dns_names: Vec<String>, public_key: SubjectPublicKeyInfoOwned) -> Self {
        Self {
            dns_names,
            public_key,
        }
    }

    /// Decode a DER PKCS#10 request and verify its self-signature.
    ///
    /// Names come from the subjectAltName extension request; a subject
    /// common name not already listed is put first.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let request = CertReq::from_der(der)
            .map_err(|e| CaError::ParseError(format!("Failed to decode CSR: {}", e)))?;

        if request.algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
            return Err(CaError::ParseError(format!(
                "Unsupported CSR signature algorithm: {}",
                request.algorithm.oid
            )));
        }

        let info_der = request
            .info
            .to_der()
            .map_err(|e| CaError::ParseError(format!("Failed to encode CSR info: {}", e)))?;
        verify_sha256_rsa(
            &request.info.public_key,
            &info_der,
            request.signature.raw_bytes(),
        )?;

        let mut dns_names = requested_dns_names(&request.info)?;
        if let Some(cn) = subject_common_name(&request.info) {
            if !cn.is_empty() && !dns_names.contains(&cn) {
                dns_names.insert(0, cn);
            }
        }

        if dns_names.is_empty() {
            return Err(CaError::InvalidInput("CSR contains no names".to_string()));
        }

        Ok(Self::new(dns_names, request.info.public_key))
    }
}

/// Build a DER PKCS#10 request for `domains`, signed by `key`.
///
/// The first domain becomes the subject common name; all domains go into a
/// subjectAltName extension request.
///
/// # Example
///
/// ```no_run
/// use acme_testca::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
/// use acme_testca::order::csr::{encode_csr, ParsedCsr};
///
/// # fn example() -> acme_testca::error::Result<()> {
/// let key = generate_rsa_key(DEFAULT_KEY_BITS)?;
/// let der = encode_csr(&key, &["example.test".to_string()])?;
/// let csr = ParsedCsr::from_der(&der)?;
/// assert_eq!(csr.dns_names, vec!["example.test".to_string()]);
/// # Ok(())
/// # }
/// ```
pub fn encode_csr(key: &RsaKeyPair, domains: &[String]) -> Result<Vec<u8>> {
    let common_name = domains
        .first()
        .ok_or_else(|| CaError::InvalidInput("must specify at least one domain name".to_string()))?;

    let san = encode_extension(&subject_alt_name(domains)?, false)?;
    let extension_request = ExtensionReq(vec![san])
        .to_der()
        .and_then(|der| Any::from_der(&der))
        .map_err(|e| CaError::CertificateError(format!("Failed to encode extensions: {}", e)))?;

    let attribute = Attribute {
        oid: EXTENSION_REQUEST,
        values: SetOfVec::try_from(vec![extension_request])
            .map_err(|e| CaError::CertificateError(format!("Failed to add attribute: {}", e)))?,
    };

    let info = CertReqInfo {
        version: Version::V1,
        subject: create_rdn_sequence(common_name)?,
        public_key: key.subject_public_key_info()?,
        attributes: SetOfVec::try_from(vec![attribute])
            .map_err(|e| CaError::CertificateError(format!("Failed to add attribute: {}", e)))?,
    };

    let info_der = info
        .to_der()
        .map_err(|e| CaError::CertificateError(format!("Failed to encode CSR info: {}", e)))?;
    let signature = key.sign_to_bitstring(&info_der)?;

    CertReq {
        info,
        algorithm: sha256_with_rsa_algorithm(),
        signature,
    }
    .to_der()
    .map_err(|e| CaError::CertificateError(format!("Failed to encode CSR: {}", e)))
}

fn requested_dns_names(info: &CertReqInfo) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for attribute in info.attributes.iter() {
        if attribute.oid != EXTENSION_REQUEST {
            continue;
        }
        for value in attribute.values.iter() {
            let value_der = value
                .to_der()
                .map_err(|e| CaError::ParseError(format!("Bad extension request: {}", e)))?;
            let request = ExtensionReq::from_der(&value_der)
                .map_err(|e| CaError::ParseError(format!("Bad extension request: {}", e)))?;

            for extension in request.0.iter() {
                if extension.extn_id != SubjectAltName::OID {
                    continue;
                }
                let san = SubjectAltName::from_der(extension.extn_value.as_bytes())
                    .map_err(|e| CaError::ParseError(format!("Bad subjectAltName: {}", e)))?;
                for name in san.0 {
                    if let GeneralName::DnsName(dns) = name {
                        let dns = dns.to_string();
                        if !names.contains(&dns) {
                            names.push(dns);
                        }
                    }
                }
            }
        }
    }

    Ok(names)
}

fn subject_common_name(info: &CertReqInfo) -> Option<String> {
    info.subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == const_oid::db::rfc4519::CN)
        .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_csr_roundtrip_names_and_key() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let names = domains(&["example.test", "www.example.test"]);

        let der = encode_csr(&key, &names).unwrap();
        let csr = ParsedCsr::from_der(&der).unwrap();

        assert_eq!(csr.dns_names, names);
        assert_eq!(csr.public_key, key.subject_public_key_info().unwrap());
    }

    #[test]
    fn test_csr_tampered_signature_rejected() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let der = encode_csr(&key, &domains(&["example.test"])).unwrap();

        let mut request = CertReq::from_der(&der).unwrap();
        request.info.subject = create_rdn_sequence("evil.test").unwrap();
        let tampered = request.to_der().unwrap();

        let result = ParsedCsr::from_der(&tampered);
        assert!(matches!(result, Err(CaError::SignatureError(_))));
    }

    #[test]
    fn test_csr_garbage_rejected() {
        let result = ParsedCsr::from_der(&[0x30, 0x03, 0x02, 0x01, 0x00]);
        assert!(matches!(result, Err(CaError::ParseError(_))));
    }

    #[test]
    fn test_encode_csr_requires_domain() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let result = encode_csr(&key, &[]);
        assert!(matches!(result, Err(CaError::InvalidInput(_))));
    }
}
