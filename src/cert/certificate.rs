//! Issued certificate records.

use crate::crypto::rsa_key::verify_sha256_rsa;
use crate::crypto::serial::serial_to_id;
use crate::error::{CaError, Result};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::{Decode, Encode};
use spki::SubjectPublicKeyInfoOwned;
use std::sync::Arc;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::serial_number::SerialNumber;

/// A certificate issued by this CA.
///
/// The identifier is the hex form of the serial number read back from the
/// encoded certificate, so store keys always agree with the certificate's
/// own serial field.
#[derive(Debug, Clone)]
pub struct Certificate {
    id: String,
    cert: x509_cert::Certificate,
    der: Vec<u8>,
    issuer: Option<Arc<Certificate>>,
}

impl Certificate {
    /// Parse a DER-encoded certificate and attach its issuing certificate.
    pub fn from_der(der: Vec<u8>, issuer: Option<Arc<Certificate>>) -> Result<Self> {
        let cert = x509_cert::Certificate::from_der(&der)
            .map_err(|e| CaError::ParseError(format!("Failed to decode certificate: {}", e)))?;
        let id = serial_to_id(&cert.tbs_certificate.serial_number);

        Ok(Self {
            id,
            cert,
            der,
            issuer,
        })
    }

    /// Store identifier (hex serial).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn x509(&self) -> &x509_cert::Certificate {
        &self.cert
    }

    /// The certificate that signed this one; `None` for a self-signed root.
    pub fn issuer(&self) -> Option<&Arc<Certificate>> {
        self.issuer.as_ref()
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.cert.tbs_certificate.serial_number
    }

    pub fn public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.cert.tbs_certificate.subject_public_key_info
    }

    /// The subject common name, if present.
    pub fn common_name(&self) -> Option<String> {
        self.cert
            .tbs_certificate
            .subject
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .find(|atv| atv.oid == const_oid::db::rfc4519::CN)
            .and_then(|atv| std::str::from_utf8(atv.value.value()).ok())
            .map(str::to_string)
    }

    /// DNS names from the subject alternative name extension, in order.
    pub fn dns_names(&self) -> Result<Vec<String>> {
        let Some(san) = self.find_extension::<SubjectAltName>()? else {
            return Ok(Vec::new());
        };

        Ok(san
            .0
            .iter()
            .filter_map(|name| match name {
                GeneralName::DnsName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect())
    }

    /// Whether the basic constraints extension marks this as a CA.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .find_extension::<BasicConstraints>()?
            .map(|bc| bc.ca)
            .unwrap_or(false))
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.find_extension::<KeyUsage>()
    }

    pub fn extended_key_usage(&self) -> Result<Vec<ObjectIdentifier>> {
        Ok(self
            .find_extension::<ExtendedKeyUsage>()?
            .map(|eku| eku.0)
            .unwrap_or_default())
    }

    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .find_extension::<SubjectKeyIdentifier>()?
            .map(|ski| ski.0.as_bytes().to_vec()))
    }

    /// Check that `issuer`'s key produced this certificate's signature.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        if self.cert.signature_algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
        {
            return Err(CaError::SignatureError(format!(
                "Unsupported signature algorithm: {}",
                self.cert.signature_algorithm.oid
            )));
        }

        let tbs_der = self
            .cert
            .tbs_certificate
            .to_der()
            .map_err(|e| CaError::CertificateError(format!("Failed to encode TBS: {}", e)))?;

        verify_sha256_rsa(
            issuer.public_key_info(),
            &tbs_der,
            self.cert.signature.raw_bytes(),
        )
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// This certificate followed by its issuers, excluding the self-signed root.
    pub fn chain_pem(&self) -> String {
        let mut pem = self.to_pem();
        let mut next = self.issuer.as_ref();
        while let Some(cert) = next {
            if cert.issuer.is_none() {
                break;
            }
            pem.push_str(&cert.to_pem());
            next = cert.issuer.as_ref();
        }
        pem
    }

    fn find_extension<T>(&self) -> Result<Option<T>>
    where
        T: AssociatedOid + for<'a> Decode<'a>,
    {
        let Some(extensions) = &self.cert.tbs_certificate.extensions else {
            return Ok(None);
        };

        extensions
            .iter()
            .find(|ext| ext.extn_id == T::OID)
            .map(|ext| {
                T::from_der(ext.extn_value.as_bytes()).map_err(|e| {
                    CaError::ParseError(format!("Failed to decode extension {}: {}", T::OID, e))
                })
            })
            .transpose()
    }
}
