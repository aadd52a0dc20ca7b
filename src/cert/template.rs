//! Certificate templates.
//!
//! A [`CertificateTemplate`] describes the fields a new certificate gets
//! before it is bound to a subject key and an issuer. [`CertificateTemplate::build_tbs`]
//! turns it into the `TbsCertificate` that the issuer signs.

use crate::cert::certificate::Certificate;
use crate::crypto::rsa_key::sha256_with_rsa_algorithm;
use crate::crypto::serial::{serial_magnitude, serial_number_from_u64};
use crate::error::{CaError, Result};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{GeneralizedTime, Ia5String, OctetString, SetOfVec, UtcTime, Utf8StringRef};
use der::{DateTime, Encode};
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoOwned;
use std::time::SystemTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::time::{Time, Validity};
use x509_cert::TbsCertificate;

/// Fields of a certificate that does not yet have a key or issuer.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    pub serial: u64,
    pub common_name: String,
    /// DNS subject alternative names; empty means no SAN extension.
    pub dns_names: Vec<String>,
    pub validity_years: u32,
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<ObjectIdentifier>,
    pub is_ca: bool,
}

impl CertificateTemplate {
    /// Template for a root or intermediate issuer.
    ///
    /// The common name is `prefix` followed by the hex of the leading (up to
    /// three) bytes of the serial, so generated issuers are distinguishable.
    pub fn issuer(serial: u64, common_name_prefix: &str, validity_years: u32) -> Self {
        let magnitude = serial_magnitude(serial);
        let fragment = hex::encode(&magnitude[..magnitude.len().min(3)]);

        Self {
            serial,
            common_name: format!("{}{}", common_name_prefix, fragment),
            dns_names: Vec::new(),
            validity_years,
            key_usage: KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyCertSign),
            extended_key_usage: tls_web_auth_usages(),
            is_ca: true,
        }
    }

    /// Template for an end-entity certificate covering `domains`.
    pub fn leaf(serial: u64, domains: &[String], validity_years: u32) -> Result<Self> {
        let common_name = domains.first().cloned().ok_or_else(|| {
            CaError::InvalidInput("must specify at least one domain name".to_string())
        })?;
        if domains.iter().any(|domain| domain.is_empty()) {
            return Err(CaError::InvalidInput("domain names must not be empty".to_string()));
        }

        Ok(Self {
            serial,
            common_name,
            dns_names: domains.to_vec(),
            validity_years,
            key_usage: KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment),
            extended_key_usage: tls_web_auth_usages(),
            is_ca: false,
        })
    }

    /// Bind the template to a subject key and an issuer.
    ///
    /// With `issuer == None` the certificate is self-issued: the issuer name
    /// equals the subject and no authority key identifier is written.
    pub fn build_tbs(
        &self,
        subject_public_key: SubjectPublicKeyInfoOwned,
        issuer: Option<&Certificate>,
    ) -> Result<TbsCertificate> {
        let subject = create_rdn_sequence(&self.common_name)?;
        let issuer_name = match issuer {
            Some(cert) => cert.x509().tbs_certificate.subject.clone(),
            None => subject.clone(),
        };

        let mut extensions = vec![
            encode_extension(&self.key_usage, true)?,
            encode_extension(&ExtendedKeyUsage(self.extended_key_usage.clone()), false)?,
            encode_extension(
                &BasicConstraints {
                    ca: self.is_ca,
                    path_len_constraint: None,
                },
                true,
            )?,
        ];

        if self.is_ca {
            let key_id = key_identifier(&subject_public_key);
            extensions.push(encode_extension(&SubjectKeyIdentifier(octets(key_id)?), false)?);
        }

        let authority_key_id = match issuer {
            Some(cert) => cert.subject_key_identifier()?,
            None => None,
        };
        if let Some(key_id) = authority_key_id {
            let aki = AuthorityKeyIdentifier {
                key_identifier: Some(octets(key_id)?),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            };
            extensions.push(encode_extension(&aki, false)?);
        }

        if !self.dns_names.is_empty() {
            extensions.push(encode_extension(&subject_alt_name(&self.dns_names)?, false)?);
        }

        Ok(TbsCertificate {
            version: x509_cert::certificate::Version::V3,
            serial_number: serial_number_from_u64(self.serial)?,
            signature: sha256_with_rsa_algorithm(),
            issuer: issuer_name,
            validity: create_validity(SystemTime::now(), self.validity_years)?,
            subject,
            subject_public_key_info: subject_public_key,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

/// serverAuth and clientAuth.
fn tls_web_auth_usages() -> Vec<ObjectIdentifier> {
    vec![
        const_oid::db::rfc5280::ID_KP_SERVER_AUTH,
        const_oid::db::rfc5280::ID_KP_CLIENT_AUTH,
    ]
}

/// Build a CN-only distinguished name.
pub fn create_rdn_sequence(cn: &str) -> Result<Name> {
    let cn_attr = AttributeTypeAndValue {
        oid: const_oid::db::rfc4519::CN,
        value: Utf8StringRef::new(cn)
            .map_err(|e| CaError::InvalidInput(format!("Invalid CN: {}", e)))?
            .into(),
    };

    let attr_set = SetOfVec::try_from(vec![cn_attr])
        .map_err(|e| CaError::CertificateError(format!("Failed to add attribute: {}", e)))?;

    Ok(RdnSequence(vec![RelativeDistinguishedName(attr_set)]))
}

/// Validity from `start` to the same calendar instant `years` later.
pub fn create_validity(start: SystemTime, years: u32) -> Result<Validity> {
    let not_before = DateTime::from_system_time(start)
        .map_err(|e| CaError::CertificateError(format!("Invalid start time: {}", e)))?;
    let not_after = add_years(&not_before, years)?;

    Ok(Validity {
        not_before: to_x509_time(not_before)?,
        not_after: to_x509_time(not_after)?,
    })
}

fn add_years(start: &DateTime, years: u32) -> Result<DateTime> {
    let year = u32::from(start.year()) + years;
    let year = u16::try_from(year)
        .map_err(|_| CaError::CertificateError(format!("Year {} out of range", year)))?;

    // 29 February maps to 28 February in non-leap target years.
    DateTime::new(
        year,
        start.month(),
        start.day(),
        start.hour(),
        start.minutes(),
        start.seconds(),
    )
    .or_else(|_| {
        DateTime::new(
            year,
            start.month(),
            28,
            start.hour(),
            start.minutes(),
            start.seconds(),
        )
    })
    .map_err(|e| CaError::CertificateError(format!("Failed to create validity: {}", e)))
}

/// UTCTime through 2049, GeneralizedTime from 2050 on.
fn to_x509_time(datetime: DateTime) -> Result<Time> {
    if datetime.year() < 2050 {
        let utc = UtcTime::from_date_time(datetime)
            .map_err(|e| CaError::CertificateError(format!("Invalid UTCTime: {}", e)))?;
        Ok(Time::UtcTime(utc))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(datetime)))
    }
}

/// Key identifier: SHA-256 over the subject public key bits, truncated to 160 bits.
pub fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    let digest = Sha256::digest(spki.subject_public_key.raw_bytes());
    digest[..20].to_vec()
}

pub(crate) fn subject_alt_name(dns_names: &[String]) -> Result<SubjectAltName> {
    let names = dns_names
        .iter()
        .map(|name| {
            Ia5String::new(name)
                .map(GeneralName::DnsName)
                .map_err(|e| CaError::InvalidInput(format!("Invalid DNS name {:?}: {}", name, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SubjectAltName(names))
}

fn octets(bytes: Vec<u8>) -> Result<OctetString> {
    OctetString::new(bytes)
        .map_err(|e| CaError::CertificateError(format!("Failed to create octet string: {}", e)))
}

pub(crate) fn encode_extension<T: AssociatedOid + Encode>(
    value: &T,
    critical: bool,
) -> Result<Extension> {
    let der = value.to_der().map_err(|e| {
        CaError::CertificateError(format!("Failed to encode extension {}: {}", T::OID, e))
    })?;

    Ok(Extension {
        extn_id: T::OID,
        critical,
        extn_value: octets(der)?,
    })
}
