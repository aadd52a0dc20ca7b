//! RSA key operations.
//!
//! Issuer keys are RSA key pairs. Certificates and signing requests are signed
//! with sha256WithRSAEncryption (PKCS#1 v1.5).

use crate::error::{CaError, Result};
use der::asn1::BitString;
use der::{Any, Decode, Encode};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

/// Default modulus size for generated keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA key pair used to sign certificates.
#[derive(Clone)]
pub struct RsaKeyPair {
    secret: RsaPrivateKey,
    public: RsaPublicKey,
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl RsaKeyPair {
    /// Wrap an existing private key.
    pub fn from_secret(secret: RsaPrivateKey) -> Self {
        let public = secret.to_public_key();
        Self { secret, public }
    }

    /// The public half of the key pair.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        use rsa::traits::PublicKeyParts;
        self.public.size() * 8
    }

    /// The SubjectPublicKeyInfo for this key, as embedded in certificates.
    pub fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        public_key_to_spki(&self.public)
    }

    /// Sign `message` with PKCS#1 v1.5 over SHA-256.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let hashed = Sha256::digest(message);
        self.secret
            .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), &hashed)
            .map_err(|e| CaError::CertificateError(format!("RSA signing failed: {}", e)))
    }

    /// Sign `message` and wrap the signature in a DER BIT STRING.
    pub fn sign_to_bitstring(&self, message: &[u8]) -> Result<BitString> {
        let signature = self.sign(message)?;
        BitString::from_bytes(&signature).map_err(|e| {
            CaError::CertificateError(format!("Failed to create signature bitstring: {}", e))
        })
    }
}

/// Generate a fresh RSA key pair with the given modulus size.
///
/// # Example
///
/// ```no_run
/// use acme_testca::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
///
/// let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
/// assert_eq!(key.bits(), 2048);
/// ```
pub fn generate_rsa_key(bits: usize) -> Result<RsaKeyPair> {
    let secret = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CaError::KeyGeneration(format!("Failed to generate RSA key: {}", e)))?;
    Ok(RsaKeyPair::from_secret(secret))
}

/// The sha256WithRSAEncryption algorithm identifier (NULL parameters).
pub fn sha256_with_rsa_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
        parameters: Some(Any::null()),
    }
}

/// Convert an RSA public key to its SubjectPublicKeyInfo.
pub fn public_key_to_spki(public_key: &RsaPublicKey) -> Result<SubjectPublicKeyInfoOwned> {
    let doc = public_key
        .to_public_key_der()
        .map_err(|e| CaError::CertificateError(format!("Failed to encode public key: {}", e)))?;

    SubjectPublicKeyInfoOwned::from_der(doc.as_bytes())
        .map_err(|e| CaError::ParseError(format!("Failed to decode public key info: {}", e)))
}

/// Extract an RSA public key from a SubjectPublicKeyInfo.
pub fn spki_to_public_key(spki: &SubjectPublicKeyInfoOwned) -> Result<RsaPublicKey> {
    let der = spki
        .to_der()
        .map_err(|e| CaError::ParseError(format!("Failed to encode public key info: {}", e)))?;

    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CaError::ParseError(format!("Not an RSA public key: {}", e)))
}

/// Verify a sha256WithRSAEncryption signature over `message`.
pub fn verify_sha256_rsa(
    spki: &SubjectPublicKeyInfoOwned,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let public_key = spki_to_public_key(spki)?;
    let hashed = Sha256::digest(message);

    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
        .map_err(|e| CaError::SignatureError(format!("Signature verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_has_requested_size() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        assert_eq!(key.bits(), 2048);
    }

    #[test]
    fn test_sign_verify() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let spki = key.subject_public_key_info().unwrap();
        let message = b"to be signed";

        let signature = key.sign(message).unwrap();
        assert!(verify_sha256_rsa(&spki, message, &signature).is_ok());
        assert!(verify_sha256_rsa(&spki, b"something else", &signature).is_err());
    }

    #[test]
    fn test_spki_roundtrip() {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        let spki = key.subject_public_key_info().unwrap();
        let public = spki_to_public_key(&spki).unwrap();
        assert_eq!(&public, key.public_key());
        assert_eq!(spki.algorithm.oid, const_oid::db::rfc5912::RSA_ENCRYPTION);
    }
}
