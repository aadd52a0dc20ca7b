//! Cryptographic primitives used by the CA.
//!
//! - [`serial`]: random certificate serial numbers
//! - [`rsa_key`]: RSA issuer keys and sha256WithRSAEncryption signatures

pub mod rsa_key;
pub mod serial;
