//! Error types for the test CA.
//!
//! Every fallible operation in the crate returns [`CaError`]. Only two
//! conditions are fatal and panic instead: entropy failure while drawing a
//! serial number and issuer-chain bootstrap failure in
//! [`CertificateAuthority::new`](crate::ca::CertificateAuthority::new).

use thiserror::Error;

/// The main error type for CA operations.
#[derive(Error, Debug)]
pub enum CaError {
    /// Caller supplied unusable input (e.g. no domain names)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation invoked before its prerequisites exist
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Key pair generation failed
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Certificate template, signing or encoding failed
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// DER decoding of a certificate or signing request failed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A signature did not verify
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Resource already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage I/O error
    #[error("Storage I/O error: {0}")]
    StorageError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for CA operations.
pub type Result<T> = std::result::Result<T, CaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaError::Precondition("no root issuer".to_string());
        assert_eq!(err.to_string(), "Precondition failed: no root issuer");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CaError>();
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CaError = io.into();
        assert!(matches!(err, CaError::StorageError(_)));
    }
}
