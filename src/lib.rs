//! acme-testca: a minimal certificate authority for ACME test environments
//!
//! The crate issues X.509 certificates for a simulated certificate-issuance
//! protocol. It provides:
//!
//! - A self-signed root issuer and an intermediate issuer signed by the root
//! - Leaf certificates for DNS names, signed by the intermediate
//! - The order-completion step that issues once every authorization is valid
//! - An in-memory certificate store keyed by hex serial number
//!
//! # Architecture
//!
//! The authority is an explicitly constructed value with no global state.
//! Its issuers are immutable after construction, so one authority can serve
//! many threads completing different orders. Orders and authorizations carry
//! their own locks.
//!
//! # Example
//!
//! ```rust,no_run
//! use acme_testca::ca::CertificateAuthority;
//! use acme_testca::config::CaConfig;
//! use acme_testca::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
//! use acme_testca::error::Result;
//! use acme_testca::order::csr::ParsedCsr;
//! use acme_testca::order::{Authorization, Order, Status};
//! use acme_testca::storage::memory::MemoryStore;
//! use std::sync::Arc;
//!
//! fn example() -> Result<()> {
//!     let ca = CertificateAuthority::try_new(Arc::new(MemoryStore::new()), CaConfig::default())?;
//!
//!     let subject = generate_rsa_key(DEFAULT_KEY_BITS)?;
//!     let csr = ParsedCsr::new(vec!["example.test".into()], subject.subject_public_key_info()?);
//!     let authz = Authorization::new("authz-1", "example.test")
//!         .with_status(Status::Valid)
//!         .shared();
//!     let order = Order::new("order-1", csr, vec![authz]).shared();
//!
//!     ca.complete_order(&order);
//!     assert_eq!(order.lock().unwrap().status, Status::Valid);
//!     Ok(())
//! }
//! ```

pub mod ca;
pub mod cert;
pub mod config;
pub mod crypto;
pub mod error;
pub mod order;
pub mod storage;

// Re-export commonly used types
pub use ca::CertificateAuthority;
pub use error::{CaError, Result};
