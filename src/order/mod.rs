//! Order and authorization objects.
//!
//! Orders and authorizations are created and validated by the protocol
//! layer; the CA only reads authorization status and drives the order from
//! `pending` to `valid`. Each object carries its own lock: orders a
//! [`Mutex`], authorizations a [`RwLock`] so that many orders can check the
//! same authorization at once.

pub mod csr;

use crate::cert::certificate::Certificate;
use crate::order::csr::ParsedCsr;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// ACME object status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Ready,
    Processing,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Ready => "ready",
            Status::Processing => "processing",
            Status::Valid => "valid",
            Status::Invalid => "invalid",
            Status::Deactivated => "deactivated",
            Status::Expired => "expired",
            Status::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// Proof of control over one identifier.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub id: String,
    /// The domain name this authorization covers.
    pub identifier: String,
    pub status: Status,
}

/// An authorization behind its reader/writer lock.
pub type SharedAuthorization = Arc<RwLock<Authorization>>;

impl Authorization {
    /// A new pending authorization for `identifier`.
    pub fn new(id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            status: Status::Pending,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn shared(self) -> SharedAuthorization {
        Arc::new(RwLock::new(self))
    }
}

/// A request to obtain a certificate.
#[derive(Debug)]
pub struct Order {
    pub id: String,
    pub status: Status,
    pub parsed_csr: ParsedCsr,
    pub authorizations: Vec<SharedAuthorization>,
    /// Set once the order reaches `valid`.
    pub certificate: Option<Arc<Certificate>>,
}

/// An order behind its exclusive lock.
pub type SharedOrder = Arc<Mutex<Order>>;

impl Order {
    /// A new pending order.
    pub fn new(
        id: impl Into<String>,
        parsed_csr: ParsedCsr,
        authorizations: Vec<SharedAuthorization>,
    ) -> Self {
        Self {
            id: id.into(),
            status: Status::Pending,
            parsed_csr,
            authorizations,
            certificate: None,
        }
    }

    pub fn shared(self) -> SharedOrder {
        Arc::new(Mutex::new(self))
    }
}

/// Random object identifier (16 bytes, hex).
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
