//! Order completion.
//!
//! Drives an order from `pending` through `processing` to `valid` once all
//! of its authorizations are valid. Outcomes are visible only through the
//! order's status and certificate fields and the log.

use crate::ca::CertificateAuthority;
use crate::order::{Order, Status};
use std::sync::Mutex;
use tracing::{debug, error, info};

impl CertificateAuthority {
    /// Issue the certificate for a fully authorized order.
    ///
    /// The order lock is held for the whole call. Authorizations are read
    /// under their shared locks. If any authorization is not valid the call
    /// returns without touching the order. If the order is not pending the
    /// call logs an error and returns. If issuance fails the order stays in
    /// `processing`.
    pub fn complete_order(&self, order: &Mutex<Order>) {
        let mut order = match order.lock() {
            Ok(order) => order,
            Err(e) => {
                error!(error = %e, "Order lock poisoned, not completing order");
                return;
            }
        };

        for authz in &order.authorizations {
            let authz = match authz.read() {
                Ok(authz) => authz,
                Err(e) => {
                    error!(order = %order.id, error = %e, "Authorization lock poisoned");
                    return;
                }
            };
            if authz.status != Status::Valid {
                debug!(
                    order = %order.id,
                    identifier = %authz.identifier,
                    status = %authz.status,
                    "Authorization not valid, not completing order"
                );
                return;
            }
        }

        if order.status != Status::Pending {
            error!(
                order = %order.id,
                status = %order.status,
                "Asked to complete order that is not pending"
            );
            return;
        }

        info!(order = %order.id, "Order is fully authorized, ready to issue");
        order.status = Status::Processing;

        let issued = self.issue_certificate(
            &order.parsed_csr.dns_names,
            &order.parsed_csr.public_key,
        );
        let cert = match issued {
            Ok(cert) => cert,
            Err(e) => {
                error!(order = %order.id, error = %e, "Unable to issue order");
                return;
            }
        };

        info!(serial = %cert.id(), order = %order.id, "Issued certificate");
        order.status = Status::Valid;
        order.certificate = Some(cert);
    }
}

#[cfg(test)]
mod tests {
    use crate::ca::CertificateAuthority;
    use crate::config::CaConfig;
    use crate::crypto::rsa_key::{generate_rsa_key, DEFAULT_KEY_BITS};
    use crate::order::csr::ParsedCsr;
    use crate::order::{Authorization, Order, Status};
    use crate::storage::memory::MemoryStore;
    use std::sync::Arc;

    fn authority() -> CertificateAuthority {
        CertificateAuthority::new(Arc::new(MemoryStore::new()), CaConfig::default())
    }

    fn csr(names: &[&str]) -> ParsedCsr {
        let key = generate_rsa_key(DEFAULT_KEY_BITS).unwrap();
        ParsedCsr::new(
            names.iter().map(|n| n.to_string()).collect(),
            key.subject_public_key_info().unwrap(),
        )
    }

    fn valid_authz(domain: &str) -> crate::order::SharedAuthorization {
        Authorization::new(format!("authz-{}", domain), domain)
            .with_status(Status::Valid)
            .shared()
    }

    #[test]
    fn test_complete_order_issues_certificate() {
        let ca = authority();
        let order = Order::new("order-1", csr(&["example.test"]), vec![valid_authz("example.test")])
            .shared();

        ca.complete_order(&order);

        let order = order.lock().unwrap();
        assert_eq!(order.status, Status::Valid);
        let cert = order.certificate.as_ref().unwrap();
        assert_eq!(cert.dns_names().unwrap(), vec!["example.test".to_string()]);
        assert!(ca.store().get(cert.id()).is_some());
    }

    #[test]
    fn test_pending_authorization_blocks_completion() {
        let ca = authority();
        let authz = Authorization::new("authz-1", "example.test").shared();
        let order = Order::new("order-1", csr(&["example.test"]), vec![authz]).shared();

        ca.complete_order(&order);

        let order = order.lock().unwrap();
        assert_eq!(order.status, Status::Pending);
        assert!(order.certificate.is_none());
        assert_eq!(ca.store().len(), 2);
    }

    #[test]
    fn test_one_invalid_authorization_among_valid_blocks_completion() {
        let ca = authority();
        let authzs = vec![
            valid_authz("a.test"),
            Authorization::new("authz-b", "b.test")
                .with_status(Status::Invalid)
                .shared(),
        ];
        let order = Order::new("order-1", csr(&["a.test", "b.test"]), authzs).shared();

        ca.complete_order(&order);

        assert_eq!(order.lock().unwrap().status, Status::Pending);
    }

    #[test]
    fn test_non_pending_order_is_not_reissued() {
        let ca = authority();
        let order = Order::new("order-1", csr(&["example.test"]), vec![valid_authz("example.test")])
            .shared();

        ca.complete_order(&order);
        let first_id = order
            .lock()
            .unwrap()
            .certificate
            .as_ref()
            .unwrap()
            .id()
            .to_string();
        assert_eq!(ca.store().len(), 3);

        ca.complete_order(&order);

        let order = order.lock().unwrap();
        assert_eq!(order.status, Status::Valid);
        assert_eq!(order.certificate.as_ref().unwrap().id(), first_id);
        assert_eq!(ca.store().len(), 3);
    }

    #[test]
    fn test_issuance_failure_leaves_order_processing() {
        let ca = authority();
        let order = Order::new("order-1", csr(&[]), vec![valid_authz("example.test")]).shared();

        ca.complete_order(&order);

        let order = order.lock().unwrap();
        assert_eq!(order.status, Status::Processing);
        assert!(order.certificate.is_none());
    }

    #[test]
    fn test_order_without_authorizations_completes() {
        let ca = authority();
        let order = Order::new("order-1", csr(&["example.test"]), Vec::new()).shared();

        ca.complete_order(&order);

        assert_eq!(order.lock().unwrap().status, Status::Valid);
    }
}
