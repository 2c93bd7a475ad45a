//! Signer certificate selection.
//!
//! Each `X509Certificate` embedded in the signature's KeyInfo is a candidate.
//! A candidate is accepted when it is
//!
//! 1. inside its validity window at the verification time,
//! 2. compatible with the declared signature method (RSA, EC or DSA key), and
//! 3. trusted: either an anchor itself, or issued and signed by an anchor
//!    that may act as a CA (one-element path, no revocation checking).
//!
//! Rejected candidates are logged and skipped; only when none remains does
//! selection fail.

use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;

use crate::algorithms::{KeyAlgorithm, SignatureAlgorithm};
use crate::dn::rfc2253;
use crate::error::{Result, SignatureError};
use crate::trust::{TrustAnchor, TrustStore};

/// The accepted signer certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedKey {
    /// DER encoding of the certificate.
    pub certificate: Vec<u8>,
    /// Subject distinguished name in RFC 2253 form.
    pub subject: String,
}

/// Picks the signer certificate among KeyInfo candidates.
pub struct CertificateSelector<'a> {
    store: &'a TrustStore,
    time: ASN1Time,
}

impl<'a> CertificateSelector<'a> {
    /// Select against `store` at the current time.
    pub fn new(store: &'a TrustStore) -> Self {
        Self {
            store,
            time: ASN1Time::now(),
        }
    }

    /// Select against `store` at a fixed Unix time.
    pub fn at(store: &'a TrustStore, unix_time: i64) -> Result<Self> {
        let time = ASN1Time::from_timestamp(unix_time)
            .map_err(|e| SignatureError::Malformed(format!("bad verification time: {}", e)))?;
        Ok(Self { store, time })
    }

    /// First acceptable candidate, in KeyInfo order.
    pub fn select(&self, candidates: &[Vec<u8>], method: SignatureAlgorithm) -> Result<SelectedKey> {
        for (index, der) in candidates.iter().enumerate() {
            let cert = match parse_x509_certificate(der) {
                Ok((_, cert)) => cert,
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unparseable KeyInfo certificate");
                    continue;
                }
            };
            let subject = rfc2253(cert.subject());

            if !cert.validity().is_valid_at(self.time) {
                tracing::warn!(index, %subject, "skipping certificate outside its validity window");
                continue;
            }

            match KeyAlgorithm::of(cert.public_key()) {
                Some(key) if method.is_compatible_with(key) => {}
                key => {
                    tracing::warn!(
                        index,
                        %subject,
                        key = ?key,
                        method = method.uri(),
                        "skipping certificate whose key does not match the signature method"
                    );
                    continue;
                }
            }

            if !self.is_trusted(der, &cert) {
                tracing::warn!(index, %subject, "skipping certificate not issued by a trust anchor");
                continue;
            }

            tracing::debug!(index, %subject, "selected signer certificate");
            return Ok(SelectedKey {
                certificate: der.clone(),
                subject,
            });
        }

        Err(SignatureError::NoTrustedKey)
    }

    fn is_trusted(&self, der: &[u8], cert: &X509Certificate<'_>) -> bool {
        if self.store.contains(der) {
            return true;
        }
        self.store
            .anchors()
            .iter()
            .any(|anchor| self.issued_by(cert, anchor))
    }

    fn issued_by(&self, cert: &X509Certificate<'_>, anchor: &TrustAnchor) -> bool {
        let Some(issuer) = anchor.certificate() else {
            return false;
        };

        if issuer.subject().as_raw() != cert.issuer().as_raw() {
            return false;
        }
        if !issuer.validity().is_valid_at(self.time) {
            return false;
        }
        match issuer.basic_constraints() {
            Ok(Some(bc)) if !bc.value.ca => return false,
            Err(_) => return false,
            _ => {}
        }

        cert.verify_signature(Some(issuer.public_key())).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};

    struct Pki {
        ca_der: Vec<u8>,
        leaf_der: Vec<u8>,
    }

    fn pki(ca_is_ca: bool, leaf_years: (i32, i32)) -> Pki {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(vec![]).unwrap();
        ca_params.distinguished_name.push(DnType::CommonName, "Test CA");
        if ca_is_ca {
            ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        } else {
            ca_params.is_ca = IsCa::ExplicitNoCa;
        }
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let mut leaf_params = CertificateParams::new(vec![]).unwrap();
        leaf_params.distinguished_name.push(DnType::CommonName, "SMP Signer");
        leaf_params.not_before = rcgen::date_time_ymd(leaf_years.0, 1, 1);
        leaf_params.not_after = rcgen::date_time_ymd(leaf_years.1, 1, 1);
        let leaf = leaf_params.signed_by(&leaf_key, &ca, &ca_key).unwrap();

        Pki {
            ca_der: ca.der().to_vec(),
            leaf_der: leaf.der().to_vec(),
        }
    }

    #[test]
    fn test_issued_leaf_selected() {
        let pki = pki(true, (2020, 2100));
        let store = TrustStore::from_der(vec![pki.ca_der]).unwrap();
        let selected = CertificateSelector::new(&store)
            .select(&[pki.leaf_der.clone()], SignatureAlgorithm::EcdsaSha256)
            .unwrap();
        assert_eq!(selected.certificate, pki.leaf_der);
        assert!(selected.subject.contains("SMP Signer"));
    }

    #[test]
    fn test_anchor_itself_trusted() {
        let pki = pki(true, (2020, 2100));
        let store = TrustStore::from_der(vec![pki.leaf_der.clone()]).unwrap();
        assert!(CertificateSelector::new(&store)
            .select(&[pki.leaf_der], SignatureAlgorithm::EcdsaSha256)
            .is_ok());
    }

    #[test]
    fn test_algorithm_mismatch_skipped() {
        let pki = pki(true, (2020, 2100));
        let store = TrustStore::from_der(vec![pki.ca_der]).unwrap();
        let err = CertificateSelector::new(&store)
            .select(&[pki.leaf_der], SignatureAlgorithm::RsaSha256)
            .unwrap_err();
        assert_eq!(err, SignatureError::NoTrustedKey);
    }

    #[test]
    fn test_expired_certificate_skipped() {
        let pki = pki(true, (2000, 2001));
        let store = TrustStore::from_der(vec![pki.ca_der]).unwrap();
        let err = CertificateSelector::new(&store)
            .select(&[pki.leaf_der], SignatureAlgorithm::EcdsaSha256)
            .unwrap_err();
        assert_eq!(err, SignatureError::NoTrustedKey);
    }

    #[test]
    fn test_fixed_time_inside_window() {
        let pki = pki(true, (2000, 2001));
        let store = TrustStore::from_der(vec![pki.ca_der]).unwrap();
        // 2000-06-01T00:00:00Z
        let selector = CertificateSelector::at(&store, 959_817_600).unwrap();
        assert!(selector
            .select(&[pki.leaf_der], SignatureAlgorithm::EcdsaSha256)
            .is_ok());
    }

    #[test]
    fn test_untrusted_issuer_skipped() {
        let trusted = pki(true, (2020, 2100));
        let other = pki(true, (2020, 2100));
        let store = TrustStore::from_der(vec![trusted.ca_der]).unwrap();
        let err = CertificateSelector::new(&store)
            .select(&[other.leaf_der], SignatureAlgorithm::EcdsaSha256)
            .unwrap_err();
        assert_eq!(err, SignatureError::NoTrustedKey);
    }

    #[test]
    fn test_non_ca_anchor_cannot_issue() {
        let pki = pki(false, (2020, 2100));
        let store = TrustStore::from_der(vec![pki.ca_der]).unwrap();
        let err = CertificateSelector::new(&store)
            .select(&[pki.leaf_der], SignatureAlgorithm::EcdsaSha256)
            .unwrap_err();
        assert_eq!(err, SignatureError::NoTrustedKey);
    }

    #[test]
    fn test_first_acceptable_candidate_wins() {
        let trusted = pki(true, (2020, 2100));
        let other = pki(true, (2020, 2100));
        let store = TrustStore::from_der(vec![trusted.ca_der]).unwrap();
        let selected = CertificateSelector::new(&store)
            .select(
                &[vec![0, 1, 2], other.leaf_der, trusted.leaf_der.clone()],
                SignatureAlgorithm::EcdsaSha256,
            )
            .unwrap();
        assert_eq!(selected.certificate, trusted.leaf_der);
    }
}
