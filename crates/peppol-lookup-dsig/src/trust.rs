//! Trust anchors and the lazily loaded trust context.

use std::fmt;
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::Pem;

use crate::dn::rfc2253;
use crate::error::TrustStoreError;

const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// A trusted certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    der: Vec<u8>,
    subject: String,
}

impl TrustAnchor {
    /// Wrap a DER certificate, checking that it parses.
    pub fn from_der(der: Vec<u8>) -> Result<Self, TrustStoreError> {
        let subject = {
            let (_, cert) = parse_x509_certificate(&der)
                .map_err(|e| TrustStoreError::Malformed(format!("bad certificate: {}", e)))?;
            rfc2253(cert.subject())
        };
        Ok(Self { der, subject })
    }

    /// The DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name in RFC 2253 form.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Parse the certificate. Cannot fail for anchors built by `from_der`.
    pub fn certificate(&self) -> Option<X509Certificate<'_>> {
        parse_x509_certificate(&self.der).ok().map(|(_, cert)| cert)
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrustAnchor({})", self.subject)
    }
}

/// A set of trust anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustStore {
    anchors: Vec<TrustAnchor>,
}

impl TrustStore {
    /// Build from DER certificates. An empty set is an error.
    pub fn from_der<I>(certificates: I) -> Result<Self, TrustStoreError>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let anchors = certificates
            .into_iter()
            .map(TrustAnchor::from_der)
            .collect::<Result<Vec<_>, _>>()?;
        if anchors.is_empty() {
            return Err(TrustStoreError::Empty);
        }
        Ok(Self { anchors })
    }

    /// Build from PEM text holding one or more `CERTIFICATE` blocks.
    ///
    /// Blocks with other labels are ignored.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TrustStoreError> {
        let mut certificates = Vec::new();
        for block in Pem::iter_from_buffer(pem) {
            let block = block.map_err(|e| TrustStoreError::Malformed(format!("bad PEM: {}", e)))?;
            if block.label == PEM_CERTIFICATE_LABEL {
                certificates.push(block.contents);
            }
        }
        Self::from_der(certificates)
    }

    /// Load from a source.
    pub fn load(source: &TrustStoreSource) -> Result<Self, TrustStoreError> {
        match source {
            TrustStoreSource::Pem(path) => {
                let bytes = std::fs::read(path).map_err(|e| TrustStoreError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Self::from_pem(&bytes)
            }
            TrustStoreSource::Der(certificates) => Self::from_der(certificates.iter().cloned()),
        }
    }

    /// All anchors.
    pub fn anchors(&self) -> &[TrustAnchor] {
        &self.anchors
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether there are no anchors.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Whether `der` is itself one of the anchors.
    pub fn contains(&self, der: &[u8]) -> bool {
        self.anchors.iter().any(|a| a.der == der)
    }
}

/// Where a trust store comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum TrustStoreSource {
    /// A PEM file with one or more certificates.
    Pem(PathBuf),
    /// DER certificates held in memory.
    Der(Vec<Vec<u8>>),
}

impl fmt::Debug for TrustStoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem(path) => write!(f, "Pem({})", path.display()),
            Self::Der(certs) => write!(f, "Der({} certificates)", certs.len()),
        }
    }
}

/// Trust store handle plus the verification switch.
///
/// The store is read on first use, at most once, even when many threads ask
/// at the same time. A failed load is not cached; the next use retries.
pub struct TrustContext {
    source: TrustStoreSource,
    store: OnceCell<TrustStore>,
    require_signature_verification: bool,
}

impl TrustContext {
    /// Create a context that verifies signatures against `source`.
    pub fn new(source: TrustStoreSource) -> Self {
        Self {
            source,
            store: OnceCell::new(),
            require_signature_verification: true,
        }
    }

    /// Create a context around an already loaded store.
    pub fn from_store(store: TrustStore) -> Self {
        let source = TrustStoreSource::Der(store.anchors().iter().map(|a| a.der.clone()).collect());
        Self {
            source,
            store: OnceCell::with_value(store),
            require_signature_verification: true,
        }
    }

    /// Set whether signatures must be verified.
    pub fn with_signature_verification(mut self, required: bool) -> Self {
        self.require_signature_verification = required;
        self
    }

    /// Whether signatures must be verified.
    pub fn require_signature_verification(&self) -> bool {
        self.require_signature_verification
    }

    /// The configured source.
    pub fn source(&self) -> &TrustStoreSource {
        &self.source
    }

    /// The trust store, loading it on first call.
    pub fn trust_store(&self) -> Result<&TrustStore, TrustStoreError> {
        self.store.get_or_try_init(|| {
            let store = TrustStore::load(&self.source)?;
            tracing::debug!(source = ?self.source, anchors = store.len(), "loaded trust store");
            Ok(store)
        })
    }

    /// Whether the store has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.store.get().is_some()
    }
}

impl fmt::Debug for TrustContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustContext")
            .field("source", &self.source)
            .field("loaded", &self.is_loaded())
            .field("require_signature_verification", &self.require_signature_verification)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    fn self_signed(cn: &str) -> rcgen::CertifiedKey {
        rcgen::generate_simple_self_signed(vec![cn.to_string()]).unwrap()
    }

    #[test]
    fn test_from_der_and_contains() {
        let cert = self_signed("anchor.example.org");
        let der = cert.cert.der().to_vec();
        let store = TrustStore::from_der(vec![der.clone()]).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains(&der));
        assert!(store.anchors()[0].certificate().is_some());
    }

    #[test]
    fn test_empty_and_malformed_rejected() {
        assert_eq!(TrustStore::from_der(Vec::new()), Err(TrustStoreError::Empty));
        assert!(matches!(
            TrustStore::from_der(vec![vec![1, 2, 3]]),
            Err(TrustStoreError::Malformed(_))
        ));
        assert_eq!(TrustStore::from_pem(b"no pem here"), Err(TrustStoreError::Empty));
    }

    #[test]
    fn test_pem_file_loaded_once() {
        let a = self_signed("a.example.org");
        let b = self_signed("b.example.org");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}{}", a.cert.pem(), b.cert.pem()).unwrap();

        let context = Arc::new(TrustContext::new(TrustStoreSource::Pem(file.path().to_path_buf())));
        assert!(!context.is_loaded());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || context.trust_store().unwrap() as *const TrustStore as usize)
            })
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(context.trust_store().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let context = TrustContext::new(TrustStoreSource::Pem("/nonexistent/trust.pem".into()));
        assert!(matches!(context.trust_store(), Err(TrustStoreError::Io { .. })));
        assert!(!context.is_loaded());
    }

    #[test]
    fn test_from_store_is_preloaded() {
        let cert = self_signed("c.example.org");
        let store = TrustStore::from_der(vec![cert.cert.der().to_vec()]).unwrap();
        let context = TrustContext::from_store(store).with_signature_verification(false);
        assert!(context.is_loaded());
        assert!(!context.require_signature_verification());
    }
}
