//! Error types for SMP client operations.

use peppol_lookup_dsig::SignatureError;
use thiserror::Error;

/// Errors that can occur while fetching and interpreting SMP documents.
#[derive(Debug, Error)]
pub enum SmpClientError {
    /// The SMP answered 400.
    #[error("bad request: {url}")]
    BadRequest { url: String },

    /// The SMP answered 403.
    #[error("unauthorized: {url}")]
    Unauthorized { url: String },

    /// The SMP answered 404, or could not be reached at all.
    #[error("not found: {url}")]
    NotFound { url: String, cause: Option<String> },

    /// The SMP answered any other non-success status.
    #[error("HTTP status {status} from {url}")]
    Http { url: String, status: u16 },

    /// Timeout or other transport fault.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// A URL could not be built from configuration.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The response is not a usable SMP document.
    #[error("malformed SMP document: {0}")]
    Malformed(String),

    /// The document signature did not verify.
    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    /// The redirect target is not signed by the announced certificate.
    #[error(transparent)]
    RedirectTrust(#[from] RedirectTrustError),

    /// Endpoint selection could not pick a single endpoint.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl SmpClientError {
    /// Whether this error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SmpClientError::NotFound { .. })
    }
}

/// Redirect authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectTrustError {
    /// The target's signer certificate subject differs from the declared
    /// `CertificateUID`.
    #[error("redirect target signer {found:?} does not match expected {expected:?}")]
    CertificateMismatch { expected: String, found: String },

    /// A KeyInfo `X509SubjectName` of the target differs from its signer
    /// certificate subject.
    #[error("redirect target declares subject {declared:?} but was signed by {signer:?}")]
    DeclaredSubjectMismatch { declared: String, signer: String },

    /// The target carries no verified signer subject.
    #[error("redirect target {href} has no verified signer subject")]
    MissingSubject { href: String },
}

/// Endpoint selection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Several endpoints match and the policy forbids choosing.
    #[error("{count} endpoints match transport profile {transport_profile}")]
    Ambiguous { count: usize, transport_profile: String },
}

/// Result type for SMP client operations.
pub type Result<T> = std::result::Result<T, SmpClientError>;
