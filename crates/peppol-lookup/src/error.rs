//! Error types for the lookup pipeline.

use peppol_lookup_core::NamingError;
use peppol_lookup_dns::DnsError;
use peppol_lookup_dsig::{SignatureError, TrustStoreError};
use peppol_lookup_smp::SmpClientError;
use thiserror::Error;

/// Errors that can occur at any step of a lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The participant could not be turned into a DNS name.
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),

    /// NAPTR resolution failed.
    #[error("DNS error: {0}")]
    Dns(#[from] DnsError),

    /// Fetching or interpreting SMP documents failed.
    #[error("SMP error: {0}")]
    Smp(#[from] SmpClientError),

    /// The trust store could not be loaded ahead of any verification.
    #[error("trust store error: {0}")]
    TrustStore(#[from] TrustStoreError),

    /// The lookup configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Coarse category of a [`LookupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The participant, its SMP, or the requested document does not exist.
    NotFound,
    /// The SMP refused access.
    Unauthorized,
    /// The request was rejected as invalid.
    BadRequest,
    /// A signature or signer identity could not be trusted.
    Untrusted,
    /// DNS or HTTP transport failure.
    Network,
    /// A peer answered with something unusable.
    Protocol,
    /// Local configuration is wrong.
    Configuration,
}

impl LookupError {
    /// The category callers usually branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::Naming(e) if e.is_configuration() => ErrorKind::Configuration,
            LookupError::Naming(_) => ErrorKind::BadRequest,
            LookupError::Dns(e) => dns_kind(e),
            LookupError::Smp(e) => smp_kind(e),
            LookupError::TrustStore(_) | LookupError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the participant or document simply does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

fn dns_kind(error: &DnsError) -> ErrorKind {
    match error {
        DnsError::InvalidName { .. } => ErrorKind::BadRequest,
        DnsError::NoRecord { .. } => ErrorKind::NotFound,
        DnsError::InvalidRecord { .. } => ErrorKind::Protocol,
        DnsError::Transport { .. } => ErrorKind::Network,
    }
}

fn smp_kind(error: &SmpClientError) -> ErrorKind {
    match error {
        SmpClientError::BadRequest { .. } => ErrorKind::BadRequest,
        SmpClientError::Unauthorized { .. } => ErrorKind::Unauthorized,
        SmpClientError::NotFound { .. } => ErrorKind::NotFound,
        SmpClientError::Http { .. } | SmpClientError::Malformed(_) | SmpClientError::Selection(_) => {
            ErrorKind::Protocol
        }
        SmpClientError::Transport { .. } => ErrorKind::Network,
        SmpClientError::InvalidUrl { .. } => ErrorKind::Configuration,
        SmpClientError::Signature(e) => signature_kind(e),
        SmpClientError::RedirectTrust(_) => ErrorKind::Untrusted,
    }
}

fn signature_kind(error: &SignatureError) -> ErrorKind {
    match error {
        SignatureError::TrustStore(_) => ErrorKind::Configuration,
        SignatureError::Xml(_) => ErrorKind::Protocol,
        SignatureError::MissingSignature
        | SignatureError::NoTrustedKey
        | SignatureError::InvalidSignature
        | SignatureError::Malformed(_)
        | SignatureError::UnsupportedAlgorithm(_) => ErrorKind::Untrusted,
    }
}

/// Result type for lookups.
pub type Result<T> = std::result::Result<T, LookupError>;
