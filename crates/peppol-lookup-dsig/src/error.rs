//! Error types for signature verification.

use thiserror::Error;

/// Errors raised while loading a trust store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustStoreError {
    /// The trust store file could not be read.
    #[error("cannot read trust store {path}: {message}")]
    Io { path: String, message: String },

    /// The trust store content is not valid PEM/DER certificate data.
    #[error("malformed trust store: {0}")]
    Malformed(String),

    /// The trust store holds no certificates.
    #[error("trust store contains no certificates")]
    Empty,
}

/// Errors raised by signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The document carries no `ds:Signature` element.
    #[error("document is not signed")]
    MissingSignature,

    /// No embedded certificate is valid, trusted, and compatible with the
    /// signature method.
    #[error("no trusted key found")]
    NoTrustedKey,

    /// The signature value or a reference digest does not verify.
    #[error("signature is invalid")]
    InvalidSignature,

    /// The signature block is structurally broken.
    #[error("malformed signature: {0}")]
    Malformed(String),

    /// An algorithm URI is unknown or not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The document is not well-formed XML (or declares a DTD).
    #[error("XML error: {0}")]
    Xml(String),

    /// The trust store could not be loaded.
    #[error("trust store error: {0}")]
    TrustStore(#[from] TrustStoreError),
}

impl SignatureError {
    /// Whether this error stems from configuration rather than the document.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SignatureError::TrustStore(_))
    }
}

/// Result type for signature operations.
pub type Result<T> = std::result::Result<T, SignatureError>;
