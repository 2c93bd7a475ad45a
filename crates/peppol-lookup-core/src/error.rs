//! Error types for the Peppol Lookup Core.

use thiserror::Error;

/// Errors raised while turning an identifier into a DNS name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// A non-empty SML zone must end with a dot. This is a configuration
    /// problem and is never corrected silently.
    #[error("invalid SML zone {zone:?}: a non-empty zone must end with '.'")]
    InvalidZone { zone: String },

    /// The identifier value is empty and cannot be hashed into a label.
    #[error("identifier value must not be empty")]
    EmptyValue,
}

impl NamingError {
    /// Whether this error stems from configuration rather than input.
    pub fn is_configuration(&self) -> bool {
        matches!(self, NamingError::InvalidZone { .. })
    }
}

/// Result type for naming operations.
pub type Result<T> = std::result::Result<T, NamingError>;
