//! Error types for NAPTR resolution.

use thiserror::Error;

/// Errors that can occur while resolving a name to an SMP URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    /// The queried name is not a syntactically valid DNS name.
    #[error("invalid DNS name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// No usable NAPTR record exists for the name.
    #[error("no NAPTR record for {name}")]
    NoRecord { name: String },

    /// A NAPTR record was found but could not be applied.
    #[error("invalid NAPTR record for {name}: {reason}")]
    InvalidRecord { name: String, reason: String },

    /// The DNS query itself failed.
    #[error("DNS query for {name} failed: {message}")]
    Transport { name: String, message: String },
}

impl DnsError {
    /// The name the failing query was about.
    pub fn name(&self) -> &str {
        match self {
            DnsError::InvalidName { name, .. }
            | DnsError::NoRecord { name }
            | DnsError::InvalidRecord { name, .. }
            | DnsError::Transport { name, .. } => name,
        }
    }
}

/// Result type for DNS operations.
pub type Result<T> = std::result::Result<T, DnsError>;
