//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::AmbiguityPolicy;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default socket read timeout.
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 10_000;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("peppol-lookup/", env!("CARGO_PKG_VERSION"));

/// HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Proxy URL for all requests, if any.
    pub proxy: Option<String>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds.
    pub socket_timeout_ms: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl HttpConfig {
    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout.
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// SMP client behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmpClientConfig {
    /// Verify document signatures. Turning this off is unsafe.
    pub verify_signatures: bool,
    /// Reject documents missing required elements.
    pub validate_structure: bool,
    /// What to do when several endpoints match.
    pub ambiguity_policy: AmbiguityPolicy,
    pub http: HttpConfig,
}

impl Default for SmpClientConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            validate_structure: true,
            ambiguity_policy: AmbiguityPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SmpClientConfig::default();
        assert!(config.verify_signatures);
        assert!(config.validate_structure);
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.http.socket_timeout(), Duration::from_secs(10));
        assert!(config.http.user_agent.starts_with("peppol-lookup/"));
    }

    #[test]
    fn test_partial_json() {
        let config: SmpClientConfig =
            serde_json::from_str(r#"{"http": {"connect_timeout_ms": 250}}"#).unwrap();
        assert!(config.verify_signatures);
        assert_eq!(config.http.connect_timeout_ms, 250);
        assert_eq!(config.http.socket_timeout_ms, DEFAULT_SOCKET_TIMEOUT_MS);

        let config: SmpClientConfig =
            serde_json::from_str(r#"{"ambiguity_policy": "reject"}"#).unwrap();
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Reject);
    }
}
