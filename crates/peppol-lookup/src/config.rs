//! Lookup configuration.
//!
//! Every field has a default, so a partial document deserializes. Durations
//! are given in milliseconds.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use peppol_lookup_core::{HashingVariant, NamingOptions, SmlZone};
use peppol_lookup_dns::NaptrConfig;
use peppol_lookup_smp::SmpClientConfig;

/// Default upper bound on NAPTR cache lifetime (1 hour).
pub const DEFAULT_NAPTR_CACHE_TTL_MS: u64 = 3_600_000;

/// How the SMP base URL is found for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// The hashed name is the SMP host: `http://{name}`.
    Direct,
    /// The hashed name carries a NAPTR record pointing at the SMP.
    #[default]
    Naptr,
}

/// Configuration for [`SmpLookup`](crate::SmpLookup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// SML zone participants are registered in.
    pub sml_zone: SmlZone,
    /// How identifier values are hashed into labels.
    pub hashing: HashingVariant,
    pub naming: NamingOptions,
    pub discovery: DiscoveryMode,
    /// DNS server to ask for NAPTR records instead of the system resolver.
    pub primary_dns: Option<IpAddr>,
    pub naptr_cache_enabled: bool,
    pub naptr_cache_ttl_ms: u64,
    /// PEM file holding the SMP signing CA certificates.
    pub trust_store_path: Option<PathBuf>,
    pub smp: SmpClientConfig,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            sml_zone: SmlZone::peppol_production(),
            hashing: HashingVariant::default(),
            naming: NamingOptions::default(),
            discovery: DiscoveryMode::default(),
            primary_dns: None,
            naptr_cache_enabled: true,
            naptr_cache_ttl_ms: DEFAULT_NAPTR_CACHE_TTL_MS,
            trust_store_path: None,
            smp: SmpClientConfig::default(),
        }
    }
}

impl LookupConfig {
    /// Pre-NAPTR Peppol: MD5 labels, SMP host taken directly from the name.
    pub fn legacy(sml_zone: SmlZone) -> Self {
        Self {
            sml_zone,
            hashing: HashingVariant::Legacy,
            discovery: DiscoveryMode::Direct,
            ..Self::default()
        }
    }

    /// NAPTR-era Peppol: SHA-256 labels resolved through NAPTR.
    pub fn modern(sml_zone: SmlZone) -> Self {
        Self {
            sml_zone,
            hashing: HashingVariant::Modern,
            discovery: DiscoveryMode::Naptr,
            ..Self::default()
        }
    }

    /// Resolver settings derived from this configuration.
    pub fn naptr_config(&self) -> NaptrConfig {
        NaptrConfig {
            cache_enabled: self.naptr_cache_enabled,
            max_cache_ttl: Duration::from_millis(self.naptr_cache_ttl_ms),
            ..NaptrConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LookupConfig::default();
        assert_eq!(config.sml_zone, SmlZone::peppol_production());
        assert_eq!(config.hashing, HashingVariant::Modern);
        assert_eq!(config.discovery, DiscoveryMode::Naptr);
        assert!(config.smp.verify_signatures);
        assert_eq!(config.naptr_config().max_cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_presets() {
        let legacy = LookupConfig::legacy(SmlZone::peppol_test());
        assert_eq!(legacy.hashing, HashingVariant::Legacy);
        assert_eq!(legacy.discovery, DiscoveryMode::Direct);
        let modern = LookupConfig::modern(SmlZone::peppol_test());
        assert_eq!(modern.discovery, DiscoveryMode::Naptr);
    }

    #[test]
    fn test_partial_json() {
        let config: LookupConfig = serde_json::from_str(
            r#"{
                "hashing": "legacy",
                "discovery": "direct",
                "primary_dns": "192.0.2.53",
                "naptr_cache_ttl_ms": 60000,
                "trust_store_path": "/etc/peppol/smp-ca.pem",
                "smp": { "http": { "connect_timeout_ms": 1500 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.hashing, HashingVariant::Legacy);
        assert_eq!(config.discovery, DiscoveryMode::Direct);
        assert_eq!(config.primary_dns, Some("192.0.2.53".parse().unwrap()));
        assert_eq!(config.naptr_config().max_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.trust_store_path, Some(PathBuf::from("/etc/peppol/smp-ca.pem")));
        assert_eq!(config.smp.http.connect_timeout_ms, 1500);
        assert!(config.smp.verify_signatures);
        assert_eq!(config.sml_zone, SmlZone::peppol_production());
    }
}
