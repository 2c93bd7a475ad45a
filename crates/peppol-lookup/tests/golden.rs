//! Golden naming vectors through the full lookup front end.
//!
//! In direct discovery mode the SMP host is the participant name itself, so
//! the base URL pins the whole naming pipeline.

use std::sync::Arc;

use peppol_lookup::dns::StaticNaptrLookup;
use peppol_lookup::smp::MemoryTransport;
use peppol_lookup::{DiscoveryMode, LookupConfig, SmpLookup};
use peppol_lookup_testkit::{all_vectors, verify_all_vectors, TestPki};

#[test]
fn test_golden_vectors_match() {
    for (name, matches, computed) in verify_all_vectors() {
        assert!(matches, "vector '{}' produced {}", name, computed);
    }
}

#[test]
fn test_golden_vectors_as_direct_urls() {
    let pki = TestPki::new();
    for vector in all_vectors() {
        let config = LookupConfig {
            sml_zone: vector.sml_zone(),
            hashing: vector.variant,
            discovery: DiscoveryMode::Direct,
            ..LookupConfig::default()
        };
        let naptr = Arc::new(StaticNaptrLookup::new());
        let lookup = SmpLookup::new(
            config,
            naptr.clone(),
            Arc::new(MemoryTransport::new()),
            pki.trust_context(),
        );

        let url = lookup.smp_base_url(&vector.participant()).unwrap();
        assert_eq!(
            url.to_lowercase(),
            format!("http://{}", vector.expected_name.to_lowercase()),
            "vector '{}'",
            vector.name
        );
        assert_eq!(naptr.query_count(), 0);
    }
}

#[test]
fn test_names_never_end_with_dot() {
    for vector in all_vectors() {
        let computed = peppol_lookup_testkit::name_from_vector(&vector);
        assert!(!computed.ends_with('.'), "vector '{}' produced {}", vector.name, computed);
    }
}
