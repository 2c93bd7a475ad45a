//! # Peppol Lookup Testkit
//!
//! Testing utilities for Peppol SMP lookup.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known participant names with expected DNS names
//! - **Generators**: proptest strategies for identifiers and zones
//! - **Fixtures**: a throwaway CA and signers producing enveloped signatures
//! - **Documents**: SMP 1.0 and BDXR document builders
//!
//! ## Golden Vectors
//!
//! ```rust
//! use peppol_lookup_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, computed) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, computed);
//! }
//! ```
//!
//! ## Signed Documents
//!
//! ```rust
//! use peppol_lookup_core::{DocumentTypeId, ParticipantId, ProcessId};
//! use peppol_lookup_dsig::SignatureVerifier;
//! use peppol_lookup_testkit::documents::{EndpointFixture, ServiceMetadataBuilder, XmlFlavor};
//! use peppol_lookup_testkit::fixtures::TestPki;
//!
//! let pki = TestPki::new();
//! let signer = pki.issue_signer("SMP One");
//!
//! let xml = ServiceMetadataBuilder::new(
//!     XmlFlavor::Peppol,
//!     ParticipantId::new("iso6523-actorid-upis", "9915:test"),
//!     DocumentTypeId::new("busdox-docid-qns", "urn:invoice"),
//! )
//! .process(
//!     ProcessId::new("cenbii-procid-ubl", "urn:billing"),
//!     vec![EndpointFixture::new("peppol-transport-as4-v2_0", "https://ap.example.org/as4", b"cert")],
//! )
//! .build();
//!
//! let signed = signer.sign(&xml);
//! assert!(SignatureVerifier::new(pki.trust_context()).verify(signed.as_bytes()).is_ok());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use peppol_lookup_core::NameEncoder;
//! use peppol_lookup_testkit::generators::NamingParams;
//!
//! proptest! {
//!     #[test]
//!     fn encode_is_deterministic(params: NamingParams) {
//!         let encoder = NameEncoder::new(params.variant);
//!         prop_assert_eq!(encoder.encode(&params.participant), encoder.encode(&params.participant));
//!     }
//! }
//! ```

pub mod documents;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use documents::{redirect_xml, service_group_xml, EndpointFixture, ServiceMetadataBuilder, XmlFlavor};
pub use fixtures::{TestPki, TestSigner};
pub use generators::NamingParams;
pub use vectors::{all_vectors, name_from_vector, verify_all_vectors, GoldenVector};
