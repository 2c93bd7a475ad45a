//! # Peppol Lookup
//!
//! Find where to deliver a Peppol business document: from a participant
//! identifier to a verified endpoint address and certificate.
//!
//! ## Overview
//!
//! A lookup runs these steps, each failing with a typed error:
//!
//! 1. **Name**: hash the participant value and append scheme and SML zone
//! 2. **Locate**: use the name as SMP host, or resolve its NAPTR record
//! 3. **Fetch**: GET the service metadata from the SMP
//! 4. **Verify**: check the XML signature against the trust store
//! 5. **Redirect**: follow at most one redirect, authenticating its signer
//! 6. **Select**: pick the endpoint for a process and transport profile
//!
//! ## Usage
//!
//! ```rust,no_run
//! use peppol_lookup::{LookupConfig, SmpLookup};
//! use peppol_lookup::core::{DocumentTypeId, ParticipantId, ProcessId, SmlZone};
//!
//! let config = LookupConfig {
//!     trust_store_path: Some("peppol-smp-ca.pem".into()),
//!     ..LookupConfig::modern(SmlZone::peppol_production())
//! };
//! let lookup = SmpLookup::from_config(config).unwrap();
//!
//! let address = lookup
//!     .endpoint_address(
//!         &ParticipantId::new("iso6523-actorid-upis", "0088:5798000000001"),
//!         &DocumentTypeId::new("busdox-docid-qns", "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2::Invoice##urn:cen.eu:en16931:2017::2.1"),
//!         &ProcessId::new("cenbii-procid-ubl", "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0"),
//!         "peppol-transport-as4-v2_0",
//!     )
//!     .unwrap();
//! ```
//!
//! ## Re-exports
//!
//! - `peppol_lookup::core` - identifiers, naming, SML zones
//! - `peppol_lookup::dns` - NAPTR resolution and cache
//! - `peppol_lookup::dsig` - XML signature verification and trust stores
//! - `peppol_lookup::smp` - SMP client, redirects, endpoint selection

pub mod config;
pub mod error;
pub mod lookup;

pub use peppol_lookup_core as core;
pub use peppol_lookup_dns as dns;
pub use peppol_lookup_dsig as dsig;
pub use peppol_lookup_smp as smp;

pub use config::{DiscoveryMode, LookupConfig};
pub use error::{ErrorKind, LookupError, Result};
pub use lookup::SmpLookup;

pub use peppol_lookup_core::{
    DocumentTypeId, HashingVariant, Identifier, ParticipantId, ProcessId, SmlZone,
};
pub use peppol_lookup_smp::{Endpoint, ServiceMetadata, SignedServiceMetadata};
