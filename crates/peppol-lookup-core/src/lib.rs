//! # Peppol Lookup Core
//!
//! Pure primitives for Peppol service discovery: identifiers, DNS name
//! hashing, and SML zone descriptions.
//!
//! This crate contains no I/O, no DNS, no networking. Everything here is
//! deterministic computation and is safe to call from any number of threads
//! without synchronization.
//!
//! ## Key Types
//!
//! - [`ParticipantId`], [`DocumentTypeId`], [`ProcessId`] - identifier newtypes
//! - [`Identifier`] - the read-only view every identifier exposes
//! - [`NameEncoder`] - participant identifier to DNS label
//! - [`ZoneNameBuilder`] - label + scheme + zone to a fully-qualified name
//! - [`SmlZone`] - an SML DNS zone and its management endpoint
//!
//! ## Naming
//!
//! ```rust
//! use peppol_lookup_core::{HashingVariant, NameEncoder, ParticipantId, SmlZone};
//!
//! let participant = ParticipantId::new("iso6523-actorid-upis", "9915:test");
//! let encoder = NameEncoder::new(HashingVariant::Legacy);
//! let name = encoder.resolved_name(&participant, &SmlZone::peppol_test()).unwrap();
//! assert_eq!(
//!     name.as_str(),
//!     "b-85008b8279e07ab0392da75fa55856a2.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu"
//! );
//! ```

pub mod crypto;
pub mod error;
pub mod naming;
pub mod sml;
pub mod types;

pub use crypto::{base32_encode, Md5Digest, Sha256Digest};
pub use error::{NamingError, Result};
pub use naming::{
    encode_value, HashingVariant, NameEncoder, NamingOptions, ResolvedName, ZoneNameBuilder,
};
pub use sml::SmlZone;
pub use types::{DocumentTypeId, Identifier, ParticipantId, ProcessId};
