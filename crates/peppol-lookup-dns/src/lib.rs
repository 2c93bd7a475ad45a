//! # Peppol Lookup DNS
//!
//! NAPTR resolution for Peppol service discovery. Turns a hashed participant
//! name into the base URL of the SMP that serves the participant.
//!
//! ## Overview
//!
//! DNS access is abstracted behind the [`NaptrLookup`] trait so the resolver
//! does not care where records come from. The production backend is
//! [`HickoryNaptrLookup`]; [`StaticNaptrLookup`] serves fixed records for tests
//! and counts how often it is queried.
//!
//! ## Key Types
//!
//! - [`NaptrResolver`] - record selection, regexp rewriting, caching
//! - [`NaptrCache`] - thread-safe name to URL cache with TTL expiry
//! - [`NaptrLookup`] - the trait every DNS backend implements
//! - [`NaptrRecord`] - a backend-neutral NAPTR record
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use peppol_lookup_dns::{NaptrConfig, NaptrRecord, NaptrResolver, StaticNaptrLookup};
//!
//! let name = "b-85008b8279e07ab0392da75fa55856a2.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu";
//! let lookup = Arc::new(StaticNaptrLookup::new());
//! lookup.insert(name, NaptrRecord::smp("!^.*$!https://smp.example.org!"));
//!
//! let resolver = NaptrResolver::new(lookup, NaptrConfig::default());
//! assert_eq!(resolver.resolve(name, None, true).unwrap(), "smp.example.org");
//! assert_eq!(resolver.resolve_url(name, None, true).unwrap(), "https://smp.example.org");
//! ```
//!
//! ## Design Notes
//!
//! - **Cache**: many readers, one writer; entries expire at the record TTL
//!   capped by [`NaptrConfig::max_cache_ttl`]
//! - **No retries**: a failed query surfaces immediately as a [`DnsError`]
//! - **Syntax before network**: malformed names fail with
//!   [`DnsError::InvalidName`] without touching DNS

pub mod cache;
pub mod error;
pub mod hickory;
pub mod memory;
pub mod resolver;
pub mod traits;

pub use cache::NaptrCache;
pub use error::{DnsError, Result};
pub use hickory::HickoryNaptrLookup;
pub use memory::StaticNaptrLookup;
pub use resolver::{apply_regexp, strip_url_scheme, validate_name, NaptrConfig, NaptrResolver};
pub use traits::{NaptrLookup, NaptrRecord};
