//! # Peppol Lookup SMP
//!
//! Client for Service Metadata Publishers: fetches service groups and
//! service metadata, verifies signatures, follows redirects, and selects
//! endpoints.
//!
//! ## Overview
//!
//! An SMP serves two kinds of documents per participant:
//!
//! - `GET {base}/{participant}` returns the **service group**, listing the
//!   document types the participant accepts
//! - `GET {base}/{participant}/services/{document type}` returns signed
//!   **service metadata**: the processes and endpoints for that document
//!   type, or a **redirect** to another SMP
//!
//! ## Key Types
//!
//! - [`SmpClient`] - URL building, fetching, verification, pass-throughs
//! - [`SmpTransport`] - GET abstraction; [`HttpTransport`] in production,
//!   [`MemoryTransport`] in tests
//! - [`RedirectHandler`] - one-hop redirect with signer authentication
//! - [`EndpointSelector`] - process and transport profile matching
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use peppol_lookup_core::{DocumentTypeId, ParticipantId, ProcessId};
//! use peppol_lookup_dsig::{SignatureVerifier, TrustContext, TrustStoreSource};
//! use peppol_lookup_smp::{SmpClient, SmpClientConfig};
//!
//! let trust = TrustContext::new(TrustStoreSource::Pem("peppol-smp-ca.pem".into()));
//! let client = SmpClient::over_http(
//!     "https://smp.example.org",
//!     SignatureVerifier::new(Arc::new(trust)),
//!     SmpClientConfig::default(),
//! )
//! .unwrap();
//!
//! let address = client
//!     .get_endpoint_address(
//!         &ParticipantId::new("iso6523-actorid-upis", "9915:test"),
//!         &DocumentTypeId::new("busdox-docid-qns", "urn:invoice"),
//!         &ProcessId::new("cenbii-procid-ubl", "urn:billing"),
//!         "peppol-transport-as4-v2_0",
//!     )
//!     .unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Blocking**: every call blocks; there are no retries
//! - **Verified before parsed**: metadata is signature-checked on the raw
//!   bytes, and the signature must cover the whole document
//! - **Unsafe mode is loud**: disabling verification logs a warning per
//!   client and per unverified document

pub mod client;
pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod redirect;
pub mod transport;

pub use client::SmpClient;
pub use config::{HttpConfig, SmpClientConfig};
pub use document::{
    document_type_from_href, parse_service_group, parse_service_metadata, Endpoint, Process,
    Redirect, ServiceGroup, ServiceInformation, ServiceMetadata, SignedServiceMetadata, SmpFlavor,
};
pub use endpoint::{AmbiguityPolicy, EndpointSelector};
pub use error::{RedirectTrustError, Result, SelectionError, SmpClientError};
pub use redirect::{check_subject, RedirectHandler};
pub use transport::{
    memory::{MemoryResponse, MemoryTransport},
    status_error, HttpTransport, SmpTransport,
};
