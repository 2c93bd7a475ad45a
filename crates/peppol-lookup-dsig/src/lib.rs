//! # Peppol Lookup DSig
//!
//! XML digital signature verification for SMP documents.
//!
//! ## Overview
//!
//! SMP responses carry an enveloped `ds:Signature`. This crate checks that the
//! signature was made by a certificate issued by one of the configured trust
//! anchors, and that the signed content was not altered.
//!
//! Verification proceeds in a fixed order:
//!
//! 1. Parse the document (DTDs forbidden, duplicate IDs rejected)
//! 2. Locate the first `ds:Signature`
//! 3. Select the signer certificate from `KeyInfo`
//! 4. Verify the signature value over the canonical `SignedInfo`
//! 5. Recompute every reference digest
//!
//! ## Key Types
//!
//! - [`SignatureVerifier`] - runs the steps above against a [`TrustContext`]
//! - [`TrustContext`] - trust store source, loaded once on first use
//! - [`CertificateSelector`] - validity, trust path, and key compatibility
//! - [`Canonicalization`] - inclusive and exclusive C14N
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use peppol_lookup_dsig::{SignatureVerifier, TrustContext, TrustStoreSource};
//!
//! let trust = TrustContext::new(TrustStoreSource::Pem("peppol-smp-ca.pem".into()));
//! let verifier = SignatureVerifier::new(Arc::new(trust));
//!
//! let xml = std::fs::read("signed-service-metadata.xml").unwrap();
//! let verified = verifier.verify(&xml).unwrap();
//! println!("signed by {}", verified.signer_subject);
//! ```
//!
//! ## Design Notes
//!
//! - **One-element paths**: a signer is trusted if it is an anchor or was
//!   signed directly by one; there is no revocation checking
//! - **Skip, don't fail**: certificates that are expired, untrusted, or of the
//!   wrong key type are logged and skipped
//! - **Single failure**: any digest or signature value mismatch surfaces as
//!   [`SignatureError::InvalidSignature`]; details go to the log

pub mod algorithms;
pub mod canonical;
pub mod dn;
pub mod error;
pub mod keysel;
pub mod ns;
pub mod signature;
pub mod trust;
pub mod verify;

pub use algorithms::{DigestAlgorithm, KeyAlgorithm, SignatureAlgorithm};
pub use canonical::{canonicalize, C14nKind, Canonicalization};
pub use dn::rfc2253;
pub use error::{Result, SignatureError, TrustStoreError};
pub use keysel::{CertificateSelector, SelectedKey};
pub use signature::{ReferenceElement, SignatureElement, Transform};
pub use trust::{TrustAnchor, TrustContext, TrustStore, TrustStoreSource};
pub use verify::{SignatureVerifier, VerifiedReference, VerifiedSignature};
