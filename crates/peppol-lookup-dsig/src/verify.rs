//! Enveloped XML-DSig verification.

use std::collections::HashSet;
use std::sync::Arc;

use roxmltree::{Document, Node, ParsingOptions};
use x509_parser::parse_x509_certificate;

use crate::algorithms::{DigestAlgorithm, SignatureAlgorithm};
use crate::canonical::canonicalize;
use crate::error::{Result, SignatureError};
use crate::keysel::CertificateSelector;
use crate::ns::attr;
use crate::signature::{ReferenceElement, SignatureElement};
use crate::trust::TrustContext;

/// A reference whose digest matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReference {
    pub uri: String,
    pub digest_algorithm: DigestAlgorithm,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// DER encoding of the certificate whose key verified the signature.
    pub signer_certificate: Vec<u8>,
    /// Subject of the signer certificate in RFC 2253 form.
    pub signer_subject: String,
    /// `X509SubjectName` values from KeyInfo. Not covered by the signature.
    pub declared_subjects: Vec<String>,
    pub signature_method: SignatureAlgorithm,
    pub references: Vec<VerifiedReference>,
}

impl VerifiedSignature {
    /// Whether a reference with `URI=""` covers the whole document.
    pub fn covers_whole_document(&self) -> bool {
        self.references.iter().any(|r| r.uri.is_empty())
    }
}

/// Verifies the first `ds:Signature` of a document against a trust context.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    trust: Arc<TrustContext>,
    time: Option<i64>,
}

impl SignatureVerifier {
    /// Create a verifier checking certificate validity at the current time.
    pub fn new(trust: Arc<TrustContext>) -> Self {
        Self { trust, time: None }
    }

    /// Check certificate validity at a fixed Unix time instead.
    pub fn at_time(mut self, unix_time: i64) -> Self {
        self.time = Some(unix_time);
        self
    }

    /// The trust context.
    pub fn trust(&self) -> &TrustContext {
        &self.trust
    }

    /// Verify `xml`.
    ///
    /// The signature value must verify under a selected KeyInfo certificate
    /// and every reference digest must match.
    pub fn verify(&self, xml: &[u8]) -> Result<VerifiedSignature> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| SignatureError::Xml(format!("not UTF-8: {}", e)))?;
        let doc = parse_document(text)?;
        check_unique_ids(&doc)?;

        let node = SignatureElement::find(doc.root()).ok_or(SignatureError::MissingSignature)?;
        let signature = SignatureElement::parse(node)?;

        let store = self.trust.trust_store()?;
        let selector = match self.time {
            Some(t) => CertificateSelector::at(store, t)?,
            None => CertificateSelector::new(store),
        };
        let selected = selector.select(&signature.certificates, signature.method)?;

        let (_, signer) = parse_x509_certificate(&selected.certificate)
            .map_err(|e| SignatureError::Malformed(format!("bad signer certificate: {}", e)))?;
        let signed_info = canonicalize(signature.signed_info, &signature.canonicalization, None);
        if let Err(e) = signature.method.verify(
            signer.public_key(),
            signed_info.as_bytes(),
            &signature.signature_value,
        ) {
            tracing::warn!(
                subject = %selected.subject,
                method = signature.method.uri(),
                error = %e,
                "signature value does not verify"
            );
            return Err(SignatureError::InvalidSignature);
        }

        let mut references = Vec::with_capacity(signature.references.len());
        let mut failed = false;
        for reference in &signature.references {
            match check_reference(&doc, &signature, reference) {
                Ok(()) => {
                    tracing::debug!(uri = %reference.uri, "reference digest matches");
                    references.push(VerifiedReference {
                        uri: reference.uri.clone(),
                        digest_algorithm: reference.digest_algorithm,
                    });
                }
                Err(e) => {
                    tracing::warn!(uri = %reference.uri, error = %e, "reference does not verify");
                    failed = true;
                }
            }
        }
        if failed {
            return Err(SignatureError::InvalidSignature);
        }

        tracing::debug!(subject = %selected.subject, "signature verified");
        Ok(VerifiedSignature {
            signer_certificate: selected.certificate,
            signer_subject: selected.subject,
            declared_subjects: signature.subject_names,
            signature_method: signature.method,
            references,
        })
    }
}

fn parse_document(text: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| SignatureError::Xml(e.to_string()))
}

fn check_unique_ids(doc: &Document<'_>) -> Result<()> {
    let mut seen = HashSet::new();
    for element in doc.descendants().filter(|n| n.is_element()) {
        for name in attr::ID_ATTRIBUTES {
            if let Some(id) = element.attribute(*name) {
                if !seen.insert(id) {
                    return Err(SignatureError::Malformed(format!("duplicate ID {:?}", id)));
                }
            }
        }
    }
    Ok(())
}

fn check_reference(
    doc: &Document<'_>,
    signature: &SignatureElement<'_, '_>,
    reference: &ReferenceElement,
) -> Result<()> {
    let target = resolve_uri(doc, &reference.uri)?;

    // Same-document references select a node set without comments.
    let mut method = reference.canonicalization();
    method.with_comments = false;

    let exclude = reference.is_enveloped().then(|| signature.node.id());
    let canonical = canonicalize(target, &method, exclude);
    let digest = reference.digest_algorithm.digest(canonical.as_bytes());

    if digest == reference.digest_value {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}

fn resolve_uri<'a, 'input>(doc: &'a Document<'input>, uri: &str) -> Result<Node<'a, 'input>> {
    if uri.is_empty() {
        return Ok(doc.root());
    }
    let id = uri
        .strip_prefix('#')
        .ok_or_else(|| SignatureError::Malformed(format!("unsupported reference URI {:?}", uri)))?;
    doc.descendants()
        .filter(|n| n.is_element())
        .find(|n| attr::ID_ATTRIBUTES.iter().any(|a| n.attribute(*a) == Some(id)))
        .ok_or_else(|| SignatureError::Malformed(format!("reference target {:?} not found", uri)))
}
