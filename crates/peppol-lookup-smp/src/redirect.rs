//! Redirect following.
//!
//! A redirect names another SMP plus the subject its signing certificate
//! must carry. The target is fetched once and verified like any other
//! document. It is then accepted only if the certificate that verified it
//! has exactly that subject. A redirect found in the target is not followed.

use url::Url;

use peppol_lookup_dsig::VerifiedSignature;

use crate::client::SmpClient;
use crate::document::{Redirect, SignedServiceMetadata};
use crate::error::{RedirectTrustError, Result, SmpClientError};

/// Follows at most one redirect per lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectHandler;

impl RedirectHandler {
    /// Return `document` unless it is a redirect; otherwise fetch, verify
    /// and authenticate the target.
    pub fn follow_if_redirect(
        &self,
        document: SignedServiceMetadata,
        client: &SmpClient,
    ) -> Result<SignedServiceMetadata> {
        let Some(redirect) = document.redirect().cloned() else {
            return Ok(document);
        };

        let url = Url::parse(&redirect.href)
            .map_err(|e| SmpClientError::Malformed(format!("bad redirect href {}: {}", redirect.href, e)))?;
        tracing::debug!(href = %redirect.href, "following SMP redirect");

        let target = client.fetch_metadata(&url)?;

        if client.verification_enabled() {
            check_subject(&redirect, target.signature.as_ref())?;
        } else {
            tracing::warn!(
                href = %redirect.href,
                "not checking redirect target signer because verification is disabled (unsafe)"
            );
        }

        if let Some(next) = target.redirect() {
            tracing::warn!(
                href = %redirect.href,
                next = %next.href,
                "redirect target is itself a redirect; not following"
            );
        }

        Ok(target)
    }
}

/// Accept a redirect target only if its signer certificate subject equals
/// the declared `CertificateUID` byte for byte, and every KeyInfo
/// `X509SubjectName` it declares names that same subject.
pub fn check_subject(
    redirect: &Redirect,
    signature: Option<&VerifiedSignature>,
) -> std::result::Result<(), RedirectTrustError> {
    let signer = match signature {
        Some(signature) if !signature.signer_subject.is_empty() => signature,
        _ => {
            return Err(RedirectTrustError::MissingSubject {
                href: redirect.href.clone(),
            })
        }
    };

    if signer.signer_subject != redirect.certificate_uid {
        tracing::warn!(
            href = %redirect.href,
            expected = %redirect.certificate_uid,
            signer = %signer.signer_subject,
            "redirect target signed by an unexpected certificate"
        );
        return Err(RedirectTrustError::CertificateMismatch {
            expected: redirect.certificate_uid.clone(),
            found: signer.signer_subject.clone(),
        });
    }

    if let Some(declared) = signer.declared_subjects.iter().find(|d| **d != signer.signer_subject) {
        return Err(RedirectTrustError::DeclaredSubjectMismatch {
            declared: declared.clone(),
            signer: signer.signer_subject.clone(),
        });
    }

    Ok(())
}
