//! PKI fixtures and an enveloped XML-DSig signer.
//!
//! [`TestPki`] holds a throwaway CA. Signers issued by it produce documents
//! that verify against [`TestPki::trust_context`].

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};

use peppol_lookup_dsig::ns::{self, alg};
use peppol_lookup_dsig::{
    canonicalize, Canonicalization, DigestAlgorithm, SignatureElement, TrustContext, TrustStore,
};

/// Valid base64 so the unsigned signature still parses before signing.
const SIGNATURE_VALUE_PLACEHOLDER: &str = "AAAA";

/// A test certificate authority.
pub struct TestPki {
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    /// Create a CA named "Peppol Test SMP CA".
    pub fn new() -> Self {
        let ca_key = KeyPair::generate().expect("generate CA key");
        let mut params = CertificateParams::new(Vec::new()).expect("CA params");
        params.distinguished_name.push(DnType::CommonName, "Peppol Test SMP CA");
        params.distinguished_name.push(DnType::OrganizationName, "Peppol Test");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let ca_cert = params.self_signed(&ca_key).expect("self-sign CA");
        Self { ca_cert, ca_key }
    }

    /// DER encoding of the CA certificate.
    pub fn ca_der(&self) -> Vec<u8> {
        self.ca_cert.der().to_vec()
    }

    /// PEM encoding of the CA certificate.
    pub fn ca_pem(&self) -> String {
        self.ca_cert.pem()
    }

    /// A trust store holding only this CA.
    pub fn trust_store(&self) -> TrustStore {
        TrustStore::from_der(vec![self.ca_der()]).expect("CA certificate parses")
    }

    /// A trust context over [`Self::trust_store`].
    pub fn trust_context(&self) -> Arc<TrustContext> {
        Arc::new(TrustContext::from_store(self.trust_store()))
    }

    /// Issue a signer valid from 2020 to 2100.
    pub fn issue_signer(&self, common_name: &str) -> TestSigner {
        self.issue(common_name, (2020, 2100))
    }

    /// Issue a signer whose certificate expired in 2001.
    pub fn issue_expired_signer(&self, common_name: &str) -> TestSigner {
        self.issue(common_name, (2000, 2001))
    }

    fn issue(&self, common_name: &str, years: (i32, i32)) -> TestSigner {
        let key = KeyPair::generate().expect("generate signer key");
        let mut params = signer_params(common_name);
        params.not_before = rcgen::date_time_ymd(years.0, 1, 1);
        params.not_after = rcgen::date_time_ymd(years.1, 1, 1);
        let cert = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .expect("issue signer certificate");
        TestSigner::from_parts(common_name, cert.der().to_vec(), key)
    }
}

impl Default for TestPki {
    fn default() -> Self {
        Self::new()
    }
}

/// An ECDSA P-256 signing identity.
pub struct TestSigner {
    certificate: Vec<u8>,
    pkcs8: Vec<u8>,
    subject: String,
}

impl TestSigner {
    /// A self-signed signer that no [`TestPki`] trusts.
    pub fn self_signed(common_name: &str) -> Self {
        let key = KeyPair::generate().expect("generate signer key");
        let cert = signer_params(common_name)
            .self_signed(&key)
            .expect("self-sign signer");
        Self::from_parts(common_name, cert.der().to_vec(), key)
    }

    fn from_parts(common_name: &str, certificate: Vec<u8>, key: KeyPair) -> Self {
        Self {
            certificate,
            pkcs8: key.serialize_der(),
            subject: subject_for(common_name),
        }
    }

    /// DER encoding of the signer certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate
    }

    /// The certificate subject in RFC 2253 form, also written into
    /// `X509SubjectName` by [`Self::sign`].
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sign `xml` with an enveloped signature covering the whole document.
    ///
    /// The signature is appended as the last child of the root element,
    /// which must end with an explicit closing tag.
    pub fn sign(&self, xml: &str) -> String {
        self.sign_with_subject(xml, &self.subject)
    }

    /// Like [`Self::sign`], declaring `subject_name` in `X509SubjectName`.
    pub fn sign_with_subject(&self, xml: &str, subject_name: &str) -> String {
        let canonical = {
            let doc = roxmltree::Document::parse(xml).expect("unsigned document parses");
            canonicalize(doc.root(), &Canonicalization::exclusive(), None)
        };
        let digest = STANDARD.encode(DigestAlgorithm::Sha256.digest(canonical.as_bytes()));

        let signature = format!(
            concat!(
                r#"<ds:Signature xmlns:ds="{dsig}">"#,
                r#"<ds:SignedInfo>"#,
                r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
                r#"<ds:SignatureMethod Algorithm="{method}"/>"#,
                r#"<ds:Reference URI="">"#,
                r#"<ds:Transforms>"#,
                r#"<ds:Transform Algorithm="{enveloped}"/>"#,
                r#"<ds:Transform Algorithm="{c14n}"/>"#,
                r#"</ds:Transforms>"#,
                r#"<ds:DigestMethod Algorithm="{digest_method}"/>"#,
                r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
                r#"</ds:Reference>"#,
                r#"</ds:SignedInfo>"#,
                r#"<ds:SignatureValue>{placeholder}</ds:SignatureValue>"#,
                r#"<ds:KeyInfo><ds:X509Data>"#,
                r#"<ds:X509SubjectName>{subject}</ds:X509SubjectName>"#,
                r#"<ds:X509Certificate>{certificate}</ds:X509Certificate>"#,
                r#"</ds:X509Data></ds:KeyInfo>"#,
                r#"</ds:Signature>"#,
            ),
            dsig = ns::DSIG,
            c14n = alg::EXC_C14N,
            method = alg::ECDSA_SHA256,
            enveloped = alg::ENVELOPED_SIGNATURE,
            digest_method = alg::SHA256,
            digest = digest,
            placeholder = SIGNATURE_VALUE_PLACEHOLDER,
            subject = crate::documents::escape(subject_name),
            certificate = STANDARD.encode(&self.certificate),
        );

        let close = xml.rfind("</").expect("root element has a closing tag");
        let with_placeholder = format!("{}{}{}", &xml[..close], signature, &xml[close..]);

        let signed_info = {
            let doc = roxmltree::Document::parse(&with_placeholder).expect("signed document parses");
            let node = SignatureElement::find(doc.root()).expect("signature present");
            let parsed = SignatureElement::parse(node).expect("signature parses");
            canonicalize(parsed.signed_info, &Canonicalization::exclusive(), None)
        };

        let rng = SystemRandom::new();
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &self.pkcs8, &rng)
            .expect("signer key loads");
        let value = key
            .sign(&rng, signed_info.as_bytes())
            .expect("signing succeeds");

        with_placeholder.replacen(
            &signature_value_element(SIGNATURE_VALUE_PLACEHOLDER),
            &signature_value_element(&STANDARD.encode(value.as_ref())),
            1,
        )
    }
}

fn signature_value_element(value: &str) -> String {
    format!("<ds:SignatureValue>{}</ds:SignatureValue>", value)
}

/// RFC 2253 form of the subject [`signer_params`] encodes.
fn subject_for(common_name: &str) -> String {
    format!("CN={},O=Peppol Test,C=BE", common_name)
}

fn signer_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::new()).expect("signer params");
    params.distinguished_name.push(DnType::CountryName, "BE");
    params.distinguished_name.push(DnType::OrganizationName, "Peppol Test");
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use peppol_lookup_dsig::{SignatureError, SignatureVerifier};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Doc xmlns="urn:test" b="2" a="1">
  <Item>one &amp; two</Item>
  <Empty/>
</Doc>"#;

    #[test]
    fn test_signed_document_verifies() {
        let pki = TestPki::new();
        let signer = pki.issue_signer("SMP One");
        let signed = signer.sign(DOC);

        let verified = SignatureVerifier::new(pki.trust_context())
            .verify(signed.as_bytes())
            .unwrap();
        assert_eq!(verified.signer_certificate, signer.certificate_der());
        assert!(verified.covers_whole_document());
        assert_eq!(verified.signer_subject, "CN=SMP One,O=Peppol Test,C=BE");
        assert_eq!(verified.signer_subject, signer.subject());
        assert_eq!(verified.declared_subjects, vec![signer.subject().to_string()]);
        assert!(!signed.contains(&signature_value_element(SIGNATURE_VALUE_PLACEHOLDER)));
    }

    #[test]
    fn test_declared_subject_is_free_text() {
        let pki = TestPki::new();
        let signer = pki.issue_signer("SMP Evil");
        let signed = signer.sign_with_subject(DOC, "CN=SMP Two,O=Peppol Test,C=BE");

        let verified = SignatureVerifier::new(pki.trust_context())
            .verify(signed.as_bytes())
            .unwrap();
        assert_eq!(verified.signer_subject, "CN=SMP Evil,O=Peppol Test,C=BE");
        assert_eq!(verified.declared_subjects, vec!["CN=SMP Two,O=Peppol Test,C=BE".to_string()]);
    }

    #[test]
    fn test_untrusted_signer_rejected() {
        let pki = TestPki::new();
        let signed = TestSigner::self_signed("Rogue SMP").sign(DOC);
        assert_eq!(
            SignatureVerifier::new(pki.trust_context()).verify(signed.as_bytes()),
            Err(SignatureError::NoTrustedKey)
        );
    }
}
