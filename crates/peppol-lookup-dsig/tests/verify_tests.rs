//! End-to-end signature verification over signed SMP documents.

use std::io::Write;
use std::sync::Arc;

use peppol_lookup_core::{DocumentTypeId, ParticipantId, ProcessId};
use peppol_lookup_dsig::{
    SignatureAlgorithm, SignatureError, SignatureVerifier, TrustContext, TrustStoreSource,
};
use peppol_lookup_testkit::{EndpointFixture, ServiceMetadataBuilder, TestPki, TestSigner, XmlFlavor};

fn metadata(flavor: XmlFlavor) -> String {
    ServiceMetadataBuilder::new(
        flavor,
        ParticipantId::new("iso6523-actorid-upis", "9915:test"),
        DocumentTypeId::new(
            "busdox-docid-qns",
            "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2::Invoice##urn:cen.eu:en16931:2017::2.1",
        ),
    )
    .process(
        ProcessId::new("cenbii-procid-ubl", "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0"),
        vec![EndpointFixture::new(
            "peppol-transport-as4-v2_0",
            "https://ap.example.org/as4",
            b"endpoint-cert",
        )],
    )
    .build()
}

#[test]
fn test_valid_signature_both_flavors() {
    let pki = TestPki::new();
    let signer = pki.issue_signer("SMP One");
    let verifier = SignatureVerifier::new(pki.trust_context());

    for flavor in [XmlFlavor::Peppol, XmlFlavor::Bdxr] {
        let signed = signer.sign(&metadata(flavor));
        let verified = verifier.verify(signed.as_bytes()).unwrap();

        assert_eq!(verified.signature_method, SignatureAlgorithm::EcdsaSha256);
        assert_eq!(verified.signer_certificate, signer.certificate_der());
        assert_eq!(verified.signer_subject, "CN=SMP One,O=Peppol Test,C=BE");
        assert!(verified.covers_whole_document());
    }
}

#[test]
fn test_tampered_content_is_invalid() {
    let pki = TestPki::new();
    let signed = pki.issue_signer("SMP One").sign(&metadata(XmlFlavor::Peppol));
    let tampered = signed.replace("https://ap.example.org/as4", "https://evil.example.org/as4");

    assert_eq!(
        SignatureVerifier::new(pki.trust_context()).verify(tampered.as_bytes()),
        Err(SignatureError::InvalidSignature)
    );
}

#[test]
fn test_tampered_signed_info_is_invalid() {
    let pki = TestPki::new();
    let signed = pki.issue_signer("SMP One").sign(&metadata(XmlFlavor::Peppol));
    // Drop the enveloped transform: the digest then covers the signature too.
    let tampered = signed.replace(
        r#"<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"#,
        "",
    );

    assert_eq!(
        SignatureVerifier::new(pki.trust_context()).verify(tampered.as_bytes()),
        Err(SignatureError::InvalidSignature)
    );
}

#[test]
fn test_unsigned_document() {
    let pki = TestPki::new();
    assert_eq!(
        SignatureVerifier::new(pki.trust_context()).verify(metadata(XmlFlavor::Peppol).as_bytes()),
        Err(SignatureError::MissingSignature)
    );
}

#[test]
fn test_key_type_mismatch_has_no_trusted_key() {
    let pki = TestPki::new();
    let signed = pki.issue_signer("SMP One").sign(&metadata(XmlFlavor::Peppol)).replace(
        "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
        "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
    );

    assert_eq!(
        SignatureVerifier::new(pki.trust_context()).verify(signed.as_bytes()),
        Err(SignatureError::NoTrustedKey)
    );
}

#[test]
fn test_expired_signer_has_no_trusted_key() {
    let pki = TestPki::new();
    let signed = pki.issue_expired_signer("Old SMP").sign(&metadata(XmlFlavor::Peppol));
    let verifier = SignatureVerifier::new(pki.trust_context());

    assert_eq!(verifier.verify(signed.as_bytes()), Err(SignatureError::NoTrustedKey));

    // Inside the validity window the same document verifies (2000-06-01).
    assert!(verifier.at_time(959_817_600).verify(signed.as_bytes()).is_ok());
}

#[test]
fn test_other_ca_has_no_trusted_key() {
    let trusted = TestPki::new();
    let other = TestPki::new();
    let signed = other.issue_signer("SMP One").sign(&metadata(XmlFlavor::Peppol));

    assert_eq!(
        SignatureVerifier::new(trusted.trust_context()).verify(signed.as_bytes()),
        Err(SignatureError::NoTrustedKey)
    );

    let self_signed = TestSigner::self_signed("Rogue").sign(&metadata(XmlFlavor::Peppol));
    assert_eq!(
        SignatureVerifier::new(trusted.trust_context()).verify(self_signed.as_bytes()),
        Err(SignatureError::NoTrustedKey)
    );
}

#[test]
fn test_trust_store_from_pem_file() {
    let pki = TestPki::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(pki.ca_pem().as_bytes()).unwrap();

    let context = Arc::new(TrustContext::new(TrustStoreSource::Pem(file.path().to_path_buf())));
    let signed = pki.issue_signer("SMP One").sign(&metadata(XmlFlavor::Bdxr));

    assert!(!context.is_loaded());
    SignatureVerifier::new(Arc::clone(&context))
        .verify(signed.as_bytes())
        .unwrap();
    assert!(context.is_loaded());
}

#[test]
fn test_verifier_shared_across_threads() {
    let pki = TestPki::new();
    let signed = Arc::new(pki.issue_signer("SMP One").sign(&metadata(XmlFlavor::Peppol)));
    let verifier = Arc::new(SignatureVerifier::new(pki.trust_context()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let signed = Arc::clone(&signed);
            std::thread::spawn(move || verifier.verify(signed.as_bytes()).is_ok())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
