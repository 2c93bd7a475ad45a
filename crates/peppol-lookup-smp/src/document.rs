//! SMP document model and parsing.
//!
//! Two schemas are understood:
//!
//! - Peppol SMP 1.0 (`busdox`), with identifiers in their own namespace and
//!   endpoint addresses in `wsa:EndpointReference/wsa:Address`
//! - OASIS BDXR SMP 1.0, with everything in one namespace and endpoint
//!   addresses in `EndpointURI`
//!
//! With structure validation on, missing required elements are errors. With
//! it off, incomplete endpoints and processes are skipped.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use roxmltree::{Document, Node, ParsingOptions};

use peppol_lookup_core::{DocumentTypeId, Identifier, ParticipantId, ProcessId};
use peppol_lookup_dsig::VerifiedSignature;

use crate::error::{Result, SmpClientError};

/// Peppol SMP 1.0 publishing namespace.
pub const PEPPOL_SMP_NS: &str = "http://busdox.org/serviceMetadata/publishing/1.0/";

/// Peppol SMP 1.0 identifiers namespace.
pub const PEPPOL_IDS_NS: &str = "http://busdox.org/transport/identifiers/1.0/";

/// WS-Addressing namespace.
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";

/// OASIS BDXR SMP 1.0 namespace.
pub const BDXR_SMP_NS: &str = "http://docs.oasis-open.org/bdxr/ns/SMP/2016/05";

/// Path segment separating a participant from its document type in
/// service metadata URLs.
const SERVICES_SEGMENT: &str = "/services/";

/// The schema a document was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpFlavor {
    /// Peppol SMP 1.0.
    Peppol,
    /// OASIS BDXR SMP 1.0.
    Bdxr,
}

impl SmpFlavor {
    fn of(root: Node<'_, '_>) -> Result<Self> {
        match root.tag_name().namespace() {
            Some(PEPPOL_SMP_NS) => Ok(SmpFlavor::Peppol),
            Some(BDXR_SMP_NS) => Ok(SmpFlavor::Bdxr),
            _ => Err(SmpClientError::Malformed(format!(
                "unexpected root element {}",
                root.tag_name().name()
            ))),
        }
    }

    fn smp_ns(&self) -> &'static str {
        match self {
            SmpFlavor::Peppol => PEPPOL_SMP_NS,
            SmpFlavor::Bdxr => BDXR_SMP_NS,
        }
    }

    fn ids_ns(&self) -> &'static str {
        match self {
            SmpFlavor::Peppol => PEPPOL_IDS_NS,
            SmpFlavor::Bdxr => BDXR_SMP_NS,
        }
    }
}

/// A participant's service group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceGroup {
    pub flavor: SmpFlavor,
    pub participant: ParticipantId,
    /// `ServiceMetadataReference/@href` values, in document order.
    pub references: Vec<String>,
}

impl ServiceGroup {
    /// Document types recoverable from the reference hrefs.
    pub fn document_types(&self) -> Vec<DocumentTypeId> {
        self.references
            .iter()
            .filter_map(|href| document_type_from_href(href))
            .collect()
    }
}

/// Recover the document type from a service metadata href.
///
/// Takes the segment after the last `/services/`, percent-decodes it, and
/// splits it at the first `::`.
pub fn document_type_from_href(href: &str) -> Option<DocumentTypeId> {
    let (_, encoded) = href.rsplit_once(SERVICES_SEGMENT)?;
    let encoded = encoded.trim_end_matches('/');
    if encoded.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    Some(DocumentTypeId::from_uri_form(&decoded))
}

/// A transport endpoint of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub transport_profile: String,
    pub address: String,
    /// DER encoding of the endpoint certificate.
    pub certificate: Vec<u8>,
    pub require_business_level_signature: bool,
    pub minimum_authentication_level: Option<String>,
    pub service_activation_date: Option<String>,
    pub service_expiration_date: Option<String>,
    pub service_description: Option<String>,
    pub technical_contact_url: Option<String>,
    pub technical_information_url: Option<String>,
}

/// A process and the endpoints that serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub process: ProcessId,
    pub endpoints: Vec<Endpoint>,
}

/// Where and how a participant receives one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInformation {
    pub participant: ParticipantId,
    pub document_type: DocumentTypeId,
    pub processes: Vec<Process>,
}

impl ServiceInformation {
    /// Processes whose identifier equals `process` (scheme and value).
    pub fn processes_matching<'a, 'p>(
        &'a self,
        process: &'p ProcessId,
    ) -> impl Iterator<Item = &'a Process> + 'p
    where
        'a: 'p,
    {
        self.processes.iter().filter(move |p| {
            p.process.scheme() == process.scheme() && p.process.value() == process.value()
        })
    }
}

/// A pointer to another SMP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub href: String,
    /// Subject name the target SMP's signing certificate must carry.
    pub certificate_uid: String,
}

/// The content of a service metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMetadata {
    ServiceInformation(ServiceInformation),
    Redirect(Redirect),
}

/// A service metadata document, its raw bytes, and its verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedServiceMetadata {
    pub flavor: SmpFlavor,
    pub metadata: ServiceMetadata,
    pub raw: Vec<u8>,
    /// `None` only when verification was disabled.
    pub signature: Option<VerifiedSignature>,
}

impl SignedServiceMetadata {
    /// The service information, unless this is a redirect.
    pub fn service_information(&self) -> Option<&ServiceInformation> {
        match &self.metadata {
            ServiceMetadata::ServiceInformation(info) => Some(info),
            ServiceMetadata::Redirect(_) => None,
        }
    }

    /// The redirect, if this is one.
    pub fn redirect(&self) -> Option<&Redirect> {
        match &self.metadata {
            ServiceMetadata::Redirect(redirect) => Some(redirect),
            ServiceMetadata::ServiceInformation(_) => None,
        }
    }
}

/// Parse a `ServiceGroup` document.
pub fn parse_service_group(xml: &[u8], validate: bool) -> Result<ServiceGroup> {
    let text = utf8(xml)?;
    let doc = parse_xml(text)?;
    let root = doc.root_element();
    let flavor = SmpFlavor::of(root)?;
    let reader = Reader { flavor, validate };

    reader.expect_name(root, "ServiceGroup")?;
    let participant = reader.participant(root)?;

    let references = reader
        .child(root, "ServiceMetadataReferenceCollection")
        .map(|collection| {
            reader
                .children(collection, "ServiceMetadataReference")
                .filter_map(|r| r.attribute("href"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ServiceGroup {
        flavor,
        participant,
        references,
    })
}

/// Parse a `SignedServiceMetadata` (or bare `ServiceMetadata`) document.
///
/// The returned document carries `raw` but no signature; verification is
/// the caller's job.
pub fn parse_service_metadata(xml: &[u8], validate: bool) -> Result<SignedServiceMetadata> {
    let text = utf8(xml)?;
    let doc = parse_xml(text)?;
    let root = doc.root_element();
    let flavor = SmpFlavor::of(root)?;
    let reader = Reader { flavor, validate };

    let metadata_node = match root.tag_name().name() {
        "SignedServiceMetadata" => reader.required_child(root, "ServiceMetadata")?,
        "ServiceMetadata" => root,
        other => {
            return Err(SmpClientError::Malformed(format!(
                "unexpected root element {}",
                other
            )))
        }
    };

    let metadata = if let Some(info) = reader.child(metadata_node, "ServiceInformation") {
        ServiceMetadata::ServiceInformation(reader.service_information(info)?)
    } else if let Some(redirect) = reader.child(metadata_node, "Redirect") {
        ServiceMetadata::Redirect(reader.redirect(redirect)?)
    } else {
        return Err(SmpClientError::Malformed(
            "ServiceMetadata holds neither ServiceInformation nor Redirect".into(),
        ));
    };

    Ok(SignedServiceMetadata {
        flavor,
        metadata,
        raw: xml.to_vec(),
        signature: None,
    })
}

fn utf8(xml: &[u8]) -> Result<&str> {
    std::str::from_utf8(xml).map_err(|e| SmpClientError::Malformed(format!("not UTF-8: {}", e)))
}

fn parse_xml(text: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| SmpClientError::Malformed(e.to_string()))
}

struct Reader {
    flavor: SmpFlavor,
    validate: bool,
}

impl Reader {
    fn expect_name(&self, node: Node<'_, '_>, name: &str) -> Result<()> {
        if node.has_tag_name((self.flavor.smp_ns(), name)) {
            Ok(())
        } else {
            Err(SmpClientError::Malformed(format!(
                "expected {}, found {}",
                name,
                node.tag_name().name()
            )))
        }
    }

    fn child<'a, 'input>(&self, parent: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
        let ns = self.flavor.smp_ns();
        parent.children().find(|c| c.has_tag_name((ns, name)))
    }

    fn children<'a, 'input: 'a>(
        &self,
        parent: Node<'a, 'input>,
        name: &'static str,
    ) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
        let ns = self.flavor.smp_ns();
        parent.children().filter(move |c| c.has_tag_name((ns, name)))
    }

    fn required_child<'a, 'input>(&self, parent: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
        self.child(parent, name).ok_or_else(|| missing(parent, name))
    }

    fn identifier_node<'a, 'input>(&self, parent: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
        let ns = self.flavor.ids_ns();
        parent.children().find(|c| c.has_tag_name((ns, name)))
    }

    fn identifier(&self, parent: Node<'_, '_>, name: &str) -> Result<(Option<String>, String)> {
        let node = self.identifier_node(parent, name).ok_or_else(|| missing(parent, name))?;
        let value = text(node);
        if value.is_empty() {
            return Err(SmpClientError::Malformed(format!("empty {}", name)));
        }
        Ok((node.attribute("scheme").map(str::to_string), value))
    }

    fn participant(&self, parent: Node<'_, '_>) -> Result<ParticipantId> {
        Ok(match self.identifier(parent, "ParticipantIdentifier")? {
            (Some(scheme), value) => ParticipantId::new(scheme, value),
            (None, value) => ParticipantId::without_scheme(value),
        })
    }

    fn service_information(&self, info: Node<'_, '_>) -> Result<ServiceInformation> {
        let participant = self.participant(info)?;
        let document_type = match self.identifier(info, "DocumentIdentifier")? {
            (Some(scheme), value) => DocumentTypeId::new(scheme, value),
            (None, value) => DocumentTypeId::without_scheme(value),
        };

        let mut processes = Vec::new();
        if let Some(list) = self.child(info, "ProcessList") {
            for process in self.children(list, "Process") {
                match self.process(process) {
                    Ok(p) => processes.push(p),
                    Err(e) if !self.validate => {
                        tracing::warn!(error = %e, "skipping incomplete process");
                    }
                    Err(e) => return Err(e),
                }
            }
        } else if self.validate {
            return Err(missing(info, "ProcessList"));
        }

        Ok(ServiceInformation {
            participant,
            document_type,
            processes,
        })
    }

    fn process(&self, process: Node<'_, '_>) -> Result<Process> {
        let process_id = match self.identifier(process, "ProcessIdentifier")? {
            (Some(scheme), value) => ProcessId::new(scheme, value),
            (None, value) => ProcessId::without_scheme(value),
        };

        let mut endpoints = Vec::new();
        if let Some(list) = self.child(process, "ServiceEndpointList") {
            for endpoint in self.children(list, "Endpoint") {
                match self.endpoint(endpoint) {
                    Ok(e) => endpoints.push(e),
                    Err(e) if !self.validate => {
                        tracing::warn!(process = %process_id, error = %e, "skipping incomplete endpoint");
                    }
                    Err(e) => return Err(e),
                }
            }
        } else if self.validate {
            return Err(missing(process, "ServiceEndpointList"));
        }

        Ok(Process {
            process: process_id,
            endpoints,
        })
    }

    fn endpoint(&self, endpoint: Node<'_, '_>) -> Result<Endpoint> {
        let transport_profile = endpoint
            .attribute("transportProfile")
            .map(str::to_string)
            .ok_or_else(|| SmpClientError::Malformed("Endpoint without transportProfile".into()))?;

        let address = match self.flavor {
            SmpFlavor::Peppol => endpoint
                .children()
                .find(|c| c.has_tag_name((WSA_NS, "EndpointReference")))
                .and_then(|r| r.children().find(|c| c.has_tag_name((WSA_NS, "Address"))))
                .map(text),
            SmpFlavor::Bdxr => self.child(endpoint, "EndpointURI").map(text),
        }
        .filter(|a| !a.is_empty())
        .ok_or_else(|| SmpClientError::Malformed("Endpoint without address".into()))?;

        let certificate_text: String = text(self.required_child(endpoint, "Certificate")?)
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let certificate = STANDARD
            .decode(certificate_text.as_bytes())
            .map_err(|e| SmpClientError::Malformed(format!("bad endpoint certificate: {}", e)))?;
        if certificate.is_empty() {
            return Err(SmpClientError::Malformed("empty endpoint certificate".into()));
        }

        let optional = |name: &str| self.child(endpoint, name).map(text).filter(|s| !s.is_empty());

        Ok(Endpoint {
            transport_profile,
            address,
            certificate,
            require_business_level_signature: optional("RequireBusinessLevelSignature")
                .is_some_and(|v| v == "true" || v == "1"),
            minimum_authentication_level: optional("MinimumAuthenticationLevel"),
            service_activation_date: optional("ServiceActivationDate"),
            service_expiration_date: optional("ServiceExpirationDate"),
            service_description: optional("ServiceDescription"),
            technical_contact_url: optional("TechnicalContactUrl"),
            technical_information_url: optional("TechnicalInformationUrl"),
        })
    }

    fn redirect(&self, redirect: Node<'_, '_>) -> Result<Redirect> {
        let href = redirect
            .attribute("href")
            .map(str::to_string)
            .ok_or_else(|| SmpClientError::Malformed("Redirect without href".into()))?;

        let certificate_uid = match self.child(redirect, "CertificateUID").map(text) {
            Some(uid) if !uid.is_empty() => uid,
            _ if self.validate => return Err(missing(redirect, "CertificateUID")),
            _ => {
                tracing::warn!(%href, "redirect without CertificateUID");
                String::new()
            }
        };

        Ok(Redirect {
            href,
            certificate_uid,
        })
    }
}

fn missing(parent: Node<'_, '_>, name: &str) -> SmpClientError {
    SmpClientError::Malformed(format!("{} without {}", parent.tag_name().name(), name))
}

fn text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use peppol_lookup_testkit::{redirect_xml, service_group_xml, EndpointFixture, ServiceMetadataBuilder, XmlFlavor};

    fn participant() -> ParticipantId {
        ParticipantId::new("iso6523-actorid-upis", "9915:test")
    }

    fn document_type() -> DocumentTypeId {
        DocumentTypeId::new("busdox-docid-qns", "urn:invoice::2.1")
    }

    fn process() -> ProcessId {
        ProcessId::new("cenbii-procid-ubl", "urn:billing")
    }

    #[test]
    fn test_service_group_both_flavors() {
        for flavor in [XmlFlavor::Peppol, XmlFlavor::Bdxr] {
            let xml = service_group_xml(flavor, "http://smp.example.org", &participant(), &[document_type()]);
            let group = parse_service_group(xml.as_bytes(), true).unwrap();
            assert_eq!(group.participant, participant());
            assert_eq!(group.references.len(), 1);
            assert_eq!(group.document_types(), vec![document_type()]);
        }
    }

    #[test]
    fn test_document_type_from_href() {
        assert_eq!(
            document_type_from_href("http://smp/x/services/busdox-docid-qns%3A%3Aurn%3Aa%3A%3Ab"),
            Some(DocumentTypeId::new("busdox-docid-qns", "urn:a::b"))
        );
        assert_eq!(document_type_from_href("http://smp/x"), None);
        assert_eq!(document_type_from_href("http://smp/x/services/"), None);
    }

    #[test]
    fn test_service_information_both_flavors() {
        for flavor in [XmlFlavor::Peppol, XmlFlavor::Bdxr] {
            let xml = ServiceMetadataBuilder::new(flavor, participant(), document_type())
                .process(
                    process(),
                    vec![EndpointFixture::new("peppol-transport-as4-v2_0", "https://ap.example.org/as4", b"cert")],
                )
                .build();
            let doc = parse_service_metadata(xml.as_bytes(), true).unwrap();
            let info = doc.service_information().unwrap();

            assert_eq!(info.participant, participant());
            assert_eq!(info.document_type, document_type());
            assert_eq!(info.processes.len(), 1);
            let endpoint = &info.processes[0].endpoints[0];
            assert_eq!(endpoint.address, "https://ap.example.org/as4");
            assert_eq!(endpoint.certificate, b"cert");
            assert!(!endpoint.require_business_level_signature);
            assert_eq!(endpoint.service_activation_date.as_deref(), Some("2020-01-01T00:00:00Z"));
            assert_eq!(endpoint.technical_contact_url.as_deref(), Some("mailto:ops@example.org"));
            assert_eq!(doc.raw, xml.as_bytes());
            assert!(doc.signature.is_none());
        }
    }

    #[test]
    fn test_redirect() {
        let xml = redirect_xml(XmlFlavor::Peppol, "http://other.example.org/p/services/d", "CN=Other");
        let doc = parse_service_metadata(xml.as_bytes(), true).unwrap();
        let redirect = doc.redirect().unwrap();
        assert_eq!(redirect.href, "http://other.example.org/p/services/d");
        assert_eq!(redirect.certificate_uid, "CN=Other");
    }

    #[test]
    fn test_redirect_without_uid() {
        let xml = redirect_xml(XmlFlavor::Peppol, "http://other.example.org/x", "")
            .replace("<smp:CertificateUID></smp:CertificateUID>", "");
        assert!(matches!(
            parse_service_metadata(xml.as_bytes(), true),
            Err(SmpClientError::Malformed(_))
        ));
        let doc = parse_service_metadata(xml.as_bytes(), false).unwrap();
        assert_eq!(doc.redirect().unwrap().certificate_uid, "");
    }

    #[test]
    fn test_incomplete_endpoint() {
        let xml = ServiceMetadataBuilder::new(XmlFlavor::Peppol, participant(), document_type())
            .process(
                process(),
                vec![
                    EndpointFixture::new("profile-a", "", b"cert"),
                    EndpointFixture::new("profile-b", "https://ap.example.org", b"cert"),
                ],
            )
            .build();

        assert!(matches!(
            parse_service_metadata(xml.as_bytes(), true),
            Err(SmpClientError::Malformed(_))
        ));

        let doc = parse_service_metadata(xml.as_bytes(), false).unwrap();
        let endpoints = &doc.service_information().unwrap().processes[0].endpoints;
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].transport_profile, "profile-b");
    }

    #[test]
    fn test_unknown_root_rejected() {
        for validate in [true, false] {
            assert!(matches!(
                parse_service_metadata(b"<Other xmlns=\"urn:x\"/>", validate),
                Err(SmpClientError::Malformed(_))
            ));
            assert!(matches!(
                parse_service_group(b"<Other xmlns=\"urn:x\"/>", validate),
                Err(SmpClientError::Malformed(_))
            ));
        }
        let group_as_metadata = service_group_xml(XmlFlavor::Peppol, "http://smp", &participant(), &[]);
        assert!(parse_service_metadata(group_as_metadata.as_bytes(), true).is_err());
    }

    #[test]
    fn test_missing_participant_rejected() {
        let xml = ServiceMetadataBuilder::new(XmlFlavor::Bdxr, participant(), document_type())
            .build()
            .replace("smp:ParticipantIdentifier", "smp:Other");
        assert!(parse_service_metadata(xml.as_bytes(), false).is_err());
    }

    #[test]
    fn test_dtd_rejected() {
        let xml = br#"<!DOCTYPE x [<!ENTITY a "b">]><smp:ServiceGroup xmlns:smp="http://busdox.org/serviceMetadata/publishing/1.0/"/>"#;
        assert!(matches!(parse_service_group(xml, true), Err(SmpClientError::Malformed(_))));
    }
}
