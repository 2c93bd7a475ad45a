//! SMP document builders.
//!
//! Produce unsigned Peppol SMP 1.0 (busdox) and OASIS BDXR SMP 1.0 XML.
//! Sign the output with [`crate::fixtures::TestSigner::sign`].

use peppol_lookup_core::{DocumentTypeId, Identifier, ParticipantId, ProcessId};

/// Peppol SMP 1.0 publishing namespace.
pub const PEPPOL_SMP_NS: &str = "http://busdox.org/serviceMetadata/publishing/1.0/";
/// Peppol SMP 1.0 identifiers namespace.
pub const PEPPOL_IDS_NS: &str = "http://busdox.org/transport/identifiers/1.0/";
/// WS-Addressing namespace.
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
/// OASIS BDXR SMP 1.0 namespace.
pub const BDXR_SMP_NS: &str = "http://docs.oasis-open.org/bdxr/ns/SMP/2016/05";

/// Which SMP schema to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlFlavor {
    Peppol,
    Bdxr,
}

impl XmlFlavor {
    fn open(&self, root: &str) -> String {
        match self {
            XmlFlavor::Peppol => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><smp:{} xmlns:smp="{}" xmlns:id="{}" xmlns:wsa="{}">"#,
                root, PEPPOL_SMP_NS, PEPPOL_IDS_NS, WSA_NS
            ),
            XmlFlavor::Bdxr => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><smp:{} xmlns:smp="{}">"#,
                root, BDXR_SMP_NS
            ),
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            XmlFlavor::Peppol => "id",
            XmlFlavor::Bdxr => "smp",
        }
    }

    fn identifier(&self, element: &str, id: &dyn Identifier) -> String {
        let prefix = self.id_prefix();
        match id.scheme().filter(|s| !s.is_empty()) {
            Some(scheme) => format!(
                r#"<{p}:{e} scheme="{s}">{v}</{p}:{e}>"#,
                p = prefix,
                e = element,
                s = escape(scheme),
                v = escape(id.value())
            ),
            None => format!("<{p}:{e}>{v}</{p}:{e}>", p = prefix, e = element, v = escape(id.value())),
        }
    }
}

/// An endpoint to emit.
#[derive(Debug, Clone)]
pub struct EndpointFixture {
    pub transport_profile: String,
    pub address: String,
    /// DER certificate, emitted base64-encoded.
    pub certificate: Vec<u8>,
    pub service_description: Option<String>,
    pub technical_contact_url: Option<String>,
}

impl EndpointFixture {
    /// An endpoint with the given profile and address.
    pub fn new(transport_profile: &str, address: &str, certificate: &[u8]) -> Self {
        Self {
            transport_profile: transport_profile.to_string(),
            address: address.to_string(),
            certificate: certificate.to_vec(),
            service_description: Some("Test access point".to_string()),
            technical_contact_url: Some("mailto:ops@example.org".to_string()),
        }
    }

    fn render(&self, flavor: XmlFlavor) -> String {
        use base64::Engine;

        let address = match flavor {
            XmlFlavor::Peppol => format!(
                "<wsa:EndpointReference><wsa:Address>{}</wsa:Address></wsa:EndpointReference>",
                escape(&self.address)
            ),
            XmlFlavor::Bdxr => format!("<smp:EndpointURI>{}</smp:EndpointURI>", escape(&self.address)),
        };

        let mut out = format!(
            r#"<smp:Endpoint transportProfile="{}">{}"#,
            escape(&self.transport_profile),
            address
        );
        out.push_str("<smp:RequireBusinessLevelSignature>false</smp:RequireBusinessLevelSignature>");
        out.push_str("<smp:ServiceActivationDate>2020-01-01T00:00:00Z</smp:ServiceActivationDate>");
        out.push_str(&format!(
            "<smp:Certificate>{}</smp:Certificate>",
            base64::engine::general_purpose::STANDARD.encode(&self.certificate)
        ));
        if let Some(description) = &self.service_description {
            out.push_str(&format!(
                "<smp:ServiceDescription>{}</smp:ServiceDescription>",
                escape(description)
            ));
        }
        if let Some(contact) = &self.technical_contact_url {
            out.push_str(&format!(
                "<smp:TechnicalContactUrl>{}</smp:TechnicalContactUrl>",
                escape(contact)
            ));
        }
        out.push_str("</smp:Endpoint>");
        out
    }
}

/// A `ServiceGroup` document listing one reference per document type.
///
/// Hrefs are `{base_url}/{participant}/services/{document type}`, both
/// percent-encoded.
pub fn service_group_xml(
    flavor: XmlFlavor,
    base_url: &str,
    participant: &ParticipantId,
    document_types: &[DocumentTypeId],
) -> String {
    let mut out = flavor.open("ServiceGroup");
    out.push_str(&flavor.identifier("ParticipantIdentifier", participant));
    out.push_str("<smp:ServiceMetadataReferenceCollection>");
    for document_type in document_types {
        let href = format!(
            "{}/{}/services/{}",
            base_url.trim_end_matches('/'),
            participant.uri_encoded(),
            document_type.uri_encoded()
        );
        out.push_str(&format!(
            r#"<smp:ServiceMetadataReference href="{}"/>"#,
            escape(&href)
        ));
    }
    out.push_str("</smp:ServiceMetadataReferenceCollection></smp:ServiceGroup>");
    out
}

/// Builder for a `SignedServiceMetadata` document with service information.
#[derive(Debug, Clone)]
pub struct ServiceMetadataBuilder {
    flavor: XmlFlavor,
    participant: ParticipantId,
    document_type: DocumentTypeId,
    processes: Vec<(ProcessId, Vec<EndpointFixture>)>,
}

impl ServiceMetadataBuilder {
    /// Start a document for `participant` and `document_type`.
    pub fn new(flavor: XmlFlavor, participant: ParticipantId, document_type: DocumentTypeId) -> Self {
        Self {
            flavor,
            participant,
            document_type,
            processes: Vec::new(),
        }
    }

    /// Add a process with its endpoints.
    pub fn process(mut self, process: ProcessId, endpoints: Vec<EndpointFixture>) -> Self {
        self.processes.push((process, endpoints));
        self
    }

    /// Render the unsigned document.
    pub fn build(&self) -> String {
        let flavor = self.flavor;
        let mut out = flavor.open("SignedServiceMetadata");
        out.push_str("<smp:ServiceMetadata><smp:ServiceInformation>");
        out.push_str(&flavor.identifier("ParticipantIdentifier", &self.participant));
        out.push_str(&flavor.identifier("DocumentIdentifier", &self.document_type));
        out.push_str("<smp:ProcessList>");
        for (process, endpoints) in &self.processes {
            out.push_str("<smp:Process>");
            out.push_str(&flavor.identifier("ProcessIdentifier", process));
            out.push_str("<smp:ServiceEndpointList>");
            for endpoint in endpoints {
                out.push_str(&endpoint.render(flavor));
            }
            out.push_str("</smp:ServiceEndpointList></smp:Process>");
        }
        out.push_str("</smp:ProcessList></smp:ServiceInformation></smp:ServiceMetadata></smp:SignedServiceMetadata>");
        out
    }
}

/// A `SignedServiceMetadata` document holding a redirect.
pub fn redirect_xml(flavor: XmlFlavor, href: &str, certificate_uid: &str) -> String {
    let mut out = flavor.open("SignedServiceMetadata");
    out.push_str(&format!(
        r#"<smp:ServiceMetadata><smp:Redirect href="{}"><smp:CertificateUID>{}</smp:CertificateUID></smp:Redirect></smp:ServiceMetadata>"#,
        escape(href),
        escape(certificate_uid)
    ));
    out.push_str("</smp:SignedServiceMetadata>");
    out
}

/// Escape text for use in element content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ParticipantId, DocumentTypeId, ProcessId) {
        (
            ParticipantId::new("iso6523-actorid-upis", "0088:123"),
            DocumentTypeId::new("busdox-docid-qns", "urn:invoice::2.1"),
            ProcessId::new("cenbii-procid-ubl", "urn:billing:3.0"),
        )
    }

    #[test]
    fn test_documents_are_well_formed() {
        let (p, d, proc_id) = ids();
        for flavor in [XmlFlavor::Peppol, XmlFlavor::Bdxr] {
            let group = service_group_xml(flavor, "http://smp.example.org/", &p, &[d.clone()]);
            roxmltree::Document::parse(&group).unwrap();
            assert!(group.contains("http://smp.example.org/iso6523-actorid-upis%3A%3A0088%3A123/services/"));

            let metadata = ServiceMetadataBuilder::new(flavor, p.clone(), d.clone())
                .process(
                    proc_id.clone(),
                    vec![EndpointFixture::new("peppol-transport-as4-v2_0", "https://ap.example.org/as4?a=1&b=2", b"cert")],
                )
                .build();
            roxmltree::Document::parse(&metadata).unwrap();

            let redirect = redirect_xml(flavor, "http://other.example.org/x", "CN=Other SMP,O=Peppol Test,C=BE");
            roxmltree::Document::parse(&redirect).unwrap();
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
    }
}
