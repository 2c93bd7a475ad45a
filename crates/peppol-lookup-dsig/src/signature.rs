//! Parsed view of a `ds:Signature` element.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use roxmltree::Node;

use crate::algorithms::{DigestAlgorithm, SignatureAlgorithm};
use crate::canonical::Canonicalization;
use crate::error::{Result, SignatureError};
use crate::ns::{self, alg, attr, node};

/// A `Reference/Transforms/Transform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Remove the enclosing signature from the referenced content.
    EnvelopedSignature,
    /// Canonicalize the referenced content.
    Canonicalize(Canonicalization),
}

/// A `SignedInfo/Reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceElement {
    /// The `URI` attribute: `""` or `#id`.
    pub uri: String,
    pub transforms: Vec<Transform>,
    pub digest_algorithm: DigestAlgorithm,
    pub digest_value: Vec<u8>,
}

impl ReferenceElement {
    /// Whether the enveloped-signature transform is present.
    pub fn is_enveloped(&self) -> bool {
        self.transforms.contains(&Transform::EnvelopedSignature)
    }

    /// The canonicalization applied to the referenced content.
    ///
    /// The last C14N transform wins; without one, inclusive C14N 1.0 applies.
    pub fn canonicalization(&self) -> Canonicalization {
        self.transforms
            .iter()
            .rev()
            .find_map(|t| match t {
                Transform::Canonicalize(c) => Some(c.clone()),
                Transform::EnvelopedSignature => None,
            })
            .unwrap_or_default()
    }
}

/// A `ds:Signature` element with its parts decoded.
#[derive(Debug)]
pub struct SignatureElement<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub signed_info: Node<'a, 'input>,
    pub canonicalization: Canonicalization,
    pub method: SignatureAlgorithm,
    pub signature_value: Vec<u8>,
    pub references: Vec<ReferenceElement>,
    /// DER certificates from `KeyInfo/X509Data`, in document order.
    pub certificates: Vec<Vec<u8>>,
    /// `X509SubjectName` values from `KeyInfo/X509Data`.
    pub subject_names: Vec<String>,
}

impl<'a, 'input> SignatureElement<'a, 'input> {
    /// The first `ds:Signature` at or below `root`, if any.
    pub fn find(root: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
        root.descendants()
            .find(|n| n.has_tag_name((ns::DSIG, node::SIGNATURE)))
    }

    /// Decode a `ds:Signature` element.
    pub fn parse(signature: Node<'a, 'input>) -> Result<Self> {
        let signed_info = required_child(signature, node::SIGNED_INFO)?;

        let canonicalization =
            Canonicalization::from_element(required_child(signed_info, node::CANONICALIZATION_METHOD)?)?;
        let method = SignatureAlgorithm::from_uri(algorithm_of(required_child(
            signed_info,
            node::SIGNATURE_METHOD,
        )?)?)?;

        let references = dsig_children(signed_info, node::REFERENCE)
            .map(parse_reference)
            .collect::<Result<Vec<_>>>()?;
        if references.is_empty() {
            return Err(SignatureError::Malformed("SignedInfo has no Reference".into()));
        }

        let signature_value = decode_base64(required_child(signature, node::SIGNATURE_VALUE)?)?;

        let (certificates, subject_names) = match dsig_child(signature, node::KEY_INFO) {
            Some(key_info) => parse_key_info(key_info)?,
            None => (Vec::new(), Vec::new()),
        };

        Ok(Self {
            node: signature,
            signed_info,
            canonicalization,
            method,
            signature_value,
            references,
            certificates,
            subject_names,
        })
    }
}

/// `X509SubjectName` text exactly as written.
fn subject_names_in(key_info: Node<'_, '_>) -> Vec<String> {
    dsig_children(key_info, node::X509_DATA)
        .flat_map(|data| dsig_children(data, node::X509_SUBJECT_NAME))
        .map(text_of)
        .collect()
}

fn parse_reference(reference: Node<'_, '_>) -> Result<ReferenceElement> {
    let uri = reference
        .attribute(attr::URI)
        .ok_or_else(|| SignatureError::Malformed("Reference without URI".into()))?
        .to_string();

    let mut transforms = Vec::new();
    if let Some(list) = dsig_child(reference, node::TRANSFORMS) {
        for transform in dsig_children(list, node::TRANSFORM) {
            let uri = algorithm_of(transform)?;
            if uri == alg::ENVELOPED_SIGNATURE {
                transforms.push(Transform::EnvelopedSignature);
            } else if Canonicalization::is_c14n_uri(uri) {
                transforms.push(Transform::Canonicalize(Canonicalization::from_element(transform)?));
            } else {
                return Err(SignatureError::UnsupportedAlgorithm(uri.to_string()));
            }
        }
    }

    let digest_algorithm =
        DigestAlgorithm::from_uri(algorithm_of(required_child(reference, node::DIGEST_METHOD)?)?)?;
    let digest_value = decode_base64(required_child(reference, node::DIGEST_VALUE)?)?;

    Ok(ReferenceElement {
        uri,
        transforms,
        digest_algorithm,
        digest_value,
    })
}

fn parse_key_info(key_info: Node<'_, '_>) -> Result<(Vec<Vec<u8>>, Vec<String>)> {
    let mut certificates = Vec::new();
    for data in dsig_children(key_info, node::X509_DATA) {
        for cert in dsig_children(data, node::X509_CERTIFICATE) {
            certificates.push(decode_base64(cert)?);
        }
    }
    Ok((certificates, subject_names_in(key_info)))
}

fn dsig_child<'a, 'input>(parent: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    dsig_children(parent, name).next()
}

fn dsig_children<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    parent
        .children()
        .filter(move |c| c.has_tag_name((ns::DSIG, name)))
}

fn required_child<'a, 'input>(parent: Node<'a, 'input>, name: &'static str) -> Result<Node<'a, 'input>> {
    dsig_child(parent, name).ok_or_else(|| {
        SignatureError::Malformed(format!("{} without {}", parent.tag_name().name(), name))
    })
}

fn algorithm_of<'a>(element: Node<'a, '_>) -> Result<&'a str> {
    element.attribute(attr::ALGORITHM).ok_or_else(|| {
        SignatureError::Malformed(format!("{} without Algorithm", element.tag_name().name()))
    })
}

fn text_of(element: Node<'_, '_>) -> String {
    element
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn decode_base64(element: Node<'_, '_>) -> Result<Vec<u8>> {
    let text: String = text_of(element).chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(text.as_bytes()).map_err(|e| {
        SignatureError::Malformed(format!("bad base64 in {}: {}", element.tag_name().name(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::C14nKind;

    const SIGNED: &str = r#"<Doc xmlns="urn:doc"><Data>1</Data><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
<ds:SignedInfo>
<ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>
<ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>
<ds:Reference URI="">
<ds:Transforms>
<ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>
<ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>
</ds:Transforms>
<ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
<ds:DigestValue>AAEC
AwQ=</ds:DigestValue>
</ds:Reference>
</ds:SignedInfo>
<ds:SignatureValue>BQYH</ds:SignatureValue>
<ds:KeyInfo><ds:X509Data>
<ds:X509SubjectName>CN=SMP,O=Example</ds:X509SubjectName>
<ds:X509Certificate>CAkK</ds:X509Certificate>
</ds:X509Data></ds:KeyInfo>
</ds:Signature></Doc>"#;

    #[test]
    fn test_parse_signature() {
        let doc = roxmltree::Document::parse(SIGNED).unwrap();
        let node = SignatureElement::find(doc.root()).unwrap();
        let sig = SignatureElement::parse(node).unwrap();

        assert_eq!(sig.canonicalization.kind, C14nKind::Exclusive);
        assert_eq!(sig.method, SignatureAlgorithm::RsaSha256);
        assert_eq!(sig.signature_value, vec![5, 6, 7]);
        assert_eq!(sig.certificates, vec![vec![8, 9, 10]]);
        assert_eq!(sig.subject_names, vec!["CN=SMP,O=Example".to_string()]);

        let reference = &sig.references[0];
        assert_eq!(reference.uri, "");
        assert!(reference.is_enveloped());
        assert_eq!(reference.canonicalization().kind, C14nKind::Exclusive);
        assert_eq!(reference.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(reference.digest_value, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_default_reference_canonicalization() {
        let reference = ReferenceElement {
            uri: "#a".into(),
            transforms: vec![Transform::EnvelopedSignature],
            digest_algorithm: DigestAlgorithm::Sha1,
            digest_value: Vec::new(),
        };
        assert_eq!(reference.canonicalization(), Canonicalization::inclusive());
    }

    #[test]
    fn test_unsupported_transform_rejected() {
        let xml = SIGNED.replace(
            "http://www.w3.org/2000/09/xmldsig#enveloped-signature",
            "http://www.w3.org/TR/1999/REC-xpath-19991116",
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let node = SignatureElement::find(doc.root()).unwrap();
        assert!(matches!(
            SignatureElement::parse(node),
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_missing_parts_are_malformed() {
        let xml = SIGNED.replace("<ds:SignatureValue>BQYH</ds:SignatureValue>", "");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let node = SignatureElement::find(doc.root()).unwrap();
        assert!(matches!(SignatureElement::parse(node), Err(SignatureError::Malformed(_))));

        let xml = SIGNED.replace("<ds:X509Certificate>CAkK</ds:X509Certificate>", "<ds:X509Certificate>!!</ds:X509Certificate>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let node = SignatureElement::find(doc.root()).unwrap();
        assert!(matches!(SignatureElement::parse(node), Err(SignatureError::Malformed(_))));
    }

    #[test]
    fn test_subject_names_kept_verbatim() {
        let xml = SIGNED.replace(
            "<ds:X509SubjectName>CN=SMP,O=Example</ds:X509SubjectName>",
            "<ds:X509SubjectName> CN=SMP,O=Example </ds:X509SubjectName>",
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let sig = SignatureElement::parse(SignatureElement::find(doc.root()).unwrap()).unwrap();
        assert_eq!(sig.subject_names, vec![" CN=SMP,O=Example ".to_string()]);
    }
}
