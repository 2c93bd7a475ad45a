//! Distinguished name formatting.
//!
//! Subjects are rendered in RFC 2253 string form: RDNs last to first,
//! separated by `,` with no spaces, multi-valued RDNs joined by `+`. This is
//! the form SMP publishers write into a redirect's `CertificateUID`.

use x509_parser::x509::{AttributeTypeAndValue, X509Name};

/// Keywords RFC 2253 defines; any other type is written as a dotted OID.
const KEYWORDS: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.6", "C"),
    ("2.5.4.9", "STREET"),
    ("0.9.2342.19200300.100.1.25", "DC"),
    ("0.9.2342.19200300.100.1.1", "UID"),
];

/// Format `name` as an RFC 2253 string.
pub fn rfc2253(name: &X509Name<'_>) -> String {
    let rdns: Vec<String> = name
        .iter()
        .map(|rdn| rdn.iter().map(attribute).collect::<Vec<_>>().join("+"))
        .collect();
    rdns.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn attribute(attr: &AttributeTypeAndValue<'_>) -> String {
    let oid = attr.attr_type().to_id_string();
    match KEYWORDS.iter().find(|(id, _)| *id == oid) {
        Some((_, keyword)) => match attr.as_str() {
            Ok(value) => format!("{}={}", keyword, escape(value)),
            Err(_) => format!("{}={}", keyword, hex_value(attr)),
        },
        None => format!("{}={}", oid, hex_value(attr)),
    }
}

/// `#` followed by the hex of the value's DER encoding.
fn hex_value(attr: &AttributeTypeAndValue<'_>) -> String {
    let value = attr.attr_value();
    let mut der = Vec::with_capacity(value.data.len() + 4);

    let class = (value.header.class() as u8) << 6;
    let constructed = if value.header.is_constructed() { 0x20 } else { 0 };
    der.push(class | constructed | (value.header.tag().0 as u8 & 0x1f));

    let len = value.data.len();
    if len < 0x80 {
        der.push(len as u8);
    } else {
        let bytes: Vec<u8> = len.to_be_bytes().into_iter().skip_while(|b| *b == 0).collect();
        der.push(0x80 | bytes.len() as u8);
        der.extend_from_slice(&bytes);
    }
    der.extend_from_slice(value.data);

    format!("#{}", hex::encode(der))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
    use x509_parser::parse_x509_certificate;

    fn subject_of(dn: DistinguishedName) -> String {
        let mut params = CertificateParams::default();
        params.distinguished_name = dn;
        let der = params.self_signed(&KeyPair::generate().unwrap()).unwrap().der().to_vec();
        let (_, cert) = parse_x509_certificate(&der).unwrap();
        rfc2253(cert.subject())
    }

    #[test]
    fn test_most_specific_rdn_first() {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CountryName, "BE");
        dn.push(DnType::OrganizationName, "Peppol Test");
        dn.push(DnType::CommonName, "SMP One");

        assert_eq!(subject_of(dn), "CN=SMP One,O=Peppol Test,C=BE");
    }

    #[test]
    fn test_special_characters_escaped() {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::OrganizationName, "Acme, Inc");
        dn.push(DnType::CommonName, "#1 <smp>");

        assert_eq!(subject_of(dn), r"CN=\#1 \<smp\>,O=Acme\, Inc");
    }

    #[test]
    fn test_unknown_type_as_hex() {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CustomDnType(vec![2, 5, 4, 97]), "VATBE-0123");
        dn.push(DnType::CommonName, "SMP One");

        assert_eq!(subject_of(dn), "CN=SMP One,2.5.4.97=#0c0a56415442452d30313233");
    }

    #[test]
    fn test_escape_edges() {
        assert_eq!(escape(" padded "), r"\ padded\ ");
        assert_eq!(escape("a+b;c"), r"a\+b\;c");
        assert_eq!(escape("plain"), "plain");
    }
}
