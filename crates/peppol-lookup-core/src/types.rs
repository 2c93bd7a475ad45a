//! Identifier newtypes.
//!
//! Syntax rules per identifier scheme are not enforced here; callers hand in
//! identifiers that were already validated. These types only carry the
//! scheme/value pair and render it the way SMP URLs and DNS names need.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between scheme and value in the URI form of an identifier.
pub const URI_SEPARATOR: &str = "::";

/// Everything except RFC 3986 unreserved characters is percent-encoded.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Read-only view shared by all identifier kinds.
pub trait Identifier {
    /// The identifier scheme, if any.
    fn scheme(&self) -> Option<&str>;

    /// The identifier value.
    fn value(&self) -> &str;

    /// Whether a non-empty scheme is present.
    fn has_scheme(&self) -> bool {
        self.scheme().is_some_and(|s| !s.is_empty())
    }

    /// `scheme::value`, or the bare value when there is no scheme.
    fn uri_form(&self) -> String {
        match self.scheme() {
            Some(scheme) if !scheme.is_empty() => {
                format!("{}{}{}", scheme, URI_SEPARATOR, self.value())
            }
            _ => self.value().to_string(),
        }
    }

    /// Percent-encoded URI form, suitable as a single URL path segment.
    fn uri_encoded(&self) -> String {
        utf8_percent_encode(&self.uri_form(), URI_COMPONENT).to_string()
    }
}

/// Percent-encode an arbitrary string as a single URL path segment.
pub fn encode_path_segment(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

fn split_uri_form(uri: &str) -> (Option<String>, String) {
    match uri.split_once(URI_SEPARATOR) {
        Some((scheme, value)) => (Some(scheme.to_string()), value.to_string()),
        None => (None, uri.to_string()),
    }
}

macro_rules! identifier_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            scheme: Option<String>,
            value: String,
        }

        impl $name {
            /// Create an identifier with a scheme.
            pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
                Self {
                    scheme: Some(scheme.into()),
                    value: value.into(),
                }
            }

            /// Create an identifier without a scheme.
            pub fn without_scheme(value: impl Into<String>) -> Self {
                Self {
                    scheme: None,
                    value: value.into(),
                }
            }

            /// Parse from the URI form `scheme::value` (split at the first `::`).
            pub fn from_uri_form(uri: &str) -> Self {
                let (scheme, value) = split_uri_form(uri);
                Self { scheme, value }
            }
        }

        impl Identifier for $name {
            fn scheme(&self) -> Option<&str> {
                self.scheme.as_deref()
            }

            fn value(&self) -> &str {
                &self.value
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.uri_form())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.uri_form())
            }
        }
    };
}

identifier_type!(
    /// Identifies a network participant (e.g. `iso6523-actorid-upis::0088:123`).
    ParticipantId,
    "ParticipantId"
);

identifier_type!(
    /// Identifies a business document type.
    DocumentTypeId,
    "DocumentTypeId"
);

identifier_type!(
    /// Identifies a business process.
    ProcessId,
    "ProcessId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_form_with_and_without_scheme() {
        let with = ParticipantId::new("iso6523-actorid-upis", "9915:test");
        assert_eq!(with.uri_form(), "iso6523-actorid-upis::9915:test");
        assert!(with.has_scheme());

        let without = ParticipantId::without_scheme("urn:oasis:names:tc:ebcore:partyid-type:iso6523:0060:1");
        assert_eq!(without.uri_form(), without.value());
        assert!(!without.has_scheme());
    }

    #[test]
    fn test_empty_scheme_is_no_scheme() {
        let id = ProcessId::new("", "urn:proc");
        assert!(!id.has_scheme());
        assert_eq!(id.uri_form(), "urn:proc");
    }

    #[test]
    fn test_uri_encoded() {
        let id = ParticipantId::new("iso6523-actorid-upis", "9915:test");
        assert_eq!(id.uri_encoded(), "iso6523-actorid-upis%3A%3A9915%3Atest");

        let doc = DocumentTypeId::new(
            "busdox-docid-qns",
            "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2::Invoice##urn:cen.eu:en16931:2017::2.1",
        );
        let encoded = doc.uri_encoded();
        assert!(encoded.starts_with("busdox-docid-qns%3A%3Aurn%3Aoasis"));
        assert!(encoded.contains("%23%23"));
        assert!(!encoded.contains('#'));
        assert!(!encoded.contains(':'));
    }

    #[test]
    fn test_from_uri_form_splits_at_first_separator() {
        let doc = DocumentTypeId::from_uri_form("busdox-docid-qns::urn:x::Invoice##y::2.1");
        assert_eq!(doc.scheme(), Some("busdox-docid-qns"));
        assert_eq!(doc.value(), "urn:x::Invoice##y::2.1");

        let bare = ParticipantId::from_uri_form("0088:123");
        assert_eq!(bare.scheme(), None);
        assert_eq!(bare.value(), "0088:123");
    }

    #[test]
    fn test_display_and_debug() {
        let id = ProcessId::new("cenbii-procid-ubl", "urn:fdc:peppol.eu:2017:poacc:billing:01:1.0");
        assert_eq!(
            format!("{}", id),
            "cenbii-procid-ubl::urn:fdc:peppol.eu:2017:poacc:billing:01:1.0"
        );
        assert!(format!("{:?}", id).starts_with("ProcessId("));
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = ParticipantId::new("iso6523-actorid-upis", "0088:5798000000001");
        let json = serde_json::to_string(&id).unwrap();
        let back: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
