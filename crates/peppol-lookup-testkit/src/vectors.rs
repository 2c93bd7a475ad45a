//! Golden naming vectors.
//!
//! These vectors pin the DNS names produced for known participants so that
//! changes to hashing or name composition are caught immediately.

use peppol_lookup_core::{HashingVariant, NameEncoder, ParticipantId, SmlZone};

/// A golden naming vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Participant scheme, if any.
    pub scheme: Option<&'static str>,
    /// Participant value.
    pub value: &'static str,
    /// Hashing variant.
    pub variant: HashingVariant,
    /// DNS zone, with trailing dot.
    pub zone: &'static str,
    /// Expected fully-qualified name (compared case-insensitively).
    pub expected_name: &'static str,
}

impl GoldenVector {
    /// The participant this vector describes.
    pub fn participant(&self) -> ParticipantId {
        match self.scheme {
            Some(scheme) => ParticipantId::new(scheme, self.value),
            None => ParticipantId::without_scheme(self.value),
        }
    }

    /// The zone this vector resolves in.
    pub fn sml_zone(&self) -> SmlZone {
        SmlZone::new("golden", self.zone, "https://sml.invalid", false)
    }
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "legacy MD5 name in the test SML",
            scheme: Some("iso6523-actorid-upis"),
            value: "9915:test",
            variant: HashingVariant::Legacy,
            zone: "acc.edelivery.tech.ec.europa.eu.",
            expected_name:
                "b-85008b8279e07ab0392da75fa55856a2.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu",
        },
        GoldenVector {
            name: "legacy MD5 name ignores value case",
            scheme: Some("iso6523-actorid-upis"),
            value: "9915:TEST",
            variant: HashingVariant::Legacy,
            zone: "acc.edelivery.tech.ec.europa.eu.",
            expected_name:
                "b-85008b8279e07ab0392da75fa55856a2.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu",
        },
        GoldenVector {
            name: "modern SHA-256 name in the production SML",
            scheme: None,
            value: "urn:oasis:names:tc:ebcore:partyid-type:iso6523:0060:1234567890128",
            variant: HashingVariant::Modern,
            zone: "edelivery.tech.ec.europa.eu.",
            expected_name:
                "4444wypixhstjggabkb7qmg63kjnr7ifmxralgpordxi6zf64hua.edelivery.tech.ec.europa.eu",
        },
        GoldenVector {
            name: "legacy wildcard",
            scheme: Some("iso6523-actorid-upis"),
            value: "*",
            variant: HashingVariant::Legacy,
            zone: "acc.edelivery.tech.ec.europa.eu.",
            expected_name: "*.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu",
        },
    ]
}

/// Compute the name for a vector.
pub fn name_from_vector(vector: &GoldenVector) -> String {
    NameEncoder::new(vector.variant)
        .resolved_name(&vector.participant(), &vector.sml_zone())
        .map(|n| n.into_string())
        .unwrap_or_default()
}

/// Check every vector.
///
/// Returns `(name, matches, computed)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let computed = name_from_vector(v);
            let matches = computed.eq_ignore_ascii_case(v.expected_name);
            (v.name.to_string(), matches, computed)
        })
        .collect()
}
