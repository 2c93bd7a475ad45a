//! Proptest generators for property-based testing.

use proptest::prelude::*;

use peppol_lookup_core::{DocumentTypeId, HashingVariant, ParticipantId, ProcessId};

/// Generate a participant scheme.
pub fn scheme() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("iso6523-actorid-upis".to_string()),
        "[a-z][a-z0-9-]{0,24}".prop_map(String::from),
    ]
}

/// Generate a participant value such as `0088:5798000000001`.
pub fn participant_value() -> impl Strategy<Value = String> {
    prop_oneof![
        ("[0-9]{4}", "[0-9A-Za-z]{1,20}").prop_map(|(icd, id)| format!("{}:{}", icd, id)),
        "[ -~]{1,64}".prop_map(String::from),
    ]
}

/// Generate a participant identifier, with or without scheme.
pub fn participant_id() -> impl Strategy<Value = ParticipantId> {
    (proptest::option::of(scheme()), participant_value()).prop_map(|(scheme, value)| match scheme {
        Some(scheme) => ParticipantId::new(scheme, value),
        None => ParticipantId::without_scheme(value),
    })
}

/// Generate a document type identifier.
pub fn document_type_id() -> impl Strategy<Value = DocumentTypeId> {
    "[A-Za-z0-9:._#-]{1,80}".prop_map(|v| DocumentTypeId::new("busdox-docid-qns", v))
}

/// Generate a process identifier.
pub fn process_id() -> impl Strategy<Value = ProcessId> {
    "[a-z0-9:._-]{1,60}".prop_map(|v| ProcessId::new("cenbii-procid-ubl", v))
}

/// Generate a hashing variant.
pub fn hashing_variant() -> impl Strategy<Value = HashingVariant> {
    prop_oneof![Just(HashingVariant::Legacy), Just(HashingVariant::Modern)]
}

/// Generate a DNS zone with the trailing dot.
pub fn dns_zone() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,10}", 1..4).prop_map(|labels| format!("{}.", labels.join(".")))
}

/// Parameters for a naming test case.
#[derive(Debug, Clone)]
pub struct NamingParams {
    pub participant: ParticipantId,
    pub variant: HashingVariant,
    pub zone: String,
}

impl Arbitrary for NamingParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (participant_id(), hashing_variant(), dns_zone())
            .prop_map(|(participant, variant, zone)| NamingParams {
                participant,
                variant,
                zone,
            })
            .boxed()
    }
}
