//! SML zone descriptions.

use serde::{Deserialize, Serialize};

/// An SML (Service Metadata Locator) DNS zone.
///
/// The DNS zone is stored lowercase, without a leading dot, and with the
/// trailing dot the zone-name builder expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmlZone {
    id: String,
    dns_zone: String,
    management_service_url: String,
    requires_client_certificate: bool,
}

impl SmlZone {
    /// Describe an SML zone.
    ///
    /// The zone is lowercased and a leading dot is removed. A missing trailing
    /// dot is left as is so that name building reports it.
    pub fn new(
        id: impl Into<String>,
        dns_zone: impl Into<String>,
        management_service_url: impl Into<String>,
        requires_client_certificate: bool,
    ) -> Self {
        let zone = dns_zone.into().to_lowercase();
        let zone = zone.strip_prefix('.').map(str::to_string).unwrap_or(zone);
        Self {
            id: id.into(),
            dns_zone: zone,
            management_service_url: management_service_url.into(),
            requires_client_certificate,
        }
    }

    /// Peppol production SML.
    pub fn peppol_production() -> Self {
        Self::new(
            "digitprod",
            "edelivery.tech.ec.europa.eu.",
            "https://edelivery.tech.ec.europa.eu/edelivery-sml",
            true,
        )
    }

    /// Peppol test SML (SMK).
    pub fn peppol_test() -> Self {
        Self::new(
            "digittest",
            "acc.edelivery.tech.ec.europa.eu.",
            "https://acc.edelivery.tech.ec.europa.eu/edelivery-sml",
            true,
        )
    }

    /// Short identifier of this SML.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The DNS zone, including the trailing dot.
    pub fn dns_zone(&self) -> &str {
        &self.dns_zone
    }

    /// Base URL of the SML management service.
    pub fn management_service_url(&self) -> &str {
        &self.management_service_url
    }

    /// Whether the management service requires TLS client authentication.
    pub fn requires_client_certificate(&self) -> bool {
        self.requires_client_certificate
    }
}
