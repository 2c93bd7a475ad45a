//! The lookup pipeline.
//!
//! Participant -> hashed DNS name -> SMP base URL (direct or NAPTR) ->
//! verified service metadata (one redirect at most) -> endpoint.

use std::sync::Arc;

use peppol_lookup_core::{DocumentTypeId, NameEncoder, ParticipantId, ProcessId, ResolvedName};
use peppol_lookup_dns::{HickoryNaptrLookup, NaptrLookup, NaptrResolver};
use peppol_lookup_dsig::{SignatureVerifier, TrustContext, TrustStore, TrustStoreSource};
use peppol_lookup_smp::{
    Endpoint, HttpTransport, ServiceGroup, SignedServiceMetadata, SmpClient, SmpTransport,
};

use crate::config::{DiscoveryMode, LookupConfig};
use crate::error::{LookupError, Result};

/// Resolves participants to verified SMP metadata and endpoints.
///
/// `SmpLookup` is `Send + Sync`; one instance can serve many threads. The
/// NAPTR cache is shared by all of them.
pub struct SmpLookup {
    config: LookupConfig,
    encoder: NameEncoder,
    resolver: NaptrResolver,
    transport: Arc<dyn SmpTransport>,
    verifier: SignatureVerifier,
}

impl SmpLookup {
    /// Assemble a lookup from explicit services.
    pub fn new(
        config: LookupConfig,
        naptr: Arc<dyn NaptrLookup>,
        transport: Arc<dyn SmpTransport>,
        trust: Arc<TrustContext>,
    ) -> Self {
        Self {
            encoder: NameEncoder::with_options(config.hashing, config.naming),
            resolver: NaptrResolver::new(naptr, config.naptr_config()),
            transport,
            verifier: SignatureVerifier::new(trust),
            config,
        }
    }

    /// Assemble a lookup over system DNS and HTTP.
    ///
    /// The trust store is read on first verification. Without a trust store
    /// path, signature verification must be switched off explicitly.
    pub fn from_config(config: LookupConfig) -> Result<Self> {
        let trust = match &config.trust_store_path {
            Some(path) => TrustContext::new(TrustStoreSource::Pem(path.clone())),
            None if config.smp.verify_signatures => {
                return Err(LookupError::Configuration(
                    "trust_store_path is required when signature verification is enabled".into(),
                ));
            }
            None => TrustContext::from_store(TrustStore::default()).with_signature_verification(false),
        };
        let transport = HttpTransport::new(&config.smp.http)?;
        Ok(Self::new(
            config,
            Arc::new(HickoryNaptrLookup::new()),
            Arc::new(transport),
            Arc::new(trust),
        ))
    }

    /// The configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Load the trust store now instead of on first verification.
    ///
    /// Returns the number of trust anchors. A store that cannot be read is
    /// reported as [`LookupError::TrustStore`].
    pub fn preload_trust_store(&self) -> Result<usize> {
        let store = self.verifier.trust().trust_store()?;
        tracing::debug!(anchors = store.len(), source = ?self.verifier.trust().source(), "trust store loaded");
        Ok(store.len())
    }

    /// The NAPTR resolver, for cache control.
    pub fn resolver(&self) -> &NaptrResolver {
        &self.resolver
    }

    /// The participant's DNS name in the configured SML zone.
    pub fn participant_name(&self, participant: &ParticipantId) -> Result<ResolvedName> {
        Ok(self.encoder.resolved_name(participant, &self.config.sml_zone)?)
    }

    /// The base URL of the SMP serving `participant`.
    pub fn smp_base_url(&self, participant: &ParticipantId) -> Result<String> {
        let name = self.participant_name(participant)?;
        let url = match self.config.discovery {
            DiscoveryMode::Direct => format!("http://{}", name.as_str()),
            DiscoveryMode::Naptr => {
                self.resolver
                    .resolve_url(name.as_str(), self.config.primary_dns, true)?
            }
        };
        tracing::debug!(%participant, name = name.as_str(), %url, "located SMP");
        Ok(url)
    }

    /// A client for the SMP serving `participant`.
    pub fn client_for(&self, participant: &ParticipantId) -> Result<SmpClient> {
        let base_url = self.smp_base_url(participant)?;
        Ok(SmpClient::new(
            &base_url,
            Arc::clone(&self.transport),
            self.verifier.clone(),
            self.config.smp.clone(),
        )?)
    }

    /// The participant's service group.
    pub fn service_group(&self, participant: &ParticipantId) -> Result<ServiceGroup> {
        Ok(self.client_for(participant)?.get_service_group(participant)?)
    }

    /// Verified service metadata, after at most one redirect.
    pub fn service_metadata(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
    ) -> Result<SignedServiceMetadata> {
        Ok(self
            .client_for(participant)?
            .get_service_metadata(participant, document_type)?)
    }

    /// The endpoint for a process and transport profile, if any.
    pub fn endpoint(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<Endpoint>> {
        Ok(self
            .client_for(participant)?
            .get_endpoint(participant, document_type, process, transport_profile)?)
    }

    /// The endpoint address, if an endpoint matches.
    pub fn endpoint_address(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .endpoint(participant, document_type, process, transport_profile)?
            .map(|e| e.address))
    }

    /// The endpoint certificate (DER), if an endpoint matches.
    pub fn endpoint_certificate(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .endpoint(participant, document_type, process, transport_profile)?
            .map(|e| e.certificate))
    }
}

impl std::fmt::Debug for SmpLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmpLookup")
            .field("config", &self.config)
            .field("cached_names", &self.resolver.cache().len())
            .finish()
    }
}
