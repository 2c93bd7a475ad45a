//! SMP client.

use std::sync::Arc;

use url::Url;

use peppol_lookup_core::{DocumentTypeId, Identifier, ParticipantId, ProcessId};
use peppol_lookup_dsig::{SignatureError, SignatureVerifier};

use crate::config::SmpClientConfig;
use crate::document::{
    parse_service_group, parse_service_metadata, Endpoint, ServiceGroup, ServiceMetadata,
    SignedServiceMetadata,
};
use crate::endpoint::EndpointSelector;
use crate::error::{Result, SmpClientError};
use crate::redirect::RedirectHandler;
use crate::transport::{HttpTransport, SmpTransport};

/// Fetches and verifies documents from one SMP.
///
/// Clients are `Send + Sync`; share them through `Arc`.
pub struct SmpClient {
    base_url: String,
    transport: Arc<dyn SmpTransport>,
    verifier: SignatureVerifier,
    config: SmpClientConfig,
    selector: EndpointSelector,
    redirects: RedirectHandler,
}

impl SmpClient {
    /// Create a client for the SMP at `base_url`.
    pub fn new(
        base_url: &str,
        transport: Arc<dyn SmpTransport>,
        verifier: SignatureVerifier,
        config: SmpClientConfig,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| SmpClientError::InvalidUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;

        let client = Self {
            base_url,
            transport,
            verifier,
            selector: EndpointSelector::new(config.ambiguity_policy),
            redirects: RedirectHandler,
            config,
        };
        if !client.verification_enabled() {
            tracing::warn!(
                base_url = %client.base_url,
                "SMP signature verification is disabled; this is unsafe"
            );
        }
        Ok(client)
    }

    /// Create a client over HTTP with the configured timeouts and proxy.
    pub fn over_http(base_url: &str, verifier: SignatureVerifier, config: SmpClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.http)?);
        Self::new(base_url, transport, verifier, config)
    }

    /// The SMP base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configuration.
    pub fn config(&self) -> &SmpClientConfig {
        &self.config
    }

    /// Whether fetched metadata is signature-checked.
    pub fn verification_enabled(&self) -> bool {
        self.config.verify_signatures && self.verifier.trust().require_signature_verification()
    }

    /// `{base}/{participant}`.
    pub fn service_group_url(&self, participant: &ParticipantId) -> Result<Url> {
        self.url(&format!("{}/{}", self.base_url, participant.uri_encoded()))
    }

    /// `{base}/{participant}/services/{document type}`.
    pub fn service_metadata_url(&self, participant: &ParticipantId, document_type: &DocumentTypeId) -> Result<Url> {
        self.url(&format!(
            "{}/{}/services/{}",
            self.base_url,
            participant.uri_encoded(),
            document_type.uri_encoded()
        ))
    }

    fn url(&self, s: &str) -> Result<Url> {
        Url::parse(s).map_err(|e| SmpClientError::InvalidUrl {
            url: s.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch the participant's service group.
    pub fn get_service_group(&self, participant: &ParticipantId) -> Result<ServiceGroup> {
        let url = self.service_group_url(participant)?;
        let body = self.transport.get(&url)?;
        let group = parse_service_group(&body, self.config.validate_structure)?;
        tracing::debug!(%url, references = group.references.len(), "fetched service group");
        Ok(group)
    }

    /// Like [`Self::get_service_group`], with not-found as `None`.
    pub fn get_service_group_or_none(&self, participant: &ParticipantId) -> Result<Option<ServiceGroup>> {
        none_if_not_found(self.get_service_group(participant))
    }

    /// Fetch, verify, and parse service metadata, following one redirect.
    pub fn get_service_metadata(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
    ) -> Result<SignedServiceMetadata> {
        let url = self.service_metadata_url(participant, document_type)?;
        let document = self.fetch_metadata(&url)?;
        self.redirects.follow_if_redirect(document, self)
    }

    /// Like [`Self::get_service_metadata`], with not-found as `None`.
    pub fn get_service_metadata_or_none(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
    ) -> Result<Option<SignedServiceMetadata>> {
        none_if_not_found(self.get_service_metadata(participant, document_type))
    }

    /// The endpoint for a process and transport profile, if any.
    pub fn get_endpoint(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<Endpoint>> {
        let document = self.get_service_metadata(participant, document_type)?;
        match &document.metadata {
            ServiceMetadata::ServiceInformation(info) => Ok(self
                .selector
                .select(info, process, transport_profile)?
                .cloned()),
            ServiceMetadata::Redirect(redirect) => {
                tracing::debug!(href = %redirect.href, "unfollowed redirect has no endpoints");
                Ok(None)
            }
        }
    }

    /// The endpoint address, if an endpoint matches.
    pub fn get_endpoint_address(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .get_endpoint(participant, document_type, process, transport_profile)?
            .map(|e| e.address))
    }

    /// The endpoint certificate (DER), if an endpoint matches.
    pub fn get_endpoint_certificate(
        &self,
        participant: &ParticipantId,
        document_type: &DocumentTypeId,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .get_endpoint(participant, document_type, process, transport_profile)?
            .map(|e| e.certificate))
    }

    /// GET one service metadata document, verify it, and parse it.
    ///
    /// Exactly one request is made. Redirects are returned as-is.
    pub fn fetch_metadata(&self, url: &Url) -> Result<SignedServiceMetadata> {
        let body = self.transport.get(url)?;

        let signature = if self.verification_enabled() {
            let verified = self.verifier.verify(&body)?;
            if !verified.covers_whole_document() {
                return Err(SmpClientError::Signature(SignatureError::Malformed(
                    "signature does not cover the whole document".into(),
                )));
            }
            tracing::debug!(%url, signer = %verified.signer_subject, "service metadata verified");
            Some(verified)
        } else {
            tracing::warn!(%url, "accepting service metadata without signature verification (unsafe)");
            None
        };

        let mut document = parse_service_metadata(&body, self.config.validate_structure)?;
        document.signature = signature;
        Ok(document)
    }
}

impl std::fmt::Debug for SmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmpClient")
            .field("base_url", &self.base_url)
            .field("verification_enabled", &self.verification_enabled())
            .field("config", &self.config)
            .finish()
    }
}

fn none_if_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
