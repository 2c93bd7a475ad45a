//! Endpoint selection.

use serde::{Deserialize, Serialize};

use peppol_lookup_core::ProcessId;

use crate::document::{Endpoint, ServiceInformation};
use crate::error::SelectionError;

/// What to do when more than one endpoint matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first match in document order and log a warning.
    #[default]
    FirstInDocumentOrder,
    /// Fail with [`SelectionError::Ambiguous`].
    Reject,
}

/// Picks the endpoint for a process and transport profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointSelector {
    policy: AmbiguityPolicy,
}

impl EndpointSelector {
    /// Create a selector with the given tie-break policy.
    pub fn new(policy: AmbiguityPolicy) -> Self {
        Self { policy }
    }

    /// The tie-break policy.
    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Select among the endpoints of every process equal to `process`
    /// whose transport profile is `transport_profile`.
    ///
    /// No match yields `Ok(None)`.
    pub fn select<'a>(
        &self,
        info: &'a ServiceInformation,
        process: &ProcessId,
        transport_profile: &str,
    ) -> Result<Option<&'a Endpoint>, SelectionError> {
        let candidates: Vec<&Endpoint> = info
            .processes_matching(process)
            .flat_map(|p| p.endpoints.iter())
            .filter(|e| e.transport_profile == transport_profile)
            .collect();

        match candidates.len() {
            0 => {
                tracing::debug!(%process, transport_profile, "no matching endpoint");
                Ok(None)
            }
            1 => Ok(candidates.first().copied()),
            count => match self.policy {
                AmbiguityPolicy::FirstInDocumentOrder => {
                    tracing::warn!(
                        %process,
                        transport_profile,
                        count,
                        "several endpoints match; using the first in document order"
                    );
                    Ok(candidates.first().copied())
                }
                AmbiguityPolicy::Reject => Err(SelectionError::Ambiguous {
                    count,
                    transport_profile: transport_profile.to_string(),
                }),
            },
        }
    }
}
