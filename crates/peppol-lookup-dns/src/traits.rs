//! NaptrLookup trait: the abstract interface for DNS access.
//!
//! The resolver only needs "give me the NAPTR records of this name". Backends
//! include hickory (production) and a static table (tests).

use std::net::IpAddr;

use crate::error::Result;

/// Service tag of Peppol SMP NAPTR records.
pub const SMP_SERVICE: &str = "Meta:SMP";

/// Default TTL for records built in code.
pub const DEFAULT_RECORD_TTL: u32 = 3600;

/// A NAPTR record, independent of the DNS library that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaptrRecord {
    /// Lower values are processed first.
    pub order: u16,
    /// Tie-break among records with equal order.
    pub preference: u16,
    /// Flags, `U` for a terminal URI rewrite.
    pub flags: String,
    /// Service tag, e.g. `Meta:SMP`.
    pub service: String,
    /// Substitution expression `<d>pattern<d>replacement<d>[flags]`.
    pub regexp: String,
    /// Replacement domain for non-terminal records.
    pub replacement: String,
    /// Time to live in seconds.
    pub ttl: u32,
}

impl NaptrRecord {
    /// A terminal `U` record for the Peppol SMP service.
    pub fn smp(regexp: impl Into<String>) -> Self {
        Self {
            order: 100,
            preference: 10,
            flags: "U".to_string(),
            service: SMP_SERVICE.to_string(),
            regexp: regexp.into(),
            replacement: ".".to_string(),
            ttl: DEFAULT_RECORD_TTL,
        }
    }

    /// Set order and preference.
    pub fn with_priority(mut self, order: u16, preference: u16) -> Self {
        self.order = order;
        self.preference = preference;
        self
    }

    /// Set the service tag.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether this is a terminal URI record (`U` flag, any case).
    pub fn is_terminal_uri(&self) -> bool {
        self.flags.eq_ignore_ascii_case("u")
    }
}

/// The NaptrLookup trait: blocking NAPTR queries.
///
/// Implementations must be shareable across threads; the resolver calls
/// them from whichever thread performs a lookup.
pub trait NaptrLookup: Send + Sync {
    /// Fetch all NAPTR records of `name`.
    ///
    /// `primary_dns` asks for a specific server instead of the system
    /// configuration. An empty answer is `Ok(vec![])`, not an error; the
    /// resolver decides what a missing record means.
    fn lookup_naptr(&self, name: &str, primary_dns: Option<IpAddr>) -> Result<Vec<NaptrRecord>>;
}

impl<T: NaptrLookup + ?Sized> NaptrLookup for std::sync::Arc<T> {
    fn lookup_naptr(&self, name: &str, primary_dns: Option<IpAddr>) -> Result<Vec<NaptrRecord>> {
        (**self).lookup_naptr(name, primary_dns)
    }
}
