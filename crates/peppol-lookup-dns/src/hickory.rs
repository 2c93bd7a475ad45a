//! NAPTR lookups over the wire with hickory-resolver.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::{Name, Resolver};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{DnsError, Result};
use crate::traits::{NaptrLookup, NaptrRecord};

/// Standard DNS port.
const DNS_PORT: u16 = 53;

/// Blocking NAPTR lookups through hickory.
///
/// The system resolver is created on first use. Resolvers for explicit
/// primary servers are created once per address and reused.
pub struct HickoryNaptrLookup {
    system: OnceCell<Arc<Resolver>>,
    by_server: Mutex<HashMap<IpAddr, Arc<Resolver>>>,
    options: ResolverOpts,
}

impl HickoryNaptrLookup {
    /// Create a lookup backend with default resolver options.
    pub fn new() -> Self {
        Self::with_options(ResolverOpts::default())
    }

    /// Create a lookup backend with explicit resolver options.
    pub fn with_options(options: ResolverOpts) -> Self {
        Self {
            system: OnceCell::new(),
            by_server: Mutex::new(HashMap::new()),
            options,
        }
    }

    fn resolver_for(&self, name: &str, primary_dns: Option<IpAddr>) -> Result<Arc<Resolver>> {
        let transport = |e: std::io::Error| DnsError::Transport {
            name: name.to_string(),
            message: format!("cannot create resolver: {}", e),
        };

        match primary_dns {
            None => self
                .system
                .get_or_try_init(|| Resolver::from_system_conf().map(Arc::new))
                .cloned()
                .map_err(transport),
            Some(ip) => {
                let mut servers = self.by_server.lock();
                if let Some(resolver) = servers.get(&ip) {
                    return Ok(Arc::clone(resolver));
                }
                let config = ResolverConfig::from_parts(
                    None,
                    vec![],
                    NameServerConfigGroup::from_ips_clear(&[ip], DNS_PORT, true),
                );
                let resolver = Arc::new(Resolver::new(config, self.options.clone()).map_err(transport)?);
                servers.insert(ip, Arc::clone(&resolver));
                Ok(resolver)
            }
        }
    }
}

impl Default for HickoryNaptrLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl NaptrLookup for HickoryNaptrLookup {
    fn lookup_naptr(&self, name: &str, primary_dns: Option<IpAddr>) -> Result<Vec<NaptrRecord>> {
        let mut fqdn = Name::from_ascii(name).map_err(|e| DnsError::InvalidName {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        fqdn.set_fqdn(true);

        let resolver = self.resolver_for(name, primary_dns)?;
        tracing::debug!(name, ?primary_dns, "querying NAPTR");

        let lookup = match resolver.lookup(fqdn, RecordType::NAPTR) {
            Ok(lookup) => lookup,
            Err(e) if is_no_records(&e) => return Ok(Vec::new()),
            Err(e) => {
                return Err(DnsError::Transport {
                    name: name.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let records = lookup
            .records()
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::NAPTR(naptr)) => Some(NaptrRecord {
                    order: naptr.order(),
                    preference: naptr.preference(),
                    flags: String::from_utf8_lossy(naptr.flags()).into_owned(),
                    service: String::from_utf8_lossy(naptr.services()).into_owned(),
                    regexp: String::from_utf8_lossy(naptr.regexp()).into_owned(),
                    replacement: naptr.replacement().to_ascii(),
                    ttl: record.ttl(),
                }),
                _ => None,
            })
            .collect();

        Ok(records)
    }
}

fn is_no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}
