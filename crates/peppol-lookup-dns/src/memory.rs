//! In-memory implementation of the NaptrLookup trait.
//!
//! This is primarily for testing. Records are served from a table keyed by
//! lowercase name, and every query is counted so tests can observe caching.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::{DnsError, Result};
use crate::traits::{NaptrLookup, NaptrRecord};

/// Static NAPTR table.
///
/// Thread-safe via RwLock. Names are matched case-insensitively.
pub struct StaticNaptrLookup {
    inner: RwLock<StaticInner>,
    queries: AtomicUsize,
}

#[derive(Default)]
struct StaticInner {
    /// Records indexed by lowercase name.
    records: HashMap<String, Vec<NaptrRecord>>,

    /// Names whose query fails with a transport error.
    failures: HashMap<String, String>,

    /// Primary servers that were asked for, in query order.
    servers: Vec<Option<IpAddr>>,
}

impl StaticNaptrLookup {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StaticInner::default()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Add a record for `name`.
    pub fn insert(&self, name: &str, record: NaptrRecord) {
        self.inner
            .write()
            .records
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(record);
    }

    /// Make queries for `name` fail with a transport error.
    pub fn fail(&self, name: &str, message: impl Into<String>) {
        self.inner
            .write()
            .failures
            .insert(name.to_ascii_lowercase(), message.into());
    }

    /// Remove all records and failures.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.failures.clear();
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// The `primary_dns` argument of every query so far.
    pub fn requested_servers(&self) -> Vec<Option<IpAddr>> {
        self.inner.read().servers.clone()
    }
}

impl Default for StaticNaptrLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl NaptrLookup for StaticNaptrLookup {
    fn lookup_naptr(&self, name: &str, primary_dns: Option<IpAddr>) -> Result<Vec<NaptrRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let key = name.to_ascii_lowercase();

        let mut inner = self.inner.write();
        inner.servers.push(primary_dns);

        if let Some(message) = inner.failures.get(&key) {
            return Err(DnsError::Transport {
                name: name.to_string(),
                message: message.clone(),
            });
        }

        Ok(inner.records.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_counts_queries() {
        let lookup = StaticNaptrLookup::new();
        lookup.insert("a.example.org", NaptrRecord::smp("!^.*$!http://a!"));

        assert_eq!(lookup.lookup_naptr("A.Example.org", None).unwrap().len(), 1);
        assert!(lookup.lookup_naptr("b.example.org", None).unwrap().is_empty());
        assert_eq!(lookup.query_count(), 2);
    }

    #[test]
    fn test_failure_injection() {
        let lookup = StaticNaptrLookup::new();
        lookup.fail("down.example.org", "SERVFAIL");

        let err = lookup.lookup_naptr("down.example.org", None).unwrap_err();
        assert!(matches!(err, DnsError::Transport { .. }));
    }

    #[test]
    fn test_records_primary_server() {
        let lookup = StaticNaptrLookup::new();
        let server: IpAddr = "192.0.2.53".parse().unwrap();
        lookup.lookup_naptr("x.example.org", Some(server)).unwrap();
        assert_eq!(lookup.requested_servers(), vec![Some(server)]);
    }
}
