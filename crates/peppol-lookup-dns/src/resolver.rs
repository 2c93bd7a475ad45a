//! NAPTR record selection and URL rewriting.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use regex::RegexBuilder;

use crate::cache::{NaptrCache, DEFAULT_MAX_CACHE_TTL};
use crate::error::{DnsError, Result};
use crate::traits::{NaptrLookup, NaptrRecord, SMP_SERVICE};

/// Maximum length of a DNS name in presentation form.
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label.
const MAX_LABEL_LEN: usize = 63;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaptrConfig {
    /// NAPTR service tag to accept.
    pub service: String,
    /// Whether the cache is enabled at construction.
    pub cache_enabled: bool,
    /// Upper bound on how long a resolution is cached.
    pub max_cache_ttl: Duration,
}

impl Default for NaptrConfig {
    fn default() -> Self {
        Self {
            service: SMP_SERVICE.to_string(),
            cache_enabled: true,
            max_cache_ttl: DEFAULT_MAX_CACHE_TTL,
        }
    }
}

/// Resolves hashed participant names to SMP URLs via NAPTR.
///
/// Cheap to share behind an `Arc`; the only mutable state is the cache.
pub struct NaptrResolver {
    lookup: Arc<dyn NaptrLookup>,
    cache: NaptrCache,
    service: String,
}

impl NaptrResolver {
    /// Create a resolver over a lookup backend.
    pub fn new(lookup: Arc<dyn NaptrLookup>, config: NaptrConfig) -> Self {
        let cache = NaptrCache::with_max_ttl(config.max_cache_ttl);
        if !config.cache_enabled {
            cache.disable();
        }
        Self {
            lookup,
            cache,
            service: config.service,
        }
    }

    /// Resolve `name` to the SMP URL with its `http://`/`https://` prefix removed.
    pub fn resolve(&self, name: &str, primary_dns: Option<IpAddr>, use_cache: bool) -> Result<String> {
        let url = self.resolve_url(name, primary_dns, use_cache)?;
        Ok(strip_url_scheme(&url).to_string())
    }

    /// Resolve `name` to the full SMP URL produced by the NAPTR record.
    pub fn resolve_url(
        &self,
        name: &str,
        primary_dns: Option<IpAddr>,
        use_cache: bool,
    ) -> Result<String> {
        validate_name(name)?;

        if use_cache {
            if let Some(url) = self.cache.get(name) {
                tracing::debug!(name, url = %url, "NAPTR cache hit");
                return Ok(url);
            }
        }

        let records = self.lookup.lookup_naptr(name, primary_dns)?;
        let (url, ttl) = self.select(name, records)?;
        tracing::debug!(name, url = %url, ttl, "resolved NAPTR");

        if use_cache {
            self.cache.put(name, url.clone(), Duration::from_secs(u64::from(ttl)));
        }

        Ok(url)
    }

    /// The resolution cache.
    pub fn cache(&self) -> &NaptrCache {
        &self.cache
    }

    /// The accepted service tag.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn select(&self, name: &str, mut records: Vec<NaptrRecord>) -> Result<(String, u32)> {
        records.retain(|r| r.is_terminal_uri() && r.service.eq_ignore_ascii_case(&self.service));
        records.sort_by_key(|r| (r.order, r.preference));

        for record in &records {
            if record.regexp.is_empty() {
                tracing::debug!(name, "skipping NAPTR record without regexp");
                continue;
            }
            if let Some(url) = apply_regexp(name, &record.regexp)? {
                if !url.is_empty() {
                    return Ok((url, record.ttl));
                }
            }
        }

        Err(DnsError::NoRecord {
            name: name.to_string(),
        })
    }
}

impl std::fmt::Debug for NaptrResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaptrResolver")
            .field("service", &self.service)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Check DNS name syntax.
///
/// Names are dot-separated labels of 1 to 63 characters drawn from ASCII
/// letters, digits, `-`, `_` and `*`, at most 253 characters in total, with no
/// trailing dot.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| DnsError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name exceeds 253 characters"));
    }
    if name.ends_with('.') {
        return Err(invalid("trailing dot"));
    }
    for label in name.split('.') {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid("label exceeds 63 characters"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'*'))
        {
            return Err(invalid("illegal character"));
        }
    }
    Ok(())
}

/// Apply a NAPTR substitution expression `<d>pattern<d>replacement<d>[i]`.
///
/// Returns `None` when the pattern does not match `input`. Back-references
/// `\1` to `\9` in the replacement refer to capture groups; `\\` and an escaped
/// delimiter stand for themselves.
pub fn apply_regexp(input: &str, expression: &str) -> Result<Option<String>> {
    let invalid = |reason: String| DnsError::InvalidRecord {
        name: input.to_string(),
        reason,
    };

    let mut chars = expression.chars();
    let delimiter = chars
        .next()
        .ok_or_else(|| invalid("empty substitution expression".to_string()))?;
    if delimiter.is_ascii_alphanumeric() || delimiter == '\\' {
        return Err(invalid(format!("illegal delimiter {:?}", delimiter)));
    }

    let parts = split_unescaped(chars.as_str(), delimiter);
    let [pattern, replacement, flags] = parts.as_slice() else {
        return Err(invalid(format!("malformed substitution expression {:?}", expression)));
    };

    let case_insensitive = match flags.as_str() {
        "" => false,
        "i" => true,
        other => return Err(invalid(format!("unknown regexp flags {:?}", other))),
    };

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| invalid(format!("bad pattern: {}", e)))?;

    if !regex.is_match(input) {
        return Ok(None);
    }

    let template = to_regex_template(replacement);
    Ok(Some(regex.replacen(input, 1, template.as_str()).into_owned()))
}

/// Remove a leading `http://` or `https://` (case-insensitive).
pub fn strip_url_scheme(url: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if url.len() >= scheme.len() && url[..scheme.len()].eq_ignore_ascii_case(scheme) {
            return &url[scheme.len()..];
        }
    }
    url
}

/// Split on `delimiter` where it is not preceded by a backslash. Escaped
/// delimiters are unescaped; other escapes are kept for the regex engine.
fn split_unescaped(s: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == delimiter => {
                    current.push(next);
                    chars.next();
                }
                Some(&next) => {
                    current.push('\\');
                    current.push(next);
                    chars.next();
                }
                None => current.push('\\'),
            }
        } else if c == delimiter {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Convert `\N` back-references into `${N}` and escape literal `$`.
fn to_regex_template(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(d @ '1'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticNaptrLookup;

    const NAME: &str = "b-85008b8279e07ab0392da75fa55856a2.iso6523-actorid-upis.acc.edelivery.tech.ec.europa.eu";

    fn resolver_with(records: Vec<NaptrRecord>) -> (Arc<StaticNaptrLookup>, NaptrResolver) {
        let lookup = Arc::new(StaticNaptrLookup::new());
        for record in records {
            lookup.insert(NAME, record);
        }
        let resolver = NaptrResolver::new(lookup.clone(), NaptrConfig::default());
        (lookup, resolver)
    }

    #[test]
    fn test_resolve_strips_scheme() {
        let (_, resolver) = resolver_with(vec![NaptrRecord::smp("!^.*$!https://smp.example.org/path!")]);
        assert_eq!(resolver.resolve(NAME, None, false).unwrap(), "smp.example.org/path");
        assert_eq!(
            resolver.resolve_url(NAME, None, false).unwrap(),
            "https://smp.example.org/path"
        );
    }

    #[test]
    fn test_cache_queries_once() {
        let (lookup, resolver) = resolver_with(vec![NaptrRecord::smp("!^.*$!http://smp.example.org!")]);

        let first = resolver.resolve(NAME, None, true).unwrap();
        let second = resolver.resolve(NAME, None, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(lookup.query_count(), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[test]
    fn test_cache_bypassed_when_not_requested() {
        let (lookup, resolver) = resolver_with(vec![NaptrRecord::smp("!^.*$!http://smp.example.org!")]);
        resolver.resolve(NAME, None, false).unwrap();
        resolver.resolve(NAME, None, false).unwrap();
        assert_eq!(lookup.query_count(), 2);
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_cache_cleared_forces_requery() {
        let (lookup, resolver) = resolver_with(vec![NaptrRecord::smp("!^.*$!http://smp.example.org!")]);
        resolver.resolve(NAME, None, true).unwrap();
        resolver.cache().clear();
        resolver.resolve(NAME, None, true).unwrap();
        assert_eq!(lookup.query_count(), 2);
    }

    #[test]
    fn test_disabled_cache_from_config() {
        let lookup = Arc::new(StaticNaptrLookup::new());
        lookup.insert(NAME, NaptrRecord::smp("!^.*$!http://smp.example.org!"));
        let config = NaptrConfig {
            cache_enabled: false,
            ..NaptrConfig::default()
        };
        let resolver = NaptrResolver::new(lookup.clone(), config);
        resolver.resolve(NAME, None, true).unwrap();
        resolver.resolve(NAME, None, true).unwrap();
        assert_eq!(lookup.query_count(), 2);
    }

    #[test]
    fn test_record_ordering_and_filtering() {
        let (_, resolver) = resolver_with(vec![
            NaptrRecord::smp("!^.*$!http://late.example.org!").with_priority(200, 1),
            NaptrRecord::smp("!^.*$!http://other.example.org!")
                .with_priority(1, 1)
                .with_service("Meta:SML"),
            NaptrRecord::smp("!^.*$!http://nonterminal.example.org!")
                .with_priority(1, 1)
                .with_flags("S"),
            NaptrRecord::smp("!^.*$!http://second.example.org!").with_priority(100, 20),
            NaptrRecord::smp("!^.*$!http://first.example.org!").with_priority(100, 10),
        ]);
        assert_eq!(resolver.resolve(NAME, None, false).unwrap(), "first.example.org");
    }

    #[test]
    fn test_lowercase_flag_accepted() {
        let (_, resolver) = resolver_with(vec![
            NaptrRecord::smp("!^.*$!http://smp.example.org!").with_flags("u")
        ]);
        assert!(resolver.resolve(NAME, None, false).is_ok());
    }

    #[test]
    fn test_no_record() {
        let (_, resolver) = resolver_with(vec![]);
        let err = resolver.resolve(NAME, None, true).unwrap_err();
        assert_eq!(err, DnsError::NoRecord { name: NAME.to_string() });
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_invalid_name_is_distinct_error() {
        let (lookup, resolver) = resolver_with(vec![]);
        let long_label = "x".repeat(64);
        for bad in ["", "a..b", "trailing.dot.", "spa ce.example", long_label.as_str()] {
            let err = resolver.resolve(bad, None, true).unwrap_err();
            assert!(matches!(err, DnsError::InvalidName { .. }), "{:?}", bad);
        }
        assert_eq!(lookup.query_count(), 0);
    }

    #[test]
    fn test_transport_error_propagates() {
        let lookup = Arc::new(StaticNaptrLookup::new());
        lookup.fail(NAME, "timed out");
        let resolver = NaptrResolver::new(lookup, NaptrConfig::default());
        let err = resolver.resolve(NAME, None, true).unwrap_err();
        assert!(matches!(err, DnsError::Transport { .. }));
        assert_eq!(err.name(), NAME);
    }

    #[test]
    fn test_primary_dns_passed_through() {
        let (lookup, resolver) = resolver_with(vec![NaptrRecord::smp("!^.*$!http://smp!")]);
        let server: IpAddr = "198.51.100.7".parse().unwrap();
        resolver.resolve(NAME, Some(server), false).unwrap();
        assert_eq!(lookup.requested_servers(), vec![Some(server)]);
    }

    #[test]
    fn test_apply_regexp_backreferences() {
        let out = apply_regexp("b-abc.scheme.zone", r"!^([^.]+)\.(.*)$!https://\1.smp.\2/!").unwrap();
        assert_eq!(out.as_deref(), Some("https://b-abc.smp.scheme.zone/"));
    }

    #[test]
    fn test_apply_regexp_case_insensitive_flag() {
        assert_eq!(apply_regexp("ABC", "!^abc$!http://x!").unwrap(), None);
        assert_eq!(
            apply_regexp("ABC", "!^abc$!http://x!i").unwrap().as_deref(),
            Some("http://x")
        );
    }

    #[test]
    fn test_apply_regexp_escaped_delimiter_and_dollar() {
        let out = apply_regexp("a", r"/^a$/http:\/\/x\/$1/").unwrap();
        assert_eq!(out.as_deref(), Some("http://x/$1"));
    }

    #[test]
    fn test_apply_regexp_malformed() {
        for bad in ["", "!^.*$!x", "a^.*$ax", "!(!x!", "!^.*$!x!q"] {
            let err = apply_regexp("n", bad).unwrap_err();
            assert!(matches!(err, DnsError::InvalidRecord { .. }), "{:?}", bad);
        }
    }

    #[test]
    fn test_malformed_record_surfaces() {
        let (_, resolver) = resolver_with(vec![NaptrRecord::smp("!(!x!")]);
        let err = resolver.resolve(NAME, None, false).unwrap_err();
        assert!(matches!(err, DnsError::InvalidRecord { .. }));
    }

    #[test]
    fn test_strip_url_scheme() {
        assert_eq!(strip_url_scheme("http://a.b"), "a.b");
        assert_eq!(strip_url_scheme("HTTPS://a.b/c"), "a.b/c");
        assert_eq!(strip_url_scheme("a.b"), "a.b");
        assert_eq!(strip_url_scheme("ftp://a.b"), "ftp://a.b");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn generated_names_validate(labels in proptest::collection::vec("[a-z0-9][a-z0-9-]{0,20}", 1..6)) {
                let name = labels.join(".");
                prop_assert!(validate_name(&name).is_ok());
            }

            #[test]
            fn whole_match_rewrite_yields_replacement(
                name in "[a-z0-9]{1,20}\\.[a-z]{2,5}",
                host in "[a-z]{1,20}\\.example\\.org",
            ) {
                let expression = format!("!^.*$!https://{}!", host);
                let url = apply_regexp(&name, &expression).unwrap();
                prop_assert_eq!(url, Some(format!("https://{}", host)));
            }
        }
    }
}
