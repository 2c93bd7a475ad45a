//! DNS name derivation for participant identifiers.
//!
//! A participant is located in the SML by hashing its identifier value into
//! a DNS label, then appending the (lowercased) identifier scheme and the SML
//! zone:
//!
//! ```text
//! Legacy:  b-<md5 hex>.<scheme>.<zone>
//! Modern:  <base32(sha256)>.<scheme>.<zone>
//! ```
//!
//! Two identifiers that differ only in case must land on the same name, so
//! both the value and the scheme are lowercased by default.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Md5Digest, Sha256Digest};
use crate::error::{NamingError, Result};
use crate::sml::SmlZone;
use crate::types::Identifier;

/// Label prefix of the legacy MD5 scheme.
pub const LEGACY_LABEL_PREFIX: &str = "b-";

/// Label used for the legacy wildcard registration marker (value `*`).
pub const WILDCARD_LABEL: &str = "*.";

/// How an identifier value is hashed into a DNS label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashingVariant {
    /// `b-` + lowercase hex MD5 (pre-NAPTR Peppol SML).
    Legacy,
    /// Lowercase unpadded base-32 SHA-256 (NAPTR-era SML).
    #[default]
    Modern,
}

/// Case handling applied before hashing and when appending the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingOptions {
    /// Lowercase the identifier value before hashing.
    pub lowercase_value: bool,
    /// Lowercase the identifier scheme before appending it.
    pub lowercase_scheme: bool,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            lowercase_value: true,
            lowercase_scheme: true,
        }
    }
}

/// A fully-qualified DNS name with no trailing dot.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedName(String);

impl ResolvedName {
    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedName({})", self.0)
    }
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hashes identifier values into DNS labels.
///
/// Stateless apart from its configuration; cheap to copy and share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameEncoder {
    variant: HashingVariant,
    options: NamingOptions,
}

impl NameEncoder {
    /// Create an encoder with default case handling.
    pub fn new(variant: HashingVariant) -> Self {
        Self {
            variant,
            options: NamingOptions::default(),
        }
    }

    /// Create an encoder with explicit case handling.
    pub fn with_options(variant: HashingVariant, options: NamingOptions) -> Self {
        Self { variant, options }
    }

    /// The hashing variant in use.
    pub fn variant(&self) -> HashingVariant {
        self.variant
    }

    /// The case handling in use.
    pub fn options(&self) -> NamingOptions {
        self.options
    }

    /// Encode an identifier's value into a DNS label.
    ///
    /// The label never contains the scheme or zone.
    pub fn encode<I: Identifier + ?Sized>(&self, identifier: &I) -> Result<String> {
        encode_value(identifier.value(), self.variant, self.options)
    }

    /// Encode, then compose with the scheme and zone into a [`ResolvedName`].
    pub fn resolved_name<I: Identifier + ?Sized>(
        &self,
        identifier: &I,
        zone: &SmlZone,
    ) -> Result<ResolvedName> {
        let label = self.encode(identifier)?;
        ZoneNameBuilder::new(self.options).build(&label, identifier.scheme(), zone.dns_zone())
    }
}

/// Hash a raw identifier value with the given variant.
pub fn encode_value(value: &str, variant: HashingVariant, options: NamingOptions) -> Result<String> {
    if value.is_empty() {
        return Err(NamingError::EmptyValue);
    }

    let normalized = if options.lowercase_value {
        value.to_lowercase()
    } else {
        value.to_string()
    };

    let label = match variant {
        HashingVariant::Legacy => {
            if normalized == "*" {
                WILDCARD_LABEL.to_string()
            } else {
                let digest = Md5Digest::hash(normalized.as_bytes());
                format!("{}{}", LEGACY_LABEL_PREFIX, digest.to_hex())
            }
        }
        HashingVariant::Modern => Sha256Digest::hash(normalized.as_bytes()).to_base32(),
    };

    Ok(label)
}

/// Composes a label, an optional scheme, and an SML zone into a DNS name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneNameBuilder {
    options: NamingOptions,
}

impl ZoneNameBuilder {
    /// Create a builder with the given case handling.
    pub fn new(options: NamingOptions) -> Self {
        Self { options }
    }

    /// Build `label.scheme.zone` without the trailing dot.
    ///
    /// - a missing or empty `scheme` drops that segment entirely
    /// - a non-empty `zone` must end with `.`, otherwise
    ///   [`NamingError::InvalidZone`] is returned
    /// - a label that already ends in `.` (the legacy wildcard) is not doubled
    pub fn build(&self, label: &str, scheme: Option<&str>, zone: &str) -> Result<ResolvedName> {
        if !zone.is_empty() && !zone.ends_with('.') {
            return Err(NamingError::InvalidZone {
                zone: zone.to_string(),
            });
        }

        let mut name = String::with_capacity(label.len() + zone.len() + 32);
        name.push_str(label);

        if let Some(scheme) = scheme.filter(|s| !s.is_empty()) {
            if !name.ends_with('.') {
                name.push('.');
            }
            if self.options.lowercase_scheme {
                name.push_str(&scheme.to_lowercase());
            } else {
                name.push_str(scheme);
            }
        }

        if !zone.is_empty() {
            if !name.ends_with('.') {
                name.push('.');
            }
            name.push_str(zone);
        }

        if name.ends_with('.') {
            name.pop();
        }

        Ok(ResolvedName(name))
    }
}
