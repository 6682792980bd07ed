//! Record model
//!
//! A [`DeclaredRecord`] is what a user wrote in a declaration file; a
//! [`RemoteRecord`] is what the provider currently stores. Both are matched
//! by their [`IdentityKey`], the `(name, type)` pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// TTL applied when a declaration omits one
pub const DEFAULT_TTL: u32 = 3600;

/// DNS record type
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
    NS,
    SRV,
    CAA,
    PTR,
}

impl RecordType {
    /// Wire name of the type (e.g. `"AAAA"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::NS => "NS",
            RecordType::SRV => "SRV",
            RecordType::CAA => "CAA",
            RecordType::PTR => "PTR",
        }
    }

    /// Types that may be served through the provider's proxy
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::AAAA | RecordType::CNAME)
    }

    /// Types that carry a priority field
    pub fn requires_priority(&self) -> bool {
        matches!(self, RecordType::MX | RecordType::SRV)
    }

    /// Address types that may not share a name with a CNAME
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::AAAA)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            "MX" => Ok(RecordType::MX),
            "TXT" => Ok(RecordType::TXT),
            "NS" => Ok(RecordType::NS),
            "SRV" => Ok(RecordType::SRV),
            "CAA" => Ok(RecordType::CAA),
            "PTR" => Ok(RecordType::PTR),
            other => Err(crate::Error::invalid_input(format!(
                "unsupported record type: {other}"
            ))),
        }
    }
}

/// Lowercase a domain name and strip the trailing root dot
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// The `(name, type)` pair that identifies one managed record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
}

impl IdentityKey {
    pub fn new(name: impl AsRef<str>, record_type: RecordType) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            record_type,
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.record_type)
    }
}

/// One record as authored in a declaration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub priority: Option<u16>,
    /// Free text for humans; never synced
    pub description: Option<String>,
}

impl DeclaredRecord {
    /// Build a record with default TTL and no proxying
    pub fn new(name: impl AsRef<str>, record_type: RecordType, content: impl Into<String>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            record_type,
            content: content.into(),
            ttl: DEFAULT_TTL,
            proxied: false,
            priority: None,
            description: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            name: self.name.clone(),
            record_type: self.record_type,
        }
    }

    /// Proxy flag as it should be sent; non-proxiable types are never proxied
    pub fn effective_proxied(&self) -> bool {
        self.proxied && self.record_type.is_proxiable()
    }

    /// Priority as it should be compared; ignored for types without one
    fn effective_priority(&self) -> Option<u16> {
        if self.record_type.requires_priority() {
            self.priority
        } else {
            None
        }
    }

    /// Compare the fields that are synced to the provider
    ///
    /// `description` is metadata and never takes part.
    pub fn synced_eq(&self, other: &DeclaredRecord) -> bool {
        self.key() == other.key()
            && self.content == other.content
            && self.ttl == other.ttl
            && self.effective_proxied() == other.effective_proxied()
            && self.effective_priority() == other.effective_priority()
    }

    /// Whether the provider's copy needs an update to match this record
    pub fn differs_from(&self, remote: &RemoteRecord) -> bool {
        let remote_priority = if self.record_type.requires_priority() {
            remote.priority
        } else {
            None
        };

        self.content != remote.content
            || self.ttl != remote.ttl
            || self.effective_proxied() != (remote.proxied && self.record_type.is_proxiable())
            || self.effective_priority() != remote_priority
    }
}

/// A record as currently stored by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Provider-assigned identifier, stable across updates
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
    pub priority: Option<u16>,
}

impl RemoteRecord {
    /// Materialize what the provider would hold after storing `record` under `id`
    pub fn from_declared(id: impl Into<String>, record: &DeclaredRecord) -> Self {
        Self {
            id: id.into(),
            name: record.name.clone(),
            record_type: record.record_type,
            content: record.content.clone(),
            ttl: record.ttl,
            proxied: record.effective_proxied(),
            priority: record.priority,
        }
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(&self.name, self.record_type)
    }
}
