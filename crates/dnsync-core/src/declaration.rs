//! Declaration file parsing
//!
//! One YAML mapping per file:
//!
//! ```yaml
//! name: api.example.com
//! type: A
//! content: 10.0.0.5
//! ttl: 3600        # optional
//! proxied: true    # optional, ignored unless A/AAAA/CNAME
//! priority: 10     # required for MX and SRV
//! description: primary api host   # optional, never synced
//! ```
//!
//! Parsing is the boundary where loosely-typed input becomes a
//! [`DeclaredRecord`]; nothing past this module sees raw YAML.

use crate::error::{Error, MalformedDeclaration, Result};
use crate::record::{DEFAULT_TTL, DeclaredRecord, RecordType, normalize_name};
use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// Raw contents of one declaration file at some revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFile {
    /// Repository-relative path
    pub path: String,
    pub content: String,
}

impl DeclarationFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Whether `path` is a declaration file inside `records_dir`
///
/// Only `.yaml` and `.yml` files directly or transitively under the
/// directory count.
pub fn is_declaration_path(path: &str, records_dir: &str) -> bool {
    let dir = records_dir.trim_end_matches('/');
    let Some(rest) = path.strip_prefix(dir).and_then(|r| r.strip_prefix('/')) else {
        return false;
    };
    !rest.is_empty() && (rest.ends_with(".yaml") || rest.ends_with(".yml"))
}

#[derive(Debug, Deserialize)]
struct RawDeclaration {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: serde_yaml::Value,
    ttl: Option<u32>,
    proxied: Option<bool>,
    priority: Option<u16>,
    description: Option<String>,
}

/// Parse a single declaration file
pub fn parse_declaration(file: &DeclarationFile) -> std::result::Result<DeclaredRecord, MalformedDeclaration> {
    let malformed = |reason: String| MalformedDeclaration::new(&file.path, reason);

    let raw: RawDeclaration =
        serde_yaml::from_str(&file.content).map_err(|e| malformed(e.to_string()))?;

    let name = normalize_name(&raw.name);
    if name.is_empty() {
        return Err(malformed("`name` must not be empty".to_string()));
    }

    let record_type: RecordType = raw
        .record_type
        .parse()
        .map_err(|_| malformed(format!("unsupported record type `{}`", raw.record_type)))?;

    let content = scalar_to_string(&raw.content)
        .ok_or_else(|| malformed("`content` must be a scalar value".to_string()))?;
    if content.is_empty() {
        return Err(malformed("`content` must not be empty".to_string()));
    }

    // Canonical text form, matching provider responses
    let content = match record_type {
        RecordType::A => content
            .parse::<Ipv4Addr>()
            .map(|addr| addr.to_string())
            .map_err(|_| malformed(format!("A record content `{content}` is not an IPv4 address")))?,
        RecordType::AAAA => content
            .parse::<Ipv6Addr>()
            .map(|addr| addr.to_string())
            .map_err(|_| {
                malformed(format!("AAAA record content `{content}` is not an IPv6 address"))
            })?,
        _ => content,
    };

    let ttl = raw.ttl.unwrap_or(DEFAULT_TTL);
    if ttl == 0 {
        return Err(malformed("`ttl` must be at least 1".to_string()));
    }

    let proxied = raw.proxied.unwrap_or(false);
    if proxied && !record_type.is_proxiable() {
        debug!("{}: `proxied` has no effect on {} records", file.path, record_type);
    }

    if record_type.requires_priority() && raw.priority.is_none() {
        return Err(malformed(format!("{record_type} records require `priority`")));
    }

    Ok(DeclaredRecord {
        name,
        record_type,
        content,
        ttl,
        proxied,
        priority: raw.priority,
        description: raw.description,
    })
}

/// A parsed record together with the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeclaration {
    pub path: String,
    pub record: DeclaredRecord,
}

/// Parse every file, reporting all malformed ones together
pub fn parse_all(files: &[DeclarationFile]) -> Result<Vec<ParsedDeclaration>> {
    let mut parsed = Vec::with_capacity(files.len());
    let mut malformed = Vec::new();

    for file in files {
        match parse_declaration(file) {
            Ok(record) => {
                debug!("Parsed {} from {}", record.key(), file.path);
                parsed.push(ParsedDeclaration {
                    path: file.path.clone(),
                    record,
                });
            }
            Err(e) => malformed.push(e),
        }
    }

    if malformed.is_empty() {
        Ok(parsed)
    } else {
        Err(Error::Malformed(malformed))
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
