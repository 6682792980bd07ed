//! Declared snapshots
//!
//! A snapshot is the full set of declared records at one revision, keyed by
//! identity. Construction enforces that no identity key appears twice.

use crate::declaration::{DeclarationFile, ParsedDeclaration, parse_all, parse_declaration};
use crate::error::{ConstraintViolation, Result};
use crate::record::{DeclaredRecord, IdentityKey};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: BTreeMap<IdentityKey, DeclaredRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from bare records (no file provenance)
    pub fn from_records(
        records: impl IntoIterator<Item = DeclaredRecord>,
    ) -> std::result::Result<Self, ConstraintViolation> {
        Self::from_parsed(records.into_iter().enumerate().map(|(i, record)| ParsedDeclaration {
            path: format!("#{i}"),
            record,
        }))
    }

    /// Build from parsed declarations, rejecting duplicate identity keys
    pub fn from_parsed(
        parsed: impl IntoIterator<Item = ParsedDeclaration>,
    ) -> std::result::Result<Self, ConstraintViolation> {
        let mut records = BTreeMap::new();
        let mut origins: BTreeMap<IdentityKey, Vec<String>> = BTreeMap::new();

        for ParsedDeclaration { path, record } in parsed {
            let key = record.key();
            origins.entry(key.clone()).or_default().push(path);
            records.insert(key, record);
        }

        if let Some((key, paths)) = origins.into_iter().find(|(_, paths)| paths.len() > 1) {
            return Err(ConstraintViolation::DuplicateIdentity {
                name: key.name,
                record_type: key.record_type,
                paths,
            });
        }

        Ok(Self { records })
    }

    /// Parse and index the declaration files of one revision
    ///
    /// `None` means the history source has no snapshot for that revision
    /// (first run); it is the same as an empty snapshot.
    pub fn from_history(files: Option<Vec<DeclarationFile>>) -> Result<Self> {
        match files {
            None => Ok(Self::empty()),
            Some(files) => Ok(Self::from_parsed(parse_all(&files)?)?),
        }
    }

    /// Like [`Snapshot::from_history`], but skips bad files instead of failing
    ///
    /// Used for the old end of a range, where a past malformed file was never
    /// synced in that form. For duplicate keys the last file wins.
    pub fn from_history_lenient(files: Option<Vec<DeclarationFile>>) -> Self {
        let mut records = BTreeMap::new();
        for file in files.unwrap_or_default() {
            match parse_declaration(&file) {
                Ok(record) => {
                    if let Some(previous) = records.insert(record.key(), record) {
                        warn!("{} declared more than once in history, keeping {}", previous.key(), file.path);
                    }
                }
                Err(e) => warn!("Ignoring malformed historical declaration {}", e),
            }
        }
        Self { records }
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&DeclaredRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.records.keys()
    }

    /// Records in identity-key order
    pub fn records(&self) -> impl Iterator<Item = &DeclaredRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
