//! Change classification
//!
//! Compares two snapshots by identity key. A key is `Modified` only when a
//! synced field differs; a description edit alone leaves it `Unchanged`.

use crate::record::{DeclaredRecord, IdentityKey};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// How one identity key changed between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassificationKind {
    Added,
    Modified,
    Removed,
    Unchanged,
}

impl fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassificationKind::Added => "added",
            ClassificationKind::Modified => "modified",
            ClassificationKind::Removed => "removed",
            ClassificationKind::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// One classified identity key, carrying the records the planner needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Added(DeclaredRecord),
    Modified {
        old: DeclaredRecord,
        new: DeclaredRecord,
    },
    /// Carries the old declaration; only its identity is used downstream
    Removed(DeclaredRecord),
    Unchanged(IdentityKey),
}

impl Classification {
    pub fn key(&self) -> IdentityKey {
        match self {
            Classification::Added(r) | Classification::Removed(r) => r.key(),
            Classification::Modified { new, .. } => new.key(),
            Classification::Unchanged(key) => key.clone(),
        }
    }

    pub fn kind(&self) -> ClassificationKind {
        match self {
            Classification::Added(_) => ClassificationKind::Added,
            Classification::Modified { .. } => ClassificationKind::Modified,
            Classification::Removed(_) => ClassificationKind::Removed,
            Classification::Unchanged(_) => ClassificationKind::Unchanged,
        }
    }
}

/// Per-kind totals for a classification run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl ClassificationCounts {
    pub fn from_classifications(items: &[Classification]) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.kind() {
                ClassificationKind::Added => counts.added += 1,
                ClassificationKind::Modified => counts.modified += 1,
                ClassificationKind::Removed => counts.removed += 1,
                ClassificationKind::Unchanged => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Whether anything needs reconciling
    pub fn has_changes(&self) -> bool {
        self.added + self.modified + self.removed > 0
    }
}

/// Classify every identity key present in either snapshot
///
/// Output is sorted by identity key, so equal inputs give equal outputs.
pub fn classify(old: &Snapshot, new: &Snapshot) -> Vec<Classification> {
    let keys: BTreeSet<&IdentityKey> = old.keys().chain(new.keys()).collect();

    keys.into_iter()
        .filter_map(|key| match (old.get(key), new.get(key)) {
            (None, Some(n)) => Some(Classification::Added(n.clone())),
            (Some(o), None) => Some(Classification::Removed(o.clone())),
            (Some(o), Some(n)) if o.synced_eq(n) => Some(Classification::Unchanged(key.clone())),
            (Some(o), Some(n)) => Some(Classification::Modified {
                old: o.clone(),
                new: n.clone(),
            }),
            (None, None) => None,
        })
        .collect()
}
