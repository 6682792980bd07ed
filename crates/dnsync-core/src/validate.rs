//! Coexistence validation
//!
//! Rules are relational across every record sharing a name, so validation
//! always runs over a full target snapshot rather than a single record:
//!
//! 1. A CNAME may not share its name with an A or AAAA record.
//! 2. An NS record excludes every other type at its name.
//!
//! The first offending name (in name order) fails the whole batch.

use crate::error::ConstraintViolation;
use crate::record::{DeclaredRecord, RecordType};
use std::collections::{BTreeMap, BTreeSet};

pub fn validate<'a>(
    records: impl IntoIterator<Item = &'a DeclaredRecord>,
) -> Result<(), ConstraintViolation> {
    let mut by_name: BTreeMap<&str, BTreeSet<RecordType>> = BTreeMap::new();
    for record in records {
        by_name
            .entry(record.name.as_str())
            .or_default()
            .insert(record.record_type);
    }

    for (name, types) in by_name {
        if types.contains(&RecordType::CNAME) && types.iter().any(RecordType::is_address) {
            return Err(ConstraintViolation::CnameConflict {
                name: name.to_string(),
            });
        }
        if types.contains(&RecordType::NS) && types.len() > 1 {
            return Err(ConstraintViolation::NsExclusivity {
                name: name.to_string(),
            });
        }
    }

    Ok(())
}
