//! Plan building
//!
//! Turns classifications into the minimal ordered list of remote mutations.
//!
//! ## Steps
//!
//! 1. Validate the full target snapshot; any violation aborts before a single
//!    lookup is made.
//! 2. Resolve each Added, Modified and Removed key through the remote index.
//! 3. Emit only the mutations that would change remote state.
//! 4. Order ops by name, with every delete after the creates and updates
//!    sharing its name.
//!
//! | Classification | Remote found, differs | Remote found, equal | Remote missing |
//! |----------------|-----------------------|---------------------|----------------|
//! | Added          | Update                | nothing             | Create         |
//! | Modified       | Update                | nothing             | Create         |
//! | Removed        | Delete                | Delete              | nothing        |

use crate::classify::Classification;
use crate::error::Result;
use crate::index::RemoteIndex;
use crate::record::{DeclaredRecord, IdentityKey, RemoteRecord};
use crate::snapshot::Snapshot;
use crate::validate::validate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// One unit of reconciliation work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ChangeOp {
    Create(DeclaredRecord),
    Update { id: String, record: DeclaredRecord },
    /// Carries identity only; there is no content to send
    Delete { id: String, key: IdentityKey },
}

impl ChangeOp {
    pub fn key(&self) -> IdentityKey {
        match self {
            ChangeOp::Create(record) | ChangeOp::Update { record, .. } => record.key(),
            ChangeOp::Delete { key, .. } => key.clone(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ChangeOp::Create(record) | ChangeOp::Update { record, .. } => &record.name,
            ChangeOp::Delete { key, .. } => &key.name,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, ChangeOp::Delete { .. })
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOp::Create(record) => write!(f, "create {} -> {}", record.key(), record.content),
            ChangeOp::Update { id, record } => {
                write!(f, "update {} [{}] -> {}", record.key(), id, record.content)
            }
            ChangeOp::Delete { id, key } => write!(f, "delete {} [{}]", key, id),
        }
    }
}

/// An ordered, validated list of ops ready for execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    ops: Vec<ChangeOp>,
}

impl Plan {
    fn new(mut ops: Vec<ChangeOp>) -> Self {
        // Stable: keeps identity-key order inside each (name, phase) bucket
        ops.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| a.is_delete().cmp(&b.is_delete()))
        });
        Self { ops }
    }

    pub fn ops(&self) -> &[ChangeOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<ChangeOp> {
        self.ops
    }
}

impl FromIterator<ChangeOp> for Plan {
    fn from_iter<T: IntoIterator<Item = ChangeOp>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Build the plan for moving remote state to `target`
///
/// `target` is the full new snapshot; `classifications` is the output of
/// [`classify`](crate::classify::classify) against it. Lookup failures abort
/// planning, so an `Err` always means no remote state was touched.
pub async fn build_plan<I>(
    target: &Snapshot,
    classifications: &[Classification],
    index: &I,
) -> Result<Plan>
where
    I: RemoteIndex + ?Sized,
{
    validate(target.records())?;

    let mut ops = Vec::new();
    for classification in classifications {
        match classification {
            Classification::Unchanged(key) => {
                debug!("{} unchanged, no lookup needed", key);
            }
            Classification::Added(record) => {
                let remote = index.lookup(&record.key()).await?;
                if let Some(existing) = &remote {
                    warn!(
                        "{} is new in history but already exists remotely as {}, will update instead",
                        record.key(),
                        existing.id
                    );
                }
                ops.extend(upsert(record, remote));
            }
            Classification::Modified { new, .. } => {
                let remote = index.lookup(&new.key()).await?;
                if remote.is_none() {
                    warn!("{} not found remotely, will create", new.key());
                }
                ops.extend(upsert(new, remote));
            }
            Classification::Removed(record) => {
                let key = record.key();
                match index.lookup(&key).await? {
                    Some(remote) => ops.push(ChangeOp::Delete { id: remote.id, key }),
                    None => info!("{} already absent remotely, nothing to delete", key),
                }
            }
        }
    }

    let plan = Plan::new(ops);
    debug!("Built plan with {} op(s)", plan.len());
    Ok(plan)
}

fn upsert(record: &DeclaredRecord, remote: Option<RemoteRecord>) -> Option<ChangeOp> {
    match remote {
        None => Some(ChangeOp::Create(record.clone())),
        Some(remote) if record.differs_from(&remote) => Some(ChangeOp::Update {
            id: remote.id,
            record: record.clone(),
        }),
        Some(remote) => {
            info!("{} already matches remote {}, no changes needed", record.key(), remote.id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::classify::classify;
    use crate::error::ConstraintViolation;
    use crate::record::RecordType;
    use crate::store::MemoryRemoteStore;

    fn rec(name: &str, record_type: RecordType, content: &str) -> DeclaredRecord {
        DeclaredRecord::new(name, record_type, content)
    }

    fn snapshot(records: Vec<DeclaredRecord>) -> Snapshot {
        Snapshot::from_records(records).unwrap()
    }

    async fn plan_for(old: &Snapshot, new: &Snapshot, store: &MemoryRemoteStore) -> Result<Plan> {
        build_plan(new, &classify(old, new), store).await
    }

    #[tokio::test]
    async fn added_without_remote_creates() {
        let store = MemoryRemoteStore::new();
        let record = rec("api.example.com", RecordType::A, "10.0.0.5").with_proxied(true);
        let plan = plan_for(&Snapshot::empty(), &snapshot(vec![record.clone()]), &store)
            .await
            .unwrap();
        assert_eq!(plan.ops(), &[ChangeOp::Create(record)]);
    }

    #[tokio::test]
    async fn added_with_stale_remote_updates() {
        let store = MemoryRemoteStore::new();
        let stale = store.seed(rec("api.example.com", RecordType::A, "10.0.0.1")).await;
        let record = rec("api.example.com", RecordType::A, "10.0.0.5");

        let plan = plan_for(&Snapshot::empty(), &snapshot(vec![record.clone()]), &store)
            .await
            .unwrap();
        assert_eq!(
            plan.ops(),
            &[ChangeOp::Update {
                id: stale.id,
                record
            }]
        );
    }

    #[tokio::test]
    async fn modified_already_in_sync_is_skipped() {
        let store = MemoryRemoteStore::new();
        store.seed(rec("api.example.com", RecordType::A, "10.0.0.6")).await;

        let plan = plan_for(
            &snapshot(vec![rec("api.example.com", RecordType::A, "10.0.0.5")]),
            &snapshot(vec![rec("api.example.com", RecordType::A, "10.0.0.6")]),
            &store,
        )
        .await
        .unwrap();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn modified_missing_remote_degrades_to_create() {
        let store = MemoryRemoteStore::new();
        let new = rec("api.example.com", RecordType::A, "10.0.0.6");

        let plan = plan_for(
            &snapshot(vec![rec("api.example.com", RecordType::A, "10.0.0.5")]),
            &snapshot(vec![new.clone()]),
            &store,
        )
        .await
        .unwrap();
        assert_eq!(plan.ops(), &[ChangeOp::Create(new)]);
    }

    #[tokio::test]
    async fn invalid_target_aborts_before_lookups() {
        let store = MemoryRemoteStore::new();
        let new = snapshot(vec![
            rec("a.example.com", RecordType::A, "10.0.0.1"),
            rec("a.example.com", RecordType::CNAME, "b.example.com"),
        ]);

        let err = plan_for(&Snapshot::empty(), &new, &store).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Constraint(ConstraintViolation::CnameConflict { .. })
        ));
    }

    #[tokio::test]
    async fn deletes_follow_upserts_for_same_name() {
        let store = MemoryRemoteStore::new();
        let old_a = store.seed(rec("www.example.com", RecordType::A, "10.0.0.1")).await;
        store.seed(rec("old.example.com", RecordType::TXT, "bye")).await;

        let old = snapshot(vec![
            rec("www.example.com", RecordType::A, "10.0.0.1"),
            rec("old.example.com", RecordType::TXT, "bye"),
        ]);
        let cname = rec("www.example.com", RecordType::CNAME, "lb.example.net");
        let new = snapshot(vec![cname.clone()]);

        let plan = plan_for(&old, &new, &store).await.unwrap();
        let rendered: Vec<String> = plan.ops().iter().map(ToString::to_string).collect();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.ops()[0].name(), "old.example.com");
        assert_eq!(plan.ops()[1], ChangeOp::Create(cname));
        assert_eq!(
            plan.ops()[2],
            ChangeOp::Delete {
                id: old_a.id,
                key: IdentityKey::new("www.example.com", RecordType::A)
            },
            "{rendered:?}"
        );
    }

    #[test]
    fn op_display() {
        let op = ChangeOp::Delete {
            id: "R1".to_string(),
            key: IdentityKey::new("api.example.com", RecordType::A),
        };
        assert_eq!(op.to_string(), "delete api.example.com (A) [R1]");
    }
}
