//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles wrap real in-memory behavior and count every call, so tests
//! can assert on exactly which remote calls a run made.

#![allow(dead_code)]

use dnsync_core::error::{Error, Result};
use dnsync_core::store::MemoryRemoteStore;
use dnsync_core::traits::{
    FileChange, FileChangeKind, HistorySource, RemoteStore, Revision, RevisionRange,
};
use dnsync_core::{DeclarationFile, DeclaredRecord, IdentityKey, RemoteRecord};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A RemoteStore over a shared in-memory zone that counts calls and can
/// be told to fail specific mutations
pub struct MockRemoteStore {
    zone: MemoryRemoteStore,
    lookup_call_count: Arc<AtomicUsize>,
    mutation_call_count: Arc<AtomicUsize>,
    /// 1-based mutation numbers that should fail
    failing_mutations: Arc<Mutex<HashSet<usize>>>,
    /// Every mutation attempted, rendered as "create name", "update name", ...
    mutations: Arc<Mutex<Vec<String>>>,
    fail_lookups: Arc<Mutex<bool>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::over(MemoryRemoteStore::new())
    }

    /// Wrap an existing zone, typically one seeded by the test
    pub fn over(zone: MemoryRemoteStore) -> Self {
        Self {
            zone,
            lookup_call_count: Arc::new(AtomicUsize::new(0)),
            mutation_call_count: Arc::new(AtomicUsize::new(0)),
            failing_mutations: Arc::new(Mutex::new(HashSet::new())),
            mutations: Arc::new(Mutex::new(Vec::new())),
            fail_lookups: Arc::new(Mutex::new(false)),
        }
    }

    /// Create a new MockRemoteStore that shares zone and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            zone: other.zone.clone(),
            lookup_call_count: Arc::clone(&other.lookup_call_count),
            mutation_call_count: Arc::clone(&other.mutation_call_count),
            failing_mutations: Arc::clone(&other.failing_mutations),
            mutations: Arc::clone(&other.mutations),
            fail_lookups: Arc::clone(&other.fail_lookups),
        }
    }

    /// Make the `n`th mutation (1-based) fail with a provider error
    pub fn fail_mutation(&self, n: usize) {
        self.failing_mutations.lock().unwrap().insert(n);
    }

    /// Make every lookup fail
    pub fn fail_lookups(&self) {
        *self.fail_lookups.lock().unwrap() = true;
    }

    pub fn lookup_call_count(&self) -> usize {
        self.lookup_call_count.load(Ordering::SeqCst)
    }

    pub fn mutation_call_count(&self) -> usize {
        self.mutation_call_count.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn zone(&self) -> &MemoryRemoteStore {
        &self.zone
    }

    fn begin_mutation(&self, label: String) -> Result<()> {
        let n = self.mutation_call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.mutations.lock().unwrap().push(label.clone());
        if self.failing_mutations.lock().unwrap().contains(&n) {
            return Err(Error::provider("mock", format!("injected failure for {label}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteStore for MockRemoteStore {
    async fn find_by_name_and_type(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>> {
        self.lookup_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_lookups.lock().unwrap() {
            return Err(Error::timeout(format!("lookup {key}")));
        }
        self.zone.find_by_name_and_type(key).await
    }

    async fn create(&self, record: &DeclaredRecord) -> Result<RemoteRecord> {
        self.begin_mutation(format!("create {}", record.name))?;
        self.zone.create(record).await
    }

    async fn update(&self, id: &str, record: &DeclaredRecord) -> Result<RemoteRecord> {
        self.begin_mutation(format!("update {}", record.name))?;
        self.zone.update(id, record).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let name = self
            .zone
            .records()
            .await
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| r.name)
            .unwrap_or_else(|| id.to_string());
        self.begin_mutation(format!("delete {name}"))?;
        self.zone.delete(id).await
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A HistorySource with two fixed snapshots
///
/// Changed files are derived by comparing the two snapshots by path.
pub struct ScriptedHistory {
    start: Option<Vec<DeclarationFile>>,
    end: Vec<DeclarationFile>,
    declarations_call_count: Arc<AtomicUsize>,
}

impl ScriptedHistory {
    /// `start == None` means the range begins before any history
    pub fn new(start: Option<Vec<DeclarationFile>>, end: Vec<DeclarationFile>) -> Self {
        Self {
            start,
            end,
            declarations_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn declarations_call_count(&self) -> usize {
        self.declarations_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HistorySource for ScriptedHistory {
    async fn resolve_range(&self) -> Result<RevisionRange> {
        let start = match self.start {
            Some(_) => Revision::Commit("base".to_string()),
            None => Revision::NoHistory,
        };
        Ok(RevisionRange {
            start,
            end: Revision::Commit("head".to_string()),
        })
    }

    async fn changed_files(&self, _range: &RevisionRange) -> Result<Vec<FileChange>> {
        let before: BTreeMap<&str, &str> = self
            .start
            .iter()
            .flatten()
            .map(|f| (f.path.as_str(), f.content.as_str()))
            .collect();
        let after: BTreeMap<&str, &str> = self
            .end
            .iter()
            .map(|f| (f.path.as_str(), f.content.as_str()))
            .collect();

        let mut changes = Vec::new();
        for (path, content) in &after {
            match before.get(path) {
                None => changes.push(FileChange::new(*path, FileChangeKind::Added)),
                Some(old) if old != content => {
                    changes.push(FileChange::new(*path, FileChangeKind::Modified))
                }
                Some(_) => {}
            }
        }
        for path in before.keys().filter(|p| !after.contains_key(*p)) {
            changes.push(FileChange::new(*path, FileChangeKind::Deleted));
        }
        Ok(changes)
    }

    async fn declarations_at(&self, revision: &Revision) -> Result<Option<Vec<DeclarationFile>>> {
        self.declarations_call_count.fetch_add(1, Ordering::SeqCst);
        match revision {
            Revision::NoHistory => Ok(None),
            Revision::Commit(id) if id == "base" => Ok(self.start.clone()),
            Revision::Commit(_) => Ok(Some(self.end.clone())),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A declaration file at `records/<name>-<type>.yaml`
pub fn declaration(name: &str, record_type: &str, content: &str) -> DeclarationFile {
    declaration_with(name, record_type, content, "")
}

/// Like [`declaration`], with extra YAML lines appended
pub fn declaration_with(name: &str, record_type: &str, content: &str, extra: &str) -> DeclarationFile {
    DeclarationFile::new(
        format!("records/{}-{}.yaml", name, record_type.to_lowercase()),
        format!("name: {name}\ntype: {record_type}\ncontent: \"{content}\"\n{extra}"),
    )
}
