// # History Source Trait
//
// Defines how the engine reads declaration files at two points in history.
//
// ## Implementations
//
// - Git: `dnsync-history-git` crate
//
// The engine asks for a [`RevisionRange`], probes which declaration files
// changed inside it, and then reads the full declaration set at both ends so
// that validation sees the whole target snapshot.

use crate::config::HistoryConfig;
use crate::declaration::DeclarationFile;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// A point in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// There is no prior snapshot (first run); read as the empty tree
    NoHistory,
    /// A resolved commit id
    Commit(String),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::NoHistory => f.write_str("<no history>"),
            Revision::Commit(id) => f.write_str(id),
        }
    }
}

/// The span of history a run reconciles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    pub start: Revision,
    pub end: Revision,
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// How a declaration file changed inside a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A declaration file touched inside a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: FileChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<String>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Trait for history source implementations
///
/// Implementations only read; they never decide what to sync.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Resolve the configured range into concrete revisions
    ///
    /// A start revision that cannot be resolved (for example the parent of
    /// the very first commit) must come back as [`Revision::NoHistory`].
    async fn resolve_range(&self) -> Result<RevisionRange>;

    /// Declaration files added, modified or deleted inside the range
    async fn changed_files(&self, range: &RevisionRange) -> Result<Vec<FileChange>>;

    /// Every declaration file present at a revision
    ///
    /// # Returns
    ///
    /// - `Ok(None)`: no snapshot exists at this revision
    /// - `Ok(Some(files))`: the declaration files, possibly empty
    async fn declarations_at(&self, revision: &Revision) -> Result<Option<Vec<DeclarationFile>>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing history sources from configuration
pub trait HistorySourceFactory: Send + Sync {
    fn create(&self, config: &HistoryConfig) -> Result<Box<dyn HistorySource>>;
}
