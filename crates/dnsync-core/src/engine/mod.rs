//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Resolving the history range and probing for changed declaration files
//! - Building the old and new snapshots
//! - Classifying, validating and planning
//! - Applying the plan and reporting every outcome
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   old/new files   ┌──────────────┐  classifications  ┌──────────────┐
//! │ HistorySource │ ─────────────────▶│  Classifier  │ ─────────────────▶│ Plan builder │
//! └───────────────┘                   └──────────────┘                   └──────────────┘
//!                                                                          │        ▲
//!                                                                     Plan │        │ lookup
//!                                                                          ▼        │
//!                                     ┌──────────────┐    mutations    ┌──────────────┐
//!                                     │  SyncReport  │◀────────────────│   Executor   │──▶ RemoteStore
//!                                     └──────────────┘                 └──────────────┘
//! ```
//!
//! Everything up to and including planning is free of remote side effects:
//! a run that fails there has mutated nothing.

use crate::classify::{ClassificationCounts, classify};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::executor::{Executor, PlanResult};
use crate::plan::{Plan, build_plan};
use crate::snapshot::Snapshot;
use crate::traits::{FileChangeKind, HistorySource, RemoteStore, RevisionRange};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// A plan together with the context it was built from
#[derive(Debug)]
pub struct PlannedSync {
    pub range: RevisionRange,
    pub changed_files: usize,
    pub counts: ClassificationCounts,
    pub plan: Plan,
}

/// Everything a run did, suitable for CI log output
#[derive(Debug)]
pub struct SyncReport {
    pub range: RevisionRange,
    pub changed_files: usize,
    pub counts: ClassificationCounts,
    pub planned_ops: usize,
    pub result: PlanResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Sync {}: {} file(s) changed; {} added, {} modified, {} removed, {} unchanged",
            self.range,
            self.changed_files,
            self.counts.added,
            self.counts.modified,
            self.counts.removed,
            self.counts.unchanged
        )?;
        writeln!(f, "Planned {} op(s)", self.planned_ops)?;

        for op in &self.result.applied {
            writeln!(f, "  applied      {}", op)?;
        }
        for failed in &self.result.failed {
            let retry = if failed.error.is_retryable() { " (retryable)" } else { "" };
            writeln!(f, "  failed       {}: {}{}", failed.op, failed.error, retry)?;
        }
        for op in &self.result.not_applied {
            writeln!(f, "  not applied  {}", op)?;
        }

        let elapsed = self.finished_at.signed_duration_since(self.started_at);
        if self.is_success() {
            write!(f, "Result: success in {} ms", elapsed.num_milliseconds())
        } else {
            write!(
                f,
                "Result: partial failure in {} ms ({} applied, {} failed, {} not applied)",
                elapsed.num_milliseconds(),
                self.result.applied.len(),
                self.result.failed.len(),
                self.result.not_applied.len()
            )
        }
    }
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Inspect with [`SyncEngine::plan()`] or apply with [`SyncEngine::run()`]
///
/// Each call re-reads history and remote state; the engine holds nothing
/// between runs.
pub struct SyncEngine {
    /// Source of declaration snapshots
    history: Box<dyn HistorySource>,

    /// Store consulted for lookups
    store: Arc<dyn RemoteStore>,

    /// Applies plans against the same store
    executor: Executor,
}

impl SyncEngine {
    pub fn new(
        history: Box<dyn HistorySource>,
        store: Arc<dyn RemoteStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let executor = Executor::with_workers(Arc::clone(&store), config.max_workers);
        Ok(Self {
            history,
            store,
            executor,
        })
    }

    /// Compute the plan without applying it
    pub async fn plan(&self) -> Result<PlannedSync> {
        let range = self.history.resolve_range().await?;
        info!("Detecting changes in {} ({})", range, self.history.source_name());

        let changes = self.history.changed_files(&range).await?;
        if changes.is_empty() {
            info!("No DNS record changes detected");
            return Ok(PlannedSync {
                range,
                changed_files: 0,
                counts: ClassificationCounts::default(),
                plan: Plan::default(),
            });
        }

        let count = |kind: FileChangeKind| changes.iter().filter(|c| c.kind == kind).count();
        info!(
            "Changes detected: {} added, {} modified, {} deleted",
            count(FileChangeKind::Added),
            count(FileChangeKind::Modified),
            count(FileChangeKind::Deleted)
        );

        let old = Snapshot::from_history_lenient(self.history.declarations_at(&range.start).await?);
        let new_files = self
            .history
            .declarations_at(&range.end)
            .await?
            .ok_or_else(|| Error::history(format!("no declarations at {}", range.end)))?;
        let new = Snapshot::from_history(Some(new_files))?;
        debug!("Snapshots: {} old, {} new record(s)", old.len(), new.len());

        let classifications = classify(&old, &new);
        let counts = ClassificationCounts::from_classifications(&classifications);
        info!(
            "Classified: {} added, {} modified, {} removed, {} unchanged",
            counts.added, counts.modified, counts.removed, counts.unchanged
        );

        let plan = build_plan(&new, &classifications, self.store.as_ref()).await?;
        info!("Plan has {} op(s)", plan.len());

        Ok(PlannedSync {
            range,
            changed_files: changes.len(),
            counts,
            plan,
        })
    }

    /// Plan and apply
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: the plan was applied; check [`SyncReport::is_success`]
    /// - `Err(Error)`: history, parsing, validation or lookup failed before any mutation
    pub async fn run(&self) -> Result<SyncReport> {
        self.run_with_shutdown(None).await
    }

    /// Plan and apply, stopping dispatch when `shutdown_rx` fires
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<SyncReport> {
        let started_at = Utc::now();
        let planned = self.plan().await?;
        let planned_ops = planned.plan.len();

        let result = if planned.plan.is_empty() {
            PlanResult::default()
        } else {
            self.executor.apply_with_shutdown(planned.plan, shutdown_rx).await
        };

        Ok(SyncReport {
            range: planned.range,
            changed_files: planned.changed_files,
            counts: planned.counts,
            planned_ops,
            result,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
