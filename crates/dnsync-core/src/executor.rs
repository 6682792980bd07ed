//! Plan execution
//!
//! Applies a [`Plan`] against a [`RemoteStore`], one op at a time by default.
//!
//! ## Failure isolation
//!
//! A failed op is recorded with its error and execution moves on; unrelated
//! records still sync. Nothing is rolled back and nothing is retried here.
//! Re-running the whole sync is the retry, which is safe because planning is
//! idempotent.
//!
//! ## Parallelism
//!
//! With `max_workers > 1`, ops are grouped by record name. Each group runs in
//! order on its own task and at most `max_workers` groups run at once, so ops
//! on the same name never overlap.

use crate::error::{Error, Result};
use crate::plan::{ChangeOp, Plan};
use crate::traits::RemoteStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// An op that the store rejected
#[derive(Debug)]
pub struct FailedOp {
    pub op: ChangeOp,
    pub error: Error,
}

/// Outcome of applying a plan, in plan order within each list
#[derive(Debug, Default)]
pub struct PlanResult {
    pub applied: Vec<ChangeOp>,
    pub failed: Vec<FailedOp>,
    /// Ops never attempted because execution was stopped
    pub not_applied: Vec<ChangeOp>,
}

impl PlanResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_applied.is_empty()
    }

    /// Whether every failure could clear up on a re-run
    pub fn all_failures_retryable(&self) -> bool {
        self.failed.iter().all(|f| f.error.is_retryable())
    }
}

pub struct Executor {
    store: Arc<dyn RemoteStore>,
    max_workers: usize,
}

impl Executor {
    /// Sequential executor
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_workers(store, 1)
    }

    /// Executor running up to `max_workers` name groups concurrently
    pub fn with_workers(store: Arc<dyn RemoteStore>, max_workers: usize) -> Self {
        Self {
            store,
            max_workers: max_workers.max(1),
        }
    }

    pub async fn apply(&self, plan: Plan) -> PlanResult {
        self.apply_with_shutdown(plan, None).await
    }

    /// Apply a plan, stopping dispatch once `shutdown_rx` fires
    ///
    /// Ops already in flight complete; ops not yet started are reported in
    /// [`PlanResult::not_applied`]. A dropped sender is not a shutdown.
    pub async fn apply_with_shutdown(
        &self,
        plan: Plan,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> PlanResult {
        let ops = plan.into_ops();
        info!(
            "Applying {} op(s) via {} ({} worker(s))",
            ops.len(),
            self.store.provider_name(),
            self.max_workers
        );

        let outcomes = if self.max_workers == 1 {
            self.run_sequential(&ops, shutdown_rx).await
        } else {
            self.run_grouped(&ops, shutdown_rx).await
        };

        let mut result = PlanResult::default();
        for (op, outcome) in ops.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(())) => result.applied.push(op),
                Some(Err(error)) => result.failed.push(FailedOp { op, error }),
                None => result.not_applied.push(op),
            }
        }
        result
    }

    async fn run_sequential(
        &self,
        ops: &[ChangeOp],
        mut shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Vec<Option<Result<()>>> {
        let mut outcomes: Vec<Option<Result<()>>> = ops.iter().map(|_| None).collect();

        for (i, op) in ops.iter().enumerate() {
            if shutdown_requested(&mut shutdown_rx) {
                warn!("Shutdown requested, {} op(s) not attempted", ops.len() - i);
                break;
            }
            outcomes[i] = Some(apply_op(self.store.as_ref(), op).await);
        }

        outcomes
    }

    async fn run_grouped(
        &self,
        ops: &[ChangeOp],
        mut shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Vec<Option<Result<()>>> {
        let mut outcomes: Vec<Option<Result<()>>> = ops.iter().map(|_| None).collect();
        let stop = Arc::new(AtomicBool::new(shutdown_requested(&mut shutdown_rx)));

        let watcher = shutdown_rx.map(|rx| {
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                if rx.await.is_ok() {
                    warn!("Shutdown requested, no further ops will be started");
                    stop.store(true, Ordering::SeqCst);
                }
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for group in group_by_name(ops) {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let stop = Arc::clone(&stop);

            tasks.spawn(async move {
                let mut done = Vec::with_capacity(group.len());
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return done;
                };
                for (i, op) in group {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    done.push((i, apply_op(store.as_ref(), &op).await));
                }
                done
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => {
                    for (i, outcome) in done {
                        outcomes[i] = Some(outcome);
                    }
                }
                Err(e) => error!("Executor task aborted: {}", e),
            }
        }

        if let Some(watcher) = watcher {
            watcher.abort();
        }

        outcomes
    }
}

/// Contiguous runs of ops sharing a name, tagged with their plan index
fn group_by_name(ops: &[ChangeOp]) -> Vec<Vec<(usize, ChangeOp)>> {
    let mut groups: Vec<Vec<(usize, ChangeOp)>> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if group.first().is_some_and(|(_, first)| first.name() == op.name()) => {
                group.push((i, op.clone()));
            }
            _ => groups.push(vec![(i, op.clone())]),
        }
    }
    groups
}

fn shutdown_requested(rx: &mut Option<oneshot::Receiver<()>>) -> bool {
    match rx {
        Some(receiver) => matches!(receiver.try_recv(), Ok(())),
        None => false,
    }
}

async fn apply_op(store: &dyn RemoteStore, op: &ChangeOp) -> Result<()> {
    debug!("Applying {}", op);
    let outcome = match op {
        ChangeOp::Create(record) => store.create(record).await.map(|remote| {
            info!("Created {} as {}", record.key(), remote.id);
        }),
        ChangeOp::Update { id, record } => store.update(id, record).await.map(|_| {
            info!("Updated {} [{}]", record.key(), id);
        }),
        ChangeOp::Delete { id, key } => store.delete(id).await.map(|()| {
            info!("Deleted {} [{}]", key, id);
        }),
    };

    if let Err(e) = &outcome {
        error!("Failed to {}: {}", op, e);
    }
    outcome
}
