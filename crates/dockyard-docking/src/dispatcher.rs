//! Bounded-concurrency batch execution.
//!
//! Every job is spawned up front onto a [`JoinSet`]; a [`Semaphore`] with
//! `max_concurrency` permits gates how many actually run. Results are
//! collected in completion order, and a task that panics is turned into a
//! `Panicked` result for its ligand instead of taking the batch down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::{Id, JoinSet};
use tracing::{error, info, instrument};

use crate::job::{DockingJob, JobResult, JobStatus};
use crate::runner::DockingBackend;
use crate::shutdown::Shutdown;

/// Emitted each time a job finishes.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
    pub ligand: PathBuf,
    pub status: JobStatus,
    pub best_score: Option<f64>,
}

pub struct Dispatcher<B: DockingBackend> {
    backend: Arc<B>,
    max_concurrency: usize,
    progress_tx: Option<broadcast::Sender<BatchProgress>>,
}

impl<B: DockingBackend> Dispatcher<B> {
    /// `max_concurrency` of zero is treated as one.
    pub fn new(backend: B, max_concurrency: usize) -> Self {
        Self::from_arc(Arc::new(backend), max_concurrency)
    }

    pub fn from_arc(backend: Arc<B>, max_concurrency: usize) -> Self {
        Self {
            backend,
            max_concurrency: max_concurrency.max(1),
            progress_tx: None,
        }
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<BatchProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Dock a single job in isolation.
    ///
    /// `total` is the size of the batch this job belongs to, so its progress
    /// event reads `[1/total]` rather than `[1/1]`.
    pub async fn run_one(&self, job: DockingJob, shutdown: Shutdown, total: usize) -> JobResult {
        let fallback = job.clone();
        self.dispatch(vec![job], shutdown, 0, total.max(1))
            .await
            .pop()
            .unwrap_or_else(|| JobResult::failed(&fallback, JobStatus::Cancelled, "no result"))
    }

    /// Dock every job, returning exactly one result per job in completion order.
    pub async fn run_batch(&self, jobs: Vec<DockingJob>, shutdown: Shutdown) -> Vec<JobResult> {
        let total = jobs.len();
        self.dispatch(jobs, shutdown, 0, total).await
    }

    /// Like [`run_batch`](Self::run_batch), for the rest of a batch whose
    /// first `already_done` jobs have been docked. Progress counts continue
    /// from there.
    pub async fn run_remaining(
        &self,
        jobs: Vec<DockingJob>,
        shutdown: Shutdown,
        already_done: usize,
    ) -> Vec<JobResult> {
        let total = already_done + jobs.len();
        self.dispatch(jobs, shutdown, already_done, total).await
    }

    #[instrument(skip_all, fields(jobs = jobs.len(), max_concurrency = self.max_concurrency))]
    async fn dispatch(
        &self,
        jobs: Vec<DockingJob>,
        shutdown: Shutdown,
        already_done: usize,
        total: usize,
    ) -> Vec<JobResult> {
        let count = jobs.len();
        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut join_set = JoinSet::new();
        let mut pending: HashMap<Id, DockingJob> = HashMap::with_capacity(count);

        for job in jobs {
            let backend = Arc::clone(&self.backend);
            let sem = Arc::clone(&sem);
            let mut shutdown = shutdown.clone();
            let task_job = job.clone();

            let handle = join_set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.triggered() => None,
                    permit = sem.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return JobResult::failed(&task_job, JobStatus::Cancelled, "cancelled before start");
                };
                backend.dock(&task_job, shutdown).await
            });
            pending.insert(handle.id(), job);
        }

        let mut results = Vec::with_capacity(count);
        while let Some(joined) = join_set.join_next_with_id().await {
            let result = match joined {
                Ok((id, result)) => {
                    pending.remove(&id);
                    result
                }
                Err(e) => {
                    let Some(job) = pending.remove(&e.id()) else {
                        error!("Docking task {} failed for an unknown job: {}", e.id(), e);
                        continue;
                    };
                    error!(ligand = %job.ligand.display(), "Error in docking task: {}", e);
                    let status = if e.is_panic() { JobStatus::Panicked } else { JobStatus::Cancelled };
                    JobResult::failed(&job, status, format!("task failed: {e}"))
                }
            };

            info!(
                "Completed docking for {}: score={:?}, time={:.2}s, status={}",
                result.ligand.display(),
                result.best_score,
                result.runtime_sec,
                result.status
            );
            results.push(result);

            if let Some(ref tx) = self.progress_tx {
                let last = &results[results.len() - 1];
                let _ = tx.send(BatchProgress {
                    done: already_done + results.len(),
                    total,
                    ligand: last.ligand.clone(),
                    status: last.status,
                    best_score: last.best_score,
                });
            }
        }

        results
    }
}
