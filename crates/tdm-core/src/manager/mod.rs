//! Concurrent download queue manager.
//!
//! A fixed pool of workers drains one bounded FIFO of jobs. Each job runs
//! against the [`Fetcher`] on the blocking thread pool; every lifecycle
//! transition goes to the [`ProgressSink`]. Pausing only holds back jobs that
//! have not started yet, and cancel-by-id only reaches jobs that are executing.
//!
//! Workers are Tokio tasks, so `start` must be called from within a runtime.

mod guard;
mod worker;

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::QueueConfig;
use crate::control::{FailedJob, JobControl};
use crate::error::{QueueError, Result};
use crate::fetch::Fetcher;
use crate::gate::PauseGate;
use crate::job::{Job, JobId};
use crate::progress::{emit, JobStatus, ProgressEvent, ProgressSink};

/// State shared between the manager handle and its workers.
pub(crate) struct Shared {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
    control: JobControl,
    gate: PauseGate,
}

/// Queue sender and worker handles of the current run.
#[derive(Default)]
struct Lifecycle {
    sender: Option<mpsc::Sender<Job>>,
    epoch: u64,
    workers: Vec<JoinHandle<()>>,
}

/// Snapshot of the manager's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub running: bool,
    pub paused: bool,
    pub active_count: usize,
    pub queue_length: usize,
    pub failed_count: usize,
    pub workers: usize,
}

pub struct DownloadManager {
    shared: Arc<Shared>,
    workers: usize,
    capacity: usize,
    lifecycle: Mutex<Lifecycle>,
}

impl DownloadManager {
    /// Create a stopped manager. Worker count and queue capacity are clamped
    /// (see [`QueueConfig::effective_workers`]).
    pub fn new(config: &QueueConfig, fetcher: impl Fetcher, sink: impl ProgressSink) -> Self {
        Self::with_shared(config, Arc::new(fetcher), Arc::new(sink))
    }

    /// Like `new`, for collaborators that are already shared.
    pub fn with_shared(
        config: &QueueConfig,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                sink,
                control: JobControl::new(),
                gate: PauseGate::new(),
            }),
            workers: config.effective_workers(),
            capacity: config.effective_capacity(),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a fresh queue and spawn the worker pool. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut lc = self.lifecycle();
        let Some(epoch) = self.shared.gate.open() else {
            return false;
        };

        let (tx, rx) = mpsc::channel(self.capacity);
        let rx: worker::SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        lc.sender = Some(tx);
        lc.epoch = epoch;
        lc.workers = (0..self.workers)
            .map(|worker_id| {
                tokio::spawn(worker::run_worker(
                    worker_id,
                    epoch,
                    Arc::clone(&self.shared),
                    Arc::clone(&rx),
                ))
            })
            .collect();

        tracing::info!(workers = self.workers, capacity = self.capacity, "download manager started");
        true
    }

    /// Stop accepting work, release paused workers, and wait for every worker to
    /// exit. In-flight fetches finish; jobs still queued are dropped.
    /// Returns false (without waiting) if already stopped. Only the call that
    /// actually stops the manager joins the workers: a concurrent second `stop`
    /// returns false at once, possibly while workers are still finishing.
    pub async fn stop(&self) -> bool {
        let workers = {
            let mut lc = self.lifecycle();
            if !self.shared.gate.close() {
                return false;
            }
            lc.sender = None;
            std::mem::take(&mut lc.workers)
        };

        for handle in workers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task ended abnormally");
            }
        }
        tracing::info!("download manager stopped");
        true
    }

    /// Add a job to the queue, waiting for space if the queue is full.
    /// `queued` is emitted before this returns and before any worker can pick the job up.
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        let (sender, epoch) = {
            let lc = self.lifecycle();
            match &lc.sender {
                Some(sender) => (sender.clone(), lc.epoch),
                None => return Err(QueueError::NotRunning),
            }
        };

        let permit = tokio::select! {
            biased;
            _ = self.shared.gate.stopped(epoch) => return Err(QueueError::NotRunning),
            permit = sender.reserve() => permit.map_err(|_| QueueError::NotRunning)?,
        };

        emit(
            self.shared.sink.as_ref(),
            ProgressEvent::for_job(&job, JobStatus::Queued),
        );
        permit.send(job);
        Ok(())
    }

    /// Enqueue jobs one by one; failures are skipped. Returns how many were admitted.
    pub async fn enqueue_many(&self, jobs: impl IntoIterator<Item = Job>) -> usize {
        let mut queued = 0;
        for job in jobs {
            let job_id = job.id();
            match self.enqueue(job).await {
                Ok(()) => queued += 1,
                Err(e) => tracing::debug!(job_id, error = %e, "job not queued"),
            }
        }
        queued
    }

    /// Signal cancellation for a job that is currently downloading.
    pub fn cancel_download(&self, job_id: JobId) -> Result<()> {
        self.shared.control.request_cancel(job_id)
    }

    /// Returns false if already paused.
    pub fn pause_queue(&self) -> bool {
        let changed = self.shared.gate.pause();
        if changed {
            tracing::info!("download queue paused");
        }
        changed
    }

    /// Returns false if the queue was not paused.
    pub fn resume_queue(&self) -> bool {
        let changed = self.shared.gate.resume();
        if changed {
            tracing::info!("download queue resumed");
        }
        changed
    }

    /// Take every failed job out of the failed registry and enqueue a fresh copy of
    /// each. Jobs that cannot be re-admitted are dropped. Returns the number re-queued.
    pub async fn retry_all_failed(&self) -> usize {
        let failed = self.shared.control.take_failed();
        let total = failed.len();
        let retried = self
            .enqueue_many(failed.into_iter().map(|f| f.job.fresh_copy()))
            .await;
        tracing::info!(retried, total, "retrying failed downloads");
        retried
    }

    /// Forget all failed jobs without retrying. Returns how many were cleared.
    pub fn clear_failed(&self) -> usize {
        self.shared.control.clear_failed()
    }

    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        self.shared.control.failed_jobs()
    }

    pub fn active_count(&self) -> usize {
        self.shared.control.active_count()
    }

    /// Jobs waiting in the queue (including slots reserved by blocked enqueuers).
    pub fn queue_length(&self) -> usize {
        match &self.lifecycle().sender {
            Some(sender) => sender.max_capacity() - sender.capacity(),
            None => 0,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.shared.control.failed_count()
    }

    pub fn is_running(&self) -> bool {
        self.shared.gate.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            running: self.is_running(),
            paused: self.is_paused(),
            active_count: self.active_count(),
            queue_length: self.queue_length(),
            failed_count: self.failed_count(),
            workers: self.workers,
        }
    }
}

impl Drop for DownloadManager {
    // Detached workers notice the closed gate and exit after their current job.
    fn drop(&mut self) {
        self.shared.gate.close();
    }
}
