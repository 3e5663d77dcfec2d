//! Worker loop: dequeue, pass the pause gate, execute, report.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::guard::ActiveGuard;
use super::Shared;
use crate::error::QueueError;
use crate::job::Job;
use crate::progress::{emit, JobStatus, ProgressEvent};

pub(super) type SharedReceiver = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Runs until the run identified by `epoch` stops or the queue closes.
pub(super) async fn run_worker(worker_id: usize, epoch: u64, shared: Arc<Shared>, rx: SharedReceiver) {
    tracing::debug!(worker_id, "worker started");
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.gate.stopped(epoch) => None,
            job = async { rx.lock().await.recv().await } => job,
        };
        let Some(job) = next else {
            break;
        };

        if !shared.gate.pass(epoch).await {
            tracing::debug!(worker_id, job_id = job.id(), "stopped while paused; job discarded");
            break;
        }

        process_job(&shared, job).await;
    }
    tracing::debug!(worker_id, "worker exited");
}

/// Executes one job and emits exactly one terminal event for it.
async fn process_job(shared: &Shared, job: Job) {
    let job_id = job.id();

    if job.is_cancelled() {
        emit(
            shared.sink.as_ref(),
            ProgressEvent::for_job(&job, JobStatus::Cancelled),
        );
        return;
    }

    let guard = ActiveGuard::register(&shared.control, &job);
    // Running again supersedes an earlier failure of the same track.
    shared.control.clear_failure(job_id);
    emit(
        shared.sink.as_ref(),
        ProgressEvent::for_job(&job, JobStatus::Downloading),
    );

    // The sink may have taken a while; a cancel that landed meanwhile skips the fetch.
    if job.is_cancelled() {
        drop(guard);
        tracing::info!(job_id, "download cancelled before fetch");
        emit(
            shared.sink.as_ref(),
            ProgressEvent::for_job(&job, JobStatus::Cancelled),
        );
        return;
    }

    let fetcher = Arc::clone(&shared.fetcher);
    let output_dir = job.output_dir().to_path_buf();
    let result = tokio::task::spawn_blocking(move || fetcher.fetch(job_id, &output_dir))
        .await
        .unwrap_or_else(|e| Err(anyhow::anyhow!("fetch task failed: {}", e)));

    // A cancel that lands during the fetch wins over its result; files already
    // written by the collaborator stay on disk.
    let cancelled = job.is_cancelled();
    drop(guard);

    let event = if cancelled {
        tracing::info!(job_id, "download cancelled");
        ProgressEvent::for_job(&job, JobStatus::Cancelled)
    } else {
        match result {
            Ok(outcome) => {
                tracing::debug!(job_id, path = %outcome.file_path.display(), "download completed");
                ProgressEvent::for_job(&job, JobStatus::Completed).with_outcome(outcome)
            }
            Err(e) => {
                let message = QueueError::fetch(job_id, &e).to_string();
                tracing::warn!(job_id, error = %message, "download failed");
                shared.control.record_failure(&job, message.clone());
                ProgressEvent::for_job(&job, JobStatus::Error).with_error(message)
            }
        }
    };
    emit(shared.sink.as_ref(), event);
}
