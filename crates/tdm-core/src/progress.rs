//! Lifecycle events for download jobs and the sinks that receive them.
//!
//! Per job: `queued` → `downloading` → one of `completed` / `error` / `cancelled`.
//! A job cancelled before it starts goes straight from `queued` to `cancelled`.
//! Sinks run synchronously on the emitting worker, so a slow sink delays that
//! worker's next event.

use serde::Serialize;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use crate::fetch::FetchOutcome;
use crate::job::{Job, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle transition of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub artist: String,
    /// Present on `completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FetchOutcome>,
    /// Present on `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub(crate) fn for_job(job: &Job, status: JobStatus) -> Self {
        Self {
            job_id: job.id(),
            status,
            title: job.title().to_string(),
            artist: job.artist().to_string(),
            outcome: None,
            error: None,
        }
    }

    pub(crate) fn with_outcome(mut self, outcome: FetchOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub(crate) fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Receives every lifecycle transition. Implementations must be cheap or accept
/// that they stall the calling worker.
pub trait ProgressSink: Send + Sync + 'static {
    fn notify(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync + 'static,
{
    fn notify(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Logs each transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, event: &ProgressEvent) {
        let job_id = event.job_id;
        match event.status {
            JobStatus::Queued => tracing::info!(job_id, "track {} added to queue", job_id),
            JobStatus::Downloading => tracing::info!(job_id, "downloading track {}", job_id),
            JobStatus::Completed => match &event.outcome {
                Some(outcome) => tracing::info!(
                    job_id,
                    size = outcome.file_size,
                    "downloaded: {}",
                    outcome.file_path.display()
                ),
                None => tracing::info!(job_id, "track {} downloaded", job_id),
            },
            JobStatus::Error => tracing::error!(
                job_id,
                error = event.error.as_deref().unwrap_or("unknown error"),
                "download failed"
            ),
            JobStatus::Cancelled => tracing::warn!(job_id, "track {} cancelled", job_id),
        }
    }
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send + 'static> ProgressSink for JsonLinesSink<W> {
    fn notify(&self, event: &ProgressEvent) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let written = serde_json::to_writer(&mut *out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| {
                out.write_all(b"\n")?;
                out.flush()
            });
        if let Err(e) = written {
            tracing::warn!(job_id = event.job_id, error = %e, "failed to write progress event");
        }
    }
}

/// Deliver `event` to `sink`, containing any panic so the worker survives.
pub(crate) fn emit(sink: &dyn ProgressSink, event: ProgressEvent) {
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| sink.notify(&event)));
    if delivered.is_err() {
        tracing::warn!(
            job_id = event.job_id,
            status = %event.status,
            "progress sink panicked; event dropped"
        );
    }
}
