//! Error types returned by the download manager.

use thiserror::Error;

use crate::job::JobId;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The manager is stopped (or was stopped while the caller waited for queue space).
    #[error("download manager not running")]
    NotRunning,

    /// Cancel target is not currently downloading (still queued, finished, or unknown).
    #[error("track {0} is not currently downloading")]
    JobNotActive(JobId),

    /// The fetch collaborator failed; `message` is the full error chain.
    #[error("download of track {job_id} failed: {message}")]
    Fetch { job_id: JobId, message: String },
}

impl QueueError {
    /// Wrap a collaborator error with the job it belongs to.
    pub fn fetch(job_id: JobId, err: &anyhow::Error) -> Self {
        QueueError::Fetch {
            job_id,
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_keeps_context_chain() {
        let err = anyhow::anyhow!("network timeout").context("stream segment");
        let wrapped = QueueError::fetch(7, &err);
        assert_eq!(
            wrapped.to_string(),
            "download of track 7 failed: stream segment: network timeout"
        );
    }

    #[test]
    fn job_not_active_names_the_track() {
        assert_eq!(
            QueueError::JobNotActive(42).to_string(),
            "track 42 is not currently downloading"
        );
    }
}
