//! Job bookkeeping: which jobs are downloading right now and which ones failed.
//!
//! Workers register a job when its fetch starts and unregister it when the fetch
//! returns; cancel-by-id only reaches registered jobs. Failed jobs are kept with
//! their last error until they are retried, cleared, or later succeed.
//! Both maps sit behind one lock that is never held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{QueueError, Result};
use crate::job::{Job, JobId};

/// A job whose last attempt ended in a fetch error.
#[derive(Debug, Clone)]
pub struct FailedJob {
    pub job: Job,
    pub error: String,
}

#[derive(Default)]
struct Books {
    active: HashMap<JobId, Job>,
    failed: HashMap<JobId, FailedJob>,
}

/// Shared registry of active and failed jobs.
#[derive(Default)]
pub struct JobControl {
    books: Mutex<Books>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves both maps consistent, so a poisoned lock is still usable.
    fn books(&self) -> MutexGuard<'_, Books> {
        self.books
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark a job as executing. Call right before invoking the fetch collaborator.
    pub fn register(&self, job: &Job) {
        self.books().active.insert(job.id(), job.clone());
    }

    /// Unregister a job (call when the fetch returns, success or failure).
    pub fn unregister(&self, job_id: JobId) {
        self.books().active.remove(&job_id);
    }

    /// Signal cancellation for an executing job. Jobs still waiting in the queue
    /// are not reachable here and yield `JobNotActive`.
    pub fn request_cancel(&self, job_id: JobId) -> Result<()> {
        match self.books().active.get(&job_id) {
            Some(job) => {
                job.cancel_token().signal();
                Ok(())
            }
            None => Err(QueueError::JobNotActive(job_id)),
        }
    }

    pub fn is_active(&self, job_id: JobId) -> bool {
        self.books().active.contains_key(&job_id)
    }

    pub fn active_count(&self) -> usize {
        self.books().active.len()
    }

    /// Record a fetch failure, replacing any earlier entry for the same id.
    pub fn record_failure(&self, job: &Job, error: String) {
        self.books().failed.insert(
            job.id(),
            FailedJob {
                job: job.clone(),
                error,
            },
        );
    }

    /// Drop a stale failure entry once the job has succeeded.
    pub fn clear_failure(&self, job_id: JobId) {
        self.books().failed.remove(&job_id);
    }

    pub fn failed_count(&self) -> usize {
        self.books().failed.len()
    }

    /// Snapshot of failed jobs, ordered by id.
    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        let mut jobs: Vec<FailedJob> = self.books().failed.values().cloned().collect();
        jobs.sort_by_key(|f| f.job.id());
        jobs
    }

    /// Remove and return every failed job in one step, ordered by id.
    pub fn take_failed(&self) -> Vec<FailedJob> {
        let failed = std::mem::take(&mut self.books().failed);
        let mut jobs: Vec<FailedJob> = failed.into_values().collect();
        jobs.sort_by_key(|f| f.job.id());
        jobs
    }

    /// Forget all failed jobs; returns how many were dropped.
    pub fn clear_failed(&self) -> usize {
        std::mem::take(&mut self.books().failed).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_only_registered_jobs() {
        let control = JobControl::new();
        let job = Job::new(1, "/out");
        assert!(matches!(
            control.request_cancel(1),
            Err(QueueError::JobNotActive(1))
        ));
        assert!(!job.is_cancelled());

        control.register(&job);
        assert!(control.is_active(1));
        control.request_cancel(1).unwrap();
        control.request_cancel(1).unwrap();
        assert!(job.is_cancelled());

        control.unregister(1);
        assert_eq!(control.active_count(), 0);
        assert!(control.request_cancel(1).is_err());
    }

    #[test]
    fn failures_are_tracked_per_id() {
        let control = JobControl::new();
        control.record_failure(&Job::new(2, "/out"), "first".into());
        control.record_failure(&Job::new(2, "/out"), "second".into());
        control.record_failure(&Job::new(1, "/out"), "other".into());
        assert_eq!(control.failed_count(), 2);

        let snapshot = control.failed_jobs();
        assert_eq!(snapshot[0].job.id(), 1);
        assert_eq!(snapshot[1].error, "second");

        control.clear_failure(1);
        assert_eq!(control.failed_count(), 1);
    }

    #[test]
    fn take_failed_empties_registry() {
        let control = JobControl::new();
        for id in [3, 1, 2] {
            control.record_failure(&Job::new(id, "/out"), "boom".into());
        }
        let taken: Vec<JobId> = control.take_failed().iter().map(|f| f.job.id()).collect();
        assert_eq!(taken, vec![1, 2, 3]);
        assert_eq!(control.failed_count(), 0);
        assert!(control.take_failed().is_empty());
    }

    #[test]
    fn clear_failed_returns_count() {
        let control = JobControl::new();
        control.record_failure(&Job::new(1, "/out"), "boom".into());
        control.record_failure(&Job::new(2, "/out"), "boom".into());
        assert_eq!(control.clear_failed(), 2);
        assert_eq!(control.clear_failed(), 0);
    }
}
