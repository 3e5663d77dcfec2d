//! RAII guard that keeps a job in the active registry while its fetch runs.

use crate::control::JobControl;
use crate::job::{Job, JobId};

/// Unregisters the job when dropped, even if the worker future is torn down.
pub(super) struct ActiveGuard<'a> {
    control: &'a JobControl,
    job_id: JobId,
}

impl<'a> ActiveGuard<'a> {
    pub(super) fn register(control: &'a JobControl, job: &Job) -> Self {
        control.register(job);
        Self {
            control,
            job_id: job.id(),
        }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.control.unregister(self.job_id);
    }
}
