//! Progress sink that records every event in emission order.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tdm_core::{JobId, JobStatus, ProgressEvent, ProgressSink};

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl ProgressSink for Recorder {
    fn notify(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Statuses seen for one job, in order.
    pub fn statuses(&self, job_id: JobId) -> Vec<JobStatus> {
        self.events()
            .into_iter()
            .filter(|e| e.job_id == job_id)
            .map(|e| e.status)
            .collect()
    }

    /// Job ids that reached `status`, in emission order.
    pub fn ids_with(&self, status: JobStatus) -> Vec<JobId> {
        self.events()
            .into_iter()
            .filter(|e| e.status == status)
            .map(|e| e.job_id)
            .collect()
    }

    pub fn has(&self, job_id: JobId, status: JobStatus) -> bool {
        self.statuses(job_id).contains(&status)
    }

    /// Poll until `job_id` reaches `status`; false on timeout.
    pub async fn wait_for(&self, job_id: JobId, status: JobStatus, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.has(job_id, status) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.has(job_id, status)
    }

    /// Poll until every job in `ids` has a terminal event; false on timeout.
    pub async fn wait_all_terminal(&self, ids: &[JobId], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let done = ids
                .iter()
                .all(|id| self.statuses(*id).iter().any(|s| s.is_terminal()));
            if done {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
