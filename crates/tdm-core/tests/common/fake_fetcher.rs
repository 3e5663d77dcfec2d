//! Fake fetch collaborator with a fixed delay and a switchable outcome.
//!
//! Tracks how many fetches run at once so tests can check the worker bound.
//! On success it writes `<id>.flac` into the job's output dir.

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tdm_core::{FetchOutcome, Fetcher, JobId};

#[derive(Default)]
struct Inner {
    delay: Duration,
    failure: Mutex<Option<String>>,
    panic_on_fetch: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<JobId>>,
}

#[derive(Clone, Default)]
pub struct FakeFetcher {
    inner: Arc<Inner>,
}

impl FakeFetcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                ..Inner::default()
            }),
        }
    }

    /// Make every following fetch fail with `message` (None = succeed again).
    pub fn set_failure(&self, message: Option<&str>) {
        *self.inner.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_panic(&self, panic: bool) {
        self.inner.panic_on_fetch.store(panic, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<JobId> {
        self.inner.calls.lock().unwrap().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, job_id: JobId, output_dir: &Path) -> Result<FetchOutcome> {
        self.inner.calls.lock().unwrap().push(job_id);
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.inner.delay);
        let failure = self.inner.failure.lock().unwrap().clone();
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.inner.panic_on_fetch.load(Ordering::SeqCst) {
            panic!("collaborator bug");
        }
        if let Some(message) = failure {
            anyhow::bail!("{}", message);
        }

        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.flac", job_id));
        let body = b"fLaC fake audio";
        std::fs::write(&path, body)?;
        Ok(FetchOutcome::new(path, body.len() as u64))
    }
}
