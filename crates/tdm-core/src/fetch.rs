//! Fetch collaborator seam: the component that actually transfers a track.
//!
//! The manager knows nothing about catalogs, auth, or the collaborator's own
//! retries. Calls are blocking and run on the blocking thread pool; any
//! timeout must be enforced by the collaborator.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::job::JobId;

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    /// Final path of the written file.
    pub file_path: PathBuf,
    /// Size of the written file in bytes.
    pub file_size: u64,
    /// Quality label reported by the source (e.g. "LOSSLESS"), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl FetchOutcome {
    pub fn new(file_path: impl Into<PathBuf>, file_size: u64) -> Self {
        Self {
            file_path: file_path.into(),
            file_size,
            quality: None,
        }
    }
}

/// Performs the transfer for one job into `output_dir`.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, job_id: JobId, output_dir: &Path) -> Result<FetchOutcome>;
}

impl<F> Fetcher for F
where
    F: Fn(JobId, &Path) -> Result<FetchOutcome> + Send + Sync + 'static,
{
    fn fetch(&self, job_id: JobId, output_dir: &Path) -> Result<FetchOutcome> {
        self(job_id, output_dir)
    }
}
