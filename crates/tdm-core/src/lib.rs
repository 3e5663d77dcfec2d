pub mod config;
pub mod logging;

pub mod control;
pub mod error;
pub mod fetch;
mod gate;
pub mod job;
pub mod manager;
pub mod progress;

pub use control::FailedJob;
pub use error::QueueError;
pub use fetch::{FetchOutcome, Fetcher};
pub use job::{CancelToken, Job, JobId};
pub use manager::{DownloadManager, QueueStatus};
pub use progress::{JobStatus, JsonLinesSink, NoopSink, ProgressEvent, ProgressSink, TracingSink};
