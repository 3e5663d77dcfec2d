//! Download jobs and their cancellation tokens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Catalog track id; also the job identity inside the manager.
pub type JobId = u64;

/// Shared, idempotent cancellation signal scoped to one job.
///
/// Clones observe the same flag. Signaling a job that already finished has no effect.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One download request. The token is created together with the job, so a caller
/// holding `cancel_token()` can cancel before the job is ever dequeued.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    output_dir: PathBuf,
    title: String,
    artist: String,
    token: CancelToken,
}

impl Job {
    pub fn new(id: JobId, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            output_dir: output_dir.into(),
            title: String::new(),
            artist: String::new(),
            token: CancelToken::new(),
        }
    }

    /// Set display metadata (used only for events and logs).
    pub fn with_display(mut self, title: impl Into<String>, artist: impl Into<String>) -> Self {
        self.title = title.into();
        self.artist = artist.into();
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Handle to this job's cancellation signal.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_signaled()
    }

    /// Same request with a new, unsignaled token (used when retrying).
    pub fn fresh_copy(&self) -> Job {
        Job {
            token: CancelToken::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_signaled());
        token.signal();
        token.signal();
        assert!(token.is_signaled());
    }

    #[test]
    fn clones_share_the_signal() {
        let job = Job::new(1, "/music");
        let handle = job.cancel_token();
        assert!(!job.is_cancelled());
        handle.signal();
        assert!(job.is_cancelled());
        assert!(job.clone().is_cancelled());
    }

    #[test]
    fn fresh_copy_has_new_token() {
        let job = Job::new(9, "/music/album").with_display("Song", "Band");
        job.cancel_token().signal();
        let copy = job.fresh_copy();
        assert!(!copy.is_cancelled());
        assert!(job.is_cancelled());
        assert_eq!(copy.id(), 9);
        assert_eq!(copy.output_dir(), Path::new("/music/album"));
        assert_eq!(copy.title(), "Song");
        assert_eq!(copy.artist(), "Band");
    }
}
