//! Pause gate: the monitor workers pass through before starting a job.
//!
//! Holds the `running` and `paused` flags. Every change wakes all waiters.
//! Each `open` starts a new epoch; workers and enqueuers of an older epoch treat
//! the gate as stopped, so a quick stop/start never revives them.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GateState {
    running: bool,
    paused: bool,
    epoch: u64,
}

pub(crate) struct PauseGate {
    state: watch::Sender<GateState>,
}

impl PauseGate {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(GateState::default());
        Self { state }
    }

    /// Flip `running` false→true. Returns the new epoch, or None if already running.
    pub(crate) fn open(&self) -> Option<u64> {
        let mut epoch = None;
        self.state.send_if_modified(|s| {
            if s.running {
                return false;
            }
            s.running = true;
            s.epoch += 1;
            epoch = Some(s.epoch);
            true
        });
        epoch
    }

    /// Flip `running` true→false and clear `paused`, releasing every waiter.
    /// Returns false if already stopped.
    pub(crate) fn close(&self) -> bool {
        self.state.send_if_modified(|s| {
            if !s.running {
                return false;
            }
            s.running = false;
            s.paused = false;
            true
        })
    }

    /// Returns false if already paused.
    pub(crate) fn pause(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.paused {
                return false;
            }
            s.paused = true;
            true
        })
    }

    /// Returns false if not paused.
    pub(crate) fn resume(&self) -> bool {
        self.state.send_if_modified(|s| {
            if !s.paused {
                return false;
            }
            s.paused = false;
            true
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    /// Wait while paused. Returns true if the caller may start its job, false if
    /// the gate was stopped (or reopened under a newer epoch) in the meantime.
    pub(crate) async fn pass(&self, epoch: u64) -> bool {
        self.state
            .subscribe()
            .wait_for(|s| !s.paused || !s.running || s.epoch != epoch)
            .await
            .map(|s| s.running && s.epoch == epoch)
            .unwrap_or(false)
    }

    /// Resolves once the run started under `epoch` is over.
    pub(crate) async fn stopped(&self, epoch: u64) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| !s.running || s.epoch != epoch).await;
    }
}
