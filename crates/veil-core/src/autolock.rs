//! Inactivity timer that re-locks the workspace.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One-shot timer with at most one pending firing.
pub struct AutolockScheduler {
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutolockScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Cancels any pending timer, then arms a new one that calls `on_fire`
    /// after `minutes`. Zero minutes leaves the timer disarmed.
    pub fn reset<F>(&self, minutes: f64, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        if minutes <= 0.0 || minutes.is_nan() {
            return;
        }
        let delay = match Duration::try_from_secs_f64(minutes * 60.0) {
            Ok(delay) => delay,
            Err(e) => {
                warn!("Autolock disabled, interval of {} minutes unusable: {}", minutes, e);
                return;
            }
        };
        debug!("Autolock armed for {:?}", delay);
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        }));
    }

    /// Clears the pending timer, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for AutolockScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
