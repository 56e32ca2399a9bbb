use std::time::Duration;

use tokio::task::JoinHandle;

/// A restartable single-shot timer backed by a spawned tokio task.
///
/// At most one firing is pending: [`DebounceTimer::arm`] aborts the previous
/// task before scheduling the next. Cancellation is best effort, a task that
/// already woke up may still run its callback, so callbacks must tolerate
/// running late.
#[derive(Debug, Default)]
pub struct DebounceTimer {
    handle: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending firing and run `fire` once `delay` has elapsed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        }));
    }

    /// Stop the pending firing. Returns true if one was still scheduled.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Forget the handle without aborting; used by the callback itself.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
