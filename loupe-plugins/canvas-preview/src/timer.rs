//! Cancellable, exclusive debounce timer.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Runs a task once a delay elapses without being rescheduled.
///
/// At most one timer is pending: scheduling cancels the previous one under
/// the same lock. When the delay elapses, the task is spawned as its own
/// tokio task, so cancelling afterwards never interrupts it.
///
/// The timer remembers the runtime it was created on, so it can be
/// scheduled from threads outside that runtime (such as a GUI thread).
///
/// # Example
///
/// ```rust
/// use loupe_canvas_preview::DebounceTimer;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let timer = DebounceTimer::new();
/// timer.schedule(Duration::from_secs(60), async {});
/// assert!(timer.is_pending());
/// assert!(timer.cancel());
/// assert!(!timer.is_pending());
/// # });
/// ```
pub struct DebounceTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
    runtime: Option<Handle>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            runtime: Handle::try_current().ok(),
        }
    }

    /// Run `task` after `delay`, replacing any pending timer.
    ///
    /// Returns `false` if no tokio runtime is reachable.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            warn!("no async runtime available, timer not scheduled");
            return false;
        };

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task);
        }));
        true
    }

    /// Cancel the pending timer. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Whether a timer is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
