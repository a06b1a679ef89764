use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type DebouncedAction = Arc<dyn Fn() + Send + Sync>;

/// Trailing-edge debouncer: every trigger cancels the pending run and
/// schedules a new one `wait` later, so a burst collapses into one call.
pub struct Debouncer {
    wait: Duration,
    action: DebouncedAction,
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Binds to the ambient tokio runtime when there is one. Without a
    /// runtime, triggers run the action immediately and bursts are not
    /// coalesced.
    pub fn new<F>(wait: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            tracing::warn!("No async runtime, debouncing disabled: every trigger runs immediately");
        }

        Self {
            wait,
            action: Arc::new(action),
            runtime,
            pending: Mutex::new(None),
        }
    }

    pub fn trigger(&self) {
        let Some(runtime) = self.runtime.as_ref() else {
            (self.action)();
            return;
        };

        let action = Arc::clone(&self.action);
        let wait = self.wait;

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(wait).await;
            action();
        }));
    }

    /// Drops the scheduled run, if any. Returns whether one was pending.
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

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
