//! Tokio-backed scheduler adapter.

use crate::ports::{Task, TaskHandle, TaskScheduler};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

struct TimerEntry {
    abort: AbortHandle,
    fired: Arc<AtomicBool>,
}

/// Production [`TaskScheduler`] running on a tokio runtime.
///
/// `run` spawns onto the runtime; `run_after` spawns a sleeping task and
/// tracks its abort handle so `cancel` can drop it before it fires.
/// Cancelling a timer whose task already started is allowed and reported
/// as a failed cancel; the late fire is the caller's to tolerate.
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
    timers: Arc<Mutex<HashMap<u64, TimerEntry>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use
    /// [`TokioScheduler::from_handle`] from synchronous contexts.
    #[must_use]
    pub fn new() -> Self {
        Self::from_handle(tokio::runtime::Handle::current())
    }

    /// Create a scheduler on an explicit runtime handle.
    #[must_use]
    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Timers armed and not yet fired or cancelled.
    pub fn armed_timers(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for TokioScheduler {
    fn run(&self, task: Task) {
        self.handle.spawn(async move {
            task();
        });
    }

    fn run_after(&self, delay: Duration, task: Task) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let fired = Arc::new(AtomicBool::new(false));
        let timers = Arc::clone(&self.timers);
        let task_fired = Arc::clone(&fired);
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task_fired.store(true, Ordering::SeqCst);
            timers.lock().remove(&id);
            task();
        });
        self.timers.lock().insert(
            id,
            TimerEntry {
                abort: join.abort_handle(),
                fired,
            },
        );
        TaskHandle::new(id)
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        match self.timers.lock().remove(&handle.id()) {
            Some(entry) => {
                entry.abort.abort();
                !entry.fired.load(Ordering::SeqCst)
            }
            None => false,
        }
    }
}
