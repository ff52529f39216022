//! Cancellation signal for blocking waits.
//!
//! A [`CancelToken`] is shared between whoever may interrupt a requester and
//! the requester itself. Blocking waits in the pool and gate park on their own
//! `Condvar`, so while they wait they register a wake hook with the token.
//! [`CancelToken::cancel`] sets the flag first and then runs every registered
//! hook, which notifies the relevant condition variable.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type WakeHook = Arc<dyn Fn() + Send + Sync>;

struct CancelInner {
    cancelled: AtomicBool,
    next_hook_id: AtomicU64,
    hooks: Mutex<Vec<(u64, WakeHook)>>,
}

/// Cloneable, thread-safe interruption signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                cancelled: AtomicBool::new(false),
                next_hook_id: AtomicU64::new(0),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Request cancellation and wake every registered waiter.
    ///
    /// Idempotent; hooks only run on the first call.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Snapshot so hooks never run under the hook-list lock.
        let hooks: Vec<WakeHook> = self
            .inner
            .hooks
            .lock()
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        tracing::debug!(waiters = hooks.len(), "cancellation requested");
        for hook in hooks {
            hook();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Register `hook` to run on cancellation until the returned guard drops.
    ///
    /// Callers must register before checking [`is_cancelled`](Self::is_cancelled)
    /// under their own lock, otherwise a cancellation between the check and the
    /// wait could be missed.
    pub(crate) fn on_cancel<F>(&self, hook: F) -> CancelRegistration
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.inner.hooks.lock().push((id, Arc::new(hook)));
        CancelRegistration {
            inner: Arc::clone(&self.inner),
            id,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Removes a wake hook from its token when dropped.
pub(crate) struct CancelRegistration {
    inner: Arc<CancelInner>,
    id: u64,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.inner.hooks.lock().retain(|(id, _)| *id != self.id);
    }
}
