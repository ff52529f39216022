//! Counting resource pool with blocking, cancellable admission.
//!
//! A pool owns a fixed capacity `C` and a count of held permits. All mutable
//! state lives behind one `parking_lot::Mutex`, and blocked acquirers park on a
//! `parking_lot::Condvar` that is signaled on release, on admission when
//! capacity remains, and on cancellation. There is no polling.
//!
//! # Wake policies
//!
//! - [`WakePolicy::Fifo`]: every acquirer takes a ticket and only the oldest
//!   ticket may be admitted. First attempted is first granted, which is what the
//!   ordering gate relies on.
//! - [`WakePolicy::Barging`]: any waiter that observes free capacity takes it.
//!   Capacity is still never exceeded.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::core::{CancelToken, CoordinationError};

/// Which blocked acquirer proceeds when a permit frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePolicy {
    /// Strict first-come first-served admission.
    Fifo,
    /// Unordered admission; whoever wins the lock first.
    Barging,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Configured capacity.
    pub capacity: u32,
    /// Permits currently held.
    pub held: u32,
    /// Acquirers currently blocked.
    pub waiting: usize,
    /// Highest `held` value ever observed.
    pub peak_held: u32,
    /// Total successful admissions.
    pub admitted_total: u64,
    /// Total acquire attempts abandoned through cancellation.
    pub cancelled_total: u64,
    /// Permits detached with [`Permit::forget`] and not yet released.
    pub detached: u32,
}

#[derive(Debug, Default)]
struct PoolState {
    held: u32,
    waiters: VecDeque<u64>,
    next_ticket: u64,
    detached: u32,
    peak_held: u32,
    admitted_total: u64,
    cancelled_total: u64,
}

impl PoolState {
    fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.waiters.push_back(ticket);
        ticket
    }

    fn remove_waiter(&mut self, ticket: u64) {
        if self.waiters.front() == Some(&ticket) {
            self.waiters.pop_front();
        } else if let Some(pos) = self.waiters.iter().position(|t| *t == ticket) {
            self.waiters.remove(pos);
        }
    }

    fn admit(&mut self) {
        self.held += 1;
        self.admitted_total += 1;
        self.peak_held = self.peak_held.max(self.held);
    }
}

struct PoolShared {
    label: String,
    capacity: u32,
    policy: WakePolicy,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl PoolShared {
    fn is_turn(&self, state: &PoolState, ticket: u64) -> bool {
        match self.policy {
            WakePolicy::Fifo => state.waiters.front() == Some(&ticket),
            WakePolicy::Barging => true,
        }
    }

    /// Return one permit previously handed out by a live [`Permit`].
    fn release_guarded(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.held > state.detached, "guarded permit without a held slot");
        state.held -= 1;
        tracing::debug!(
            pool = %self.label,
            held = state.held,
            capacity = self.capacity,
            waiting = state.waiters.len(),
            "permit released"
        );
        drop(state);
        self.available.notify_all();
    }
}

/// Capacity-bounded admission primitive shared by every requester of a class.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Clone)]
pub struct ResourcePool {
    shared: Arc<PoolShared>,
}

impl ResourcePool {
    /// Create a pool holding at most `capacity` permits at once.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] when `capacity` is zero.
    pub fn new(
        label: impl Into<String>,
        capacity: u32,
        policy: WakePolicy,
    ) -> Result<Self, CoordinationError> {
        let label = label.into();
        if capacity == 0 {
            return Err(CoordinationError::Configuration(format!(
                "pool `{label}` capacity must be greater than 0"
            )));
        }
        Ok(Self {
            shared: Arc::new(PoolShared {
                label,
                capacity,
                policy,
                state: Mutex::new(PoolState::default()),
                available: Condvar::new(),
            }),
        })
    }

    /// Pool label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.shared.capacity
    }

    /// Configured wake policy.
    #[must_use]
    pub fn wake_policy(&self) -> WakePolicy {
        self.shared.policy
    }

    /// Block until a permit is available, then take it.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Cancelled`] if `cancel` fires before a
    /// permit is granted. The held count is left untouched in that case.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<Permit, CoordinationError> {
        let hook_target = Arc::clone(&self.shared);
        let _registration = cancel.on_cancel(move || {
            let _state = hook_target.state.lock();
            hook_target.available.notify_all();
        });

        let shared = &self.shared;
        let mut state = shared.state.lock();
        let ticket = state.take_ticket();

        loop {
            if cancel.is_cancelled() {
                state.remove_waiter(ticket);
                state.cancelled_total += 1;
                tracing::debug!(
                    pool = %shared.label,
                    held = state.held,
                    waiting = state.waiters.len(),
                    "acquire cancelled"
                );
                drop(state);
                // A departing head may unblock the next waiter.
                shared.available.notify_all();
                return Err(CoordinationError::Cancelled);
            }

            if state.held < shared.capacity && shared.is_turn(&state, ticket) {
                state.remove_waiter(ticket);
                state.admit();
                let more = state.held < shared.capacity && !state.waiters.is_empty();
                tracing::debug!(
                    pool = %shared.label,
                    held = state.held,
                    capacity = shared.capacity,
                    "permit granted"
                );
                drop(state);
                if more {
                    shared.available.notify_all();
                }
                return Ok(Permit::new(self.clone()));
            }

            tracing::trace!(
                pool = %shared.label,
                held = state.held,
                waiting = state.waiters.len(),
                "waiting for permit"
            );
            shared.available.wait(&mut state);
        }
    }

    /// Take a permit only if one is free right now.
    ///
    /// Under [`WakePolicy::Fifo`] this never jumps ahead of blocked waiters.
    #[must_use]
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.shared.state.lock();
        let queue_clear = match self.shared.policy {
            WakePolicy::Fifo => state.waiters.is_empty(),
            WakePolicy::Barging => true,
        };
        if state.held < self.shared.capacity && queue_clear {
            state.admit();
            drop(state);
            Some(Permit::new(self.clone()))
        } else {
            None
        }
    }

    /// Release a permit previously detached with [`Permit::forget`].
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::ProtocolViolation`] if no detached permit is
    /// outstanding, which means the caller is releasing something it never
    /// acquired.
    pub fn release(&self) -> Result<(), CoordinationError> {
        let mut state = self.shared.state.lock();
        if state.detached == 0 {
            let held = state.held;
            drop(state);
            tracing::error!(
                pool = %self.shared.label,
                held,
                capacity = self.shared.capacity,
                "release without matching acquire"
            );
            return Err(CoordinationError::ProtocolViolation(format!(
                "release on pool `{}` without a matching acquire (held {held}/{})",
                self.shared.label, self.shared.capacity
            )));
        }
        state.detached -= 1;
        state.held -= 1;
        drop(state);
        self.shared.available.notify_all();
        Ok(())
    }

    /// Snapshot current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            capacity: self.shared.capacity,
            held: state.held,
            waiting: state.waiters.len(),
            peak_held: state.peak_held,
            admitted_total: state.admitted_total,
            cancelled_total: state.cancelled_total,
            detached: state.detached,
        }
    }

    fn detach_one(&self) {
        self.shared.state.lock().detached += 1;
    }
}

impl fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("label", &self.shared.label)
            .field("capacity", &self.shared.capacity)
            .field("policy", &self.shared.policy)
            .finish_non_exhaustive()
    }
}

/// The right to hold one unit of a pool's capacity.
///
/// Dropping the permit returns it to the pool.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    pool: ResourcePool,
    armed: bool,
}

impl Permit {
    fn new(pool: ResourcePool) -> Self {
        Self { pool, armed: true }
    }

    /// Pool this permit belongs to.
    #[must_use]
    pub const fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Return the permit to its pool.
    pub fn release(self) {
        drop(self);
    }

    /// Keep the permit held without a guard.
    ///
    /// The caller becomes responsible for a matching [`ResourcePool::release`].
    pub fn forget(mut self) {
        self.armed = false;
        self.pool.detach_one();
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.armed {
            self.pool.shared.release_guarded();
        }
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("pool", &self.pool.shared.label)
            .field("armed", &self.armed)
            .finish()
    }
}
