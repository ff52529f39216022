//! Strict arrival-order admission in front of a [`ResourcePool`].
//!
//! The gate serializes only the *attempt* to acquire a permit. A request with
//! sequence number `S` may enter when the gate's cursor equals `S`; it then
//! calls `pool.acquire()` while holding its [`GatePass`] and drops the pass as
//! soon as the permit is granted. The hold-and-release phase runs outside the
//! gate, so class-mates still share the pool up to its capacity.
//!
//! Because attempts are made one at a time in sequence order and the pool is
//! FIFO, admission order equals sequence order.
//!
//! # Registration
//!
//! Sequence numbers are global across classes, so a gate cannot assume its
//! requests are contiguous. A request therefore draws its number *through*
//! [`OrderingGate::register`], which takes the number and records it as pending
//! in one step under the gate lock. The cursor is always the smallest pending
//! number.
//!
//! # Cursor advancement
//!
//! The cursor moves whenever a number leaves the pending set, no matter why:
//! admission, cancellation inside the gate, cancellation while queued, or a
//! ticket dropped without ever entering. A cancelled request can never strand
//! the numbers behind it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::core::{
    ArrivalSequencer, CancelToken, CoordinationError, Permit, ResourcePool, SequenceNumber,
    WakePolicy,
};

#[derive(Debug)]
struct GateState {
    pending: BTreeSet<SequenceNumber>,
    cursor: SequenceNumber,
    high_water: Option<SequenceNumber>,
    occupant: Option<SequenceNumber>,
    passed_total: u64,
    withdrawn_total: u64,
}

impl GateState {
    const fn new() -> Self {
        Self {
            pending: BTreeSet::new(),
            cursor: SequenceNumber::FIRST,
            high_water: None,
            occupant: None,
            passed_total: 0,
            withdrawn_total: 0,
        }
    }

    fn advance_cursor(&mut self) {
        let next = self
            .pending
            .first()
            .copied()
            .or_else(|| self.high_water.map(SequenceNumber::next))
            .unwrap_or(self.cursor);
        debug_assert!(next >= self.cursor, "gate cursor regressed");
        self.cursor = next.max(self.cursor);
    }
}

struct GateShared {
    label: String,
    state: Mutex<GateState>,
    turn: Condvar,
}

impl GateShared {
    /// Remove `sequence` from the pending set and let the next request in.
    fn leave(&self, sequence: SequenceNumber, admitted: bool) {
        let mut state = self.state.lock();
        if !state.pending.remove(&sequence) {
            return;
        }
        if state.occupant == Some(sequence) {
            state.occupant = None;
        }
        if admitted {
            state.passed_total += 1;
        } else {
            state.withdrawn_total += 1;
        }
        state.advance_cursor();
        tracing::debug!(
            gate = %self.label,
            sequence = sequence.get(),
            cursor = state.cursor.get(),
            admitted,
            "left gate"
        );
        drop(state);
        self.turn.notify_all();
    }
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    /// Sequence number allowed to attempt admission next.
    pub cursor: SequenceNumber,
    /// Registered requests that have not yet left the gate.
    pub pending: usize,
    /// Request currently attempting to acquire, if any.
    pub occupant: Option<SequenceNumber>,
    /// Requests that left after being admitted to the pool.
    pub passed_total: u64,
    /// Requests that left without admission.
    pub withdrawn_total: u64,
}

/// Ordering wrapper enforcing sequence-number order of pool admission.
///
/// Cloning is cheap and yields a handle to the same gate.
#[derive(Clone)]
pub struct OrderingGate {
    shared: Arc<GateShared>,
    pool: ResourcePool,
}

impl OrderingGate {
    /// Put a gate in front of `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] unless the pool wakes waiters
    /// in FIFO order; an unfair pool would only preserve attempt order, not
    /// admission order.
    pub fn new(pool: ResourcePool) -> Result<Self, CoordinationError> {
        if pool.wake_policy() != WakePolicy::Fifo {
            return Err(CoordinationError::Configuration(format!(
                "ordering gate for `{}` requires a FIFO pool",
                pool.label()
            )));
        }
        Ok(Self {
            shared: Arc::new(GateShared {
                label: pool.label().to_string(),
                state: Mutex::new(GateState::new()),
                turn: Condvar::new(),
            }),
            pool,
        })
    }

    /// Pool guarded by this gate.
    #[must_use]
    pub const fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Draw a sequence number from `sequencer` and reserve its place in line.
    pub fn register(&self, sequencer: &ArrivalSequencer) -> GateTicket {
        let mut state = self.shared.state.lock();
        let sequence = sequencer.next();
        state.pending.insert(sequence);
        state.high_water = Some(sequence);
        state.advance_cursor();
        tracing::trace!(
            gate = %self.shared.label,
            sequence = sequence.get(),
            cursor = state.cursor.get(),
            "registered"
        );
        drop(state);
        GateTicket {
            shared: Arc::clone(&self.shared),
            sequence,
            armed: true,
        }
    }

    /// Block until it is `ticket`'s turn, then enter the gate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Cancelled`] if `cancel` fires first; the
    /// ticket is withdrawn and the cursor advances past it.
    pub fn enter(
        &self,
        mut ticket: GateTicket,
        cancel: &CancelToken,
    ) -> Result<GatePass, CoordinationError> {
        if !Arc::ptr_eq(&ticket.shared, &self.shared) {
            return Err(CoordinationError::Configuration(format!(
                "ticket {} was issued by a different gate",
                ticket.sequence
            )));
        }
        ticket.armed = false;
        let sequence = ticket.sequence;

        let hook_target = Arc::clone(&self.shared);
        let _registration = cancel.on_cancel(move || {
            let _state = hook_target.state.lock();
            hook_target.turn.notify_all();
        });

        let mut state = self.shared.state.lock();
        loop {
            if cancel.is_cancelled() {
                drop(state);
                tracing::debug!(
                    gate = %self.shared.label,
                    sequence = sequence.get(),
                    "gate wait cancelled"
                );
                self.shared.leave(sequence, false);
                return Err(CoordinationError::Cancelled);
            }
            if state.cursor == sequence {
                debug_assert!(state.occupant.is_none(), "two requests inside the gate");
                state.occupant = Some(sequence);
                break;
            }
            self.shared.turn.wait(&mut state);
        }
        drop(state);

        Ok(GatePass {
            shared: Arc::clone(&self.shared),
            pool: self.pool.clone(),
            sequence,
            admitted: false,
        })
    }

    /// Enter, acquire a permit, and leave the gate in one call.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Cancelled`] if `cancel` fires during either
    /// wait.
    pub fn admit(
        &self,
        ticket: GateTicket,
        cancel: &CancelToken,
    ) -> Result<Permit, CoordinationError> {
        let mut pass = self.enter(ticket, cancel)?;
        let permit = pass.acquire(cancel);
        pass.exit();
        permit
    }

    /// Sequence number allowed to attempt admission next.
    #[must_use]
    pub fn cursor(&self) -> SequenceNumber {
        self.shared.state.lock().cursor
    }

    /// Registered sequence numbers that have not yet left, in order.
    #[must_use]
    pub fn pending(&self) -> Vec<SequenceNumber> {
        self.shared.state.lock().pending.iter().copied().collect()
    }

    /// Snapshot current counters.
    #[must_use]
    pub fn stats(&self) -> GateStats {
        let state = self.shared.state.lock();
        GateStats {
            cursor: state.cursor,
            pending: state.pending.len(),
            occupant: state.occupant,
            passed_total: state.passed_total,
            withdrawn_total: state.withdrawn_total,
        }
    }
}

impl fmt::Debug for OrderingGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingGate")
            .field("label", &self.shared.label)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// A registered place in a gate's line.
///
/// Dropping an unused ticket withdraws it so later requests are not blocked.
pub struct GateTicket {
    shared: Arc<GateShared>,
    sequence: SequenceNumber,
    armed: bool,
}

impl GateTicket {
    /// Sequence number drawn at registration.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        self.sequence
    }
}

impl Drop for GateTicket {
    fn drop(&mut self) {
        if self.armed {
            self.shared.leave(self.sequence, false);
        }
    }
}

impl fmt::Debug for GateTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateTicket")
            .field("gate", &self.shared.label)
            .field("sequence", &self.sequence)
            .field("armed", &self.armed)
            .finish()
    }
}

/// Exclusive occupancy of a gate while attempting admission.
///
/// Dropping the pass lets the next sequence number in, whether or not a permit
/// was granted.
#[must_use = "dropping the pass leaves the gate immediately"]
pub struct GatePass {
    shared: Arc<GateShared>,
    pool: ResourcePool,
    sequence: SequenceNumber,
    admitted: bool,
}

impl GatePass {
    /// Sequence number of the request inside the gate.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Attempt to acquire from the guarded pool while inside the gate.
    ///
    /// The pass should be dropped as soon as this returns, so the gate covers
    /// the admission attempt and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Cancelled`] if `cancel` fires while blocked
    /// on the pool.
    pub fn acquire(&mut self, cancel: &CancelToken) -> Result<Permit, CoordinationError> {
        let result = self.pool.acquire(cancel);
        self.admitted |= result.is_ok();
        result
    }

    /// Leave the gate.
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for GatePass {
    fn drop(&mut self) {
        self.shared.leave(self.sequence, self.admitted);
    }
}

impl fmt::Debug for GatePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatePass")
            .field("gate", &self.shared.label)
            .field("sequence", &self.sequence)
            .field("admitted", &self.admitted)
            .finish_non_exhaustive()
    }
}
