//! Request lifecycle events and sinks.
//!
//! The core reports every state transition of a requester as a
//! [`TransitionEvent`]. It owns no formatting policy; sinks decide what to do
//! with events.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{ResourceClass, SequenceNumber};

/// Lifecycle state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Request constructed.
    Created,
    /// Sequence number drawn.
    SequenceAssigned,
    /// Waiting for the ordering gate.
    AwaitingGate,
    /// Inside the gate, blocked on the pool.
    InGateAttemptingAcquire,
    /// Blocked on the pool with no gate in front of it.
    AttemptingAcquire,
    /// Holding a permit.
    Admitted,
    /// Permit returned.
    Released,
    /// Finished normally.
    Done,
    /// A wait was interrupted; no permit consumed.
    Cancelled,
}

impl RequestState {
    /// Whether no further transitions follow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::SequenceAssigned => "sequence_assigned",
            Self::AwaitingGate => "awaiting_gate",
            Self::InGateAttemptingAcquire => "in_gate_attempting_acquire",
            Self::AttemptingAcquire => "attempting_acquire",
            Self::Admitted => "admitted",
            Self::Released => "released",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One observed state transition.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    /// Resource class of the request.
    pub class: ResourceClass,
    /// Arrival sequence number.
    pub sequence: SequenceNumber,
    /// Human-readable requester name.
    pub label: Arc<str>,
    /// State entered.
    pub state: RequestState,
    /// When the transition happened.
    pub at: Instant,
}

/// Receiver of lifecycle events.
///
/// Called from requester threads, so implementations must be cheap and must
/// never block on coordination state.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &TransitionEvent);
}

/// Structured `tracing` output for every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &TransitionEvent) {
        match event.state {
            RequestState::Admitted | RequestState::Released | RequestState::Done => {
                tracing::info!(
                    class = %event.class,
                    sequence = event.sequence.get(),
                    requester = %event.label,
                    state = %event.state,
                    "transition"
                );
            }
            RequestState::Cancelled => {
                tracing::warn!(
                    class = %event.class,
                    sequence = event.sequence.get(),
                    requester = %event.label,
                    "request cancelled"
                );
            }
            _ => {
                tracing::debug!(
                    class = %event.class,
                    sequence = event.sequence.get(),
                    requester = %event.label,
                    state = %event.state,
                    "transition"
                );
            }
        }
    }
}

/// Bounded in-memory buffer for tests and inspection.
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<TransitionEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink that keeps the most recent `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Snapshot of stored events in record order.
    #[must_use]
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Sequence numbers that entered `state`, in record order.
    #[must_use]
    pub fn sequences_in(&self, class: ResourceClass, state: RequestState) -> Vec<SequenceNumber> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.class == class && e.state == state)
            .map(|e| e.sequence)
            .collect()
    }

    /// Every state `sequence` passed through, in order.
    #[must_use]
    pub fn history(&self, sequence: SequenceNumber) -> Vec<RequestState> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.sequence == sequence)
            .map(|e| e.state)
            .collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: &TransitionEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Forwards events over a channel, e.g. to a console printer thread.
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: Sender<TransitionEvent>,
}

impl ChannelEventSink {
    /// Wrap the sending half of a channel.
    #[must_use]
    pub const fn new(tx: Sender<TransitionEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn record(&self, event: &TransitionEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Fan-out to several sinks in order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for SinkSet {
    fn record(&self, event: &TransitionEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
