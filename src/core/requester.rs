//! One demand for a printer and its acquire -> hold -> release lifecycle.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::{
    ArrivalSequencer, CancelToken, CoordinationError, EventSink, GateTicket, OrderingGate,
    RequestState, ResourceClassRegistry, ResourcePool, SequenceNumber, TransitionEvent, Workload,
};
use crate::util::serde::ResourceClass;

/// Immutable description of one print request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Arrival order.
    pub sequence: SequenceNumber,
    /// Printer class requested.
    pub class: ResourceClass,
    /// How long the permit is held once admitted.
    pub workload_duration: Duration,
}

/// How a requester run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Admitted, served, released.
    Completed {
        /// The request.
        request: Request,
        /// Time from the start of the run to admission.
        waited: Duration,
        /// Time the permit was held.
        held: Duration,
    },
    /// A wait was interrupted before admission; nothing was released.
    Cancelled {
        /// The request.
        request: Request,
        /// State the request was blocked in.
        during: RequestState,
    },
}

impl RequestOutcome {
    /// The request this outcome belongs to.
    #[must_use]
    pub const fn request(&self) -> &Request {
        match self {
            Self::Completed { request, .. } | Self::Cancelled { request, .. } => request,
        }
    }

    /// Whether the request reached `Done`.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

enum Admission {
    Gated { gate: OrderingGate, ticket: GateTicket },
    Direct { pool: ResourcePool },
}

struct Reporter {
    sink: Arc<dyn EventSink>,
    label: Arc<str>,
    class: ResourceClass,
    sequence: SequenceNumber,
}

impl Reporter {
    fn emit(&self, state: RequestState) {
        self.sink.record(&TransitionEvent {
            class: self.class,
            sequence: self.sequence,
            label: Arc::clone(&self.label),
            state,
            at: Instant::now(),
        });
    }
}

/// A unit of concurrent execution competing for one permit.
///
/// The sequence number is drawn when the requester is constructed; for strict
/// classes it is drawn through the class gate so the gate knows every number it
/// must wait for.
pub struct Requester {
    request: Request,
    arrival_delay: Duration,
    admission: Admission,
    reporter: Reporter,
}

impl Requester {
    /// Create a requester, assigning its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] if `class` is not in the
    /// registry.
    pub fn new(
        label: impl Into<Arc<str>>,
        class: ResourceClass,
        workload_duration: Duration,
        registry: &ResourceClassRegistry,
        sequencer: &ArrivalSequencer,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, CoordinationError> {
        let (pool, gate) = registry.resolve(class)?;
        let (sequence, admission) = match gate {
            Some(gate) => {
                let ticket = gate.register(sequencer);
                (ticket.sequence(), Admission::Gated { gate, ticket })
            }
            None => (sequencer.next(), Admission::Direct { pool }),
        };

        let reporter = Reporter {
            sink,
            label: label.into(),
            class,
            sequence,
        };
        reporter.emit(RequestState::Created);
        reporter.emit(RequestState::SequenceAssigned);

        Ok(Self {
            request: Request {
                sequence,
                class,
                workload_duration,
            },
            arrival_delay: Duration::ZERO,
            admission,
            reporter,
        })
    }

    /// Pause for `delay` at the start of [`run`](Self::run), before competing.
    #[must_use]
    pub const fn with_arrival_delay(mut self, delay: Duration) -> Self {
        self.arrival_delay = delay;
        self
    }

    /// The request being served.
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Assigned sequence number.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber {
        self.request.sequence
    }

    /// Requester name used in events.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.reporter.label
    }

    /// Drive the request to completion or cancellation.
    ///
    /// Under strict ordering the gate is held only while acquiring; it is left
    /// as soon as the permit is granted, before the workload runs.
    ///
    /// # Errors
    ///
    /// Cancellation is not an error; it yields [`RequestOutcome::Cancelled`].
    /// Any other coordination failure is returned as is.
    pub fn run(
        self,
        workload: &dyn Workload,
        cancel: &CancelToken,
    ) -> Result<RequestOutcome, CoordinationError> {
        let Self {
            request,
            arrival_delay,
            admission,
            reporter,
        } = self;
        let started = Instant::now();

        if !arrival_delay.is_zero() {
            std::thread::sleep(arrival_delay);
        }

        let permit = match admission {
            Admission::Gated { gate, ticket } => {
                reporter.emit(RequestState::AwaitingGate);
                let mut pass = match gate.enter(ticket, cancel) {
                    Ok(pass) => pass,
                    Err(err) => {
                        return cancelled(&reporter, request, RequestState::AwaitingGate, err);
                    }
                };
                reporter.emit(RequestState::InGateAttemptingAcquire);
                match pass.acquire(cancel) {
                    Ok(permit) => {
                        // Reported before leaving so the event order matches
                        // the admission order.
                        reporter.emit(RequestState::Admitted);
                        pass.exit();
                        permit
                    }
                    Err(err) => {
                        pass.exit();
                        return cancelled(
                            &reporter,
                            request,
                            RequestState::InGateAttemptingAcquire,
                            err,
                        );
                    }
                }
            }
            Admission::Direct { pool } => {
                reporter.emit(RequestState::AttemptingAcquire);
                match pool.acquire(cancel) {
                    Ok(permit) => {
                        reporter.emit(RequestState::Admitted);
                        permit
                    }
                    Err(err) => {
                        return cancelled(&reporter, request, RequestState::AttemptingAcquire, err);
                    }
                }
            }
        };

        let admitted = Instant::now();
        workload.run(request.workload_duration);
        permit.release();
        let released = Instant::now();
        reporter.emit(RequestState::Released);
        reporter.emit(RequestState::Done);

        Ok(RequestOutcome::Completed {
            request,
            waited: admitted.duration_since(started),
            held: released.duration_since(admitted),
        })
    }
}

fn cancelled(
    reporter: &Reporter,
    request: Request,
    during: RequestState,
    err: CoordinationError,
) -> Result<RequestOutcome, CoordinationError> {
    if !err.is_cancelled() {
        return Err(err);
    }
    reporter.emit(RequestState::Cancelled);
    Ok(RequestOutcome::Cancelled { request, during })
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("label", &self.reporter.label)
            .field("request", &self.request)
            .field("arrival_delay", &self.arrival_delay)
            .finish_non_exhaustive()
    }
}
