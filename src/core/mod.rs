//! Admission primitives: sequencing, pools, gates, and the requester lifecycle.

pub mod cancel;
pub mod error;
pub mod events;
pub mod ordering_gate;
pub mod registry;
pub mod requester;
pub mod resource_pool;
pub mod sequencer;
pub mod workload;

pub use crate::util::serde::{OrderingPolicy, ResourceClass};
pub use cancel::CancelToken;
pub use error::{AppResult, CoordinationError};
pub use events::{
    ChannelEventSink, EventSink, InMemoryEventSink, RequestState, SinkSet, TracingEventSink,
    TransitionEvent,
};
pub use ordering_gate::{GatePass, GateStats, GateTicket, OrderingGate};
pub use registry::{ClassEntry, ResourceClassRegistry};
pub use requester::{Request, RequestOutcome, Requester};
pub use resource_pool::{Permit, PoolStats, ResourcePool, WakePolicy};
pub use sequencer::{ArrivalSequencer, SequenceNumber};
pub use workload::{
    DurationRange, DurationSource, FixedDurations, SeededDurations, SleepWorkload, Workload,
};
