//! Tests for lifecycle event sinks

use std::sync::Arc;
use std::time::Instant;

use print_spool::core::{
    ChannelEventSink, EventSink, InMemoryEventSink, RequestState, ResourceClass, SequenceNumber,
    SinkSet, TracingEventSink, TransitionEvent,
};

fn event(class: ResourceClass, sequence: u64, state: RequestState) -> TransitionEvent {
    TransitionEvent {
        class,
        sequence: SequenceNumber::new(sequence),
        label: Arc::from(format!("{class}-{sequence}")),
        state,
        at: Instant::now(),
    }
}

#[test]
fn test_sequences_in_filters_class_and_state() {
    let sink = InMemoryEventSink::new(16);
    sink.record(&event(ResourceClass::Monochrome, 1, RequestState::Admitted));
    sink.record(&event(ResourceClass::Color, 2, RequestState::Admitted));
    sink.record(&event(ResourceClass::Monochrome, 3, RequestState::Admitted));
    sink.record(&event(ResourceClass::Monochrome, 1, RequestState::Done));

    assert_eq!(
        sink.sequences_in(ResourceClass::Monochrome, RequestState::Admitted),
        vec![SequenceNumber::new(1), SequenceNumber::new(3)]
    );
    assert_eq!(
        sink.sequences_in(ResourceClass::Color, RequestState::Done),
        Vec::<SequenceNumber>::new()
    );
}

#[test]
fn test_channel_sink_preserves_order() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = ChannelEventSink::new(tx);
    for state in [
        RequestState::Created,
        RequestState::SequenceAssigned,
        RequestState::AttemptingAcquire,
    ] {
        sink.record(&event(ResourceClass::Color, 4, state));
    }
    drop(sink);

    let states: Vec<_> = rx.iter().map(|e| e.state).collect();
    assert_eq!(
        states,
        vec![
            RequestState::Created,
            RequestState::SequenceAssigned,
            RequestState::AttemptingAcquire,
        ]
    );
}

#[test]
fn test_sink_set_with_tracing_sink() {
    let memory = Arc::new(InMemoryEventSink::new(4));
    let set = SinkSet::new()
        .with(Arc::new(TracingEventSink))
        .with(memory.clone());
    set.record(&event(ResourceClass::Monochrome, 9, RequestState::Cancelled));
    assert_eq!(
        memory.history(SequenceNumber::new(9)),
        vec![RequestState::Cancelled]
    );
}

#[test]
fn test_request_state_serde_and_display() {
    let json = serde_json::to_string(&RequestState::InGateAttemptingAcquire).unwrap();
    assert_eq!(json, "\"in_gate_attempting_acquire\"");
    assert_eq!(RequestState::InGateAttemptingAcquire.to_string(), "in_gate_attempting_acquire");
    let back: RequestState = serde_json::from_str("\"awaiting_gate\"").unwrap();
    assert_eq!(back, RequestState::AwaitingGate);
}
