//! Ordering, isolation and cancellation behavior of gated classes.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use print_spool::core::{
    DurationSource, FixedDurations, InMemoryEventSink, OrderingPolicy, RequestOutcome,
    RequestState, ResourceClass, ResourceClassRegistry, SequenceNumber,
};
use print_spool::runtime::Orchestrator;

/// Later requests arrive first: delay shrinks by `step` per request.
struct ReverseArrivals {
    next_delay: Duration,
    step: Duration,
    job: Duration,
}

impl DurationSource for ReverseArrivals {
    fn workload_duration(&mut self, _class: ResourceClass) -> Duration {
        self.job
    }

    fn arrival_delay(&mut self) -> Duration {
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_sub(self.step);
        delay
    }
}

fn orchestrator(
    classes: &[(ResourceClass, u32, OrderingPolicy)],
    sink: Arc<InMemoryEventSink>,
) -> Orchestrator {
    let registry = ResourceClassRegistry::new(classes.iter().copied()).unwrap();
    Orchestrator::new(registry, sink)
}

#[test]
fn test_admission_follows_sequence_despite_reverse_arrival() {
    let sink = Arc::new(InMemoryEventSink::new(1024));
    let orch = orchestrator(
        &[(ResourceClass::Color, 2, OrderingPolicy::StrictArrivalOrder)],
        sink.clone(),
    );
    let plan = [ResourceClass::Color; 8];
    let mut durations = ReverseArrivals {
        next_delay: Duration::from_millis(80),
        step: Duration::from_millis(10),
        job: Duration::from_millis(5),
    };
    let requesters = orch.prepare(&plan, &mut durations).unwrap();
    let report = orch.run(requesters).unwrap();

    assert_eq!(report.completed(), 8);
    assert_eq!(
        sink.sequences_in(ResourceClass::Color, RequestState::Admitted),
        (1..=8).map(SequenceNumber::new).collect::<Vec<_>>()
    );
    // Arrival was reversed, so the last request started waiting first.
    let waits = sink.sequences_in(ResourceClass::Color, RequestState::AwaitingGate);
    assert_eq!(waits.first(), Some(&SequenceNumber::new(8)));
}

#[test]
fn test_no_ordering_across_classes() {
    let sink = Arc::new(InMemoryEventSink::new(1024));
    let orch = orchestrator(
        &[
            (ResourceClass::Monochrome, 1, OrderingPolicy::StrictArrivalOrder),
            (ResourceClass::Color, 1, OrderingPolicy::StrictArrivalOrder),
        ],
        sink.clone(),
    );
    let plan = [
        ResourceClass::Monochrome,
        ResourceClass::Monochrome,
        ResourceClass::Monochrome,
        ResourceClass::Color,
    ];
    let mut durations = FixedDurations::uniform(Duration::from_millis(5))
        .with(ResourceClass::Monochrome, Duration::from_millis(60));
    let requesters = orch.prepare(&plan, &mut durations).unwrap();
    let report = orch.run(requesters).unwrap();
    assert_eq!(report.completed(), 4);

    // Color #4 is not held back by monochrome #2 and #3.
    let admissions: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.state == RequestState::Admitted)
        .map(|e| e.sequence.get())
        .collect();
    let color_at = admissions.iter().position(|s| *s == 4).unwrap();
    let mono3_at = admissions.iter().position(|s| *s == 3).unwrap();
    assert!(color_at < mono3_at, "admission order {admissions:?}");
}

#[test]
fn test_cancellation_leaves_no_residue() {
    let sink = Arc::new(InMemoryEventSink::new(1024));
    let orch = orchestrator(
        &[(ResourceClass::Monochrome, 1, OrderingPolicy::StrictArrivalOrder)],
        sink.clone(),
    );
    let plan = [ResourceClass::Monochrome; 3];
    let mut durations = FixedDurations::uniform(Duration::from_millis(300));
    let requesters = orch.prepare(&plan, &mut durations).unwrap();

    let cancel = orch.cancel_token();
    let report = thread::scope(|scope| {
        scope.spawn(move || {
            thread::sleep(Duration::from_millis(60));
            cancel.cancel();
        });
        orch.run(requesters).unwrap()
    });

    assert_eq!(report.completed(), 1);
    assert_eq!(report.cancelled(), 2);
    match &report.outcomes[1] {
        RequestOutcome::Cancelled { during, .. } => {
            assert_eq!(*during, RequestState::InGateAttemptingAcquire);
        }
        other => panic!("expected #2 cancelled, got {other:?}"),
    }
    match &report.outcomes[2] {
        RequestOutcome::Cancelled { during, .. } => {
            assert_eq!(*during, RequestState::AwaitingGate);
        }
        other => panic!("expected #3 cancelled, got {other:?}"),
    }

    let entry = orch.registry().entry(ResourceClass::Monochrome).unwrap();
    let gate = entry.gate().unwrap();
    assert!(gate.pending().is_empty());
    assert_eq!(gate.cursor(), SequenceNumber::new(4));
    let stats = entry.pool().stats();
    assert_eq!(stats.held, 0);
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.admitted_total, 1);
    assert_eq!(stats.cancelled_total, 1);

    for n in 2..=3 {
        let history = sink.history(SequenceNumber::new(n));
        assert_eq!(history.last(), Some(&RequestState::Cancelled));
        assert!(!history.contains(&RequestState::Admitted));
        assert!(!history.contains(&RequestState::Released));
    }
}

#[test]
fn test_cancelled_sequence_does_not_stall_successors() {
    let sink = Arc::new(InMemoryEventSink::new(1024));
    let orch = orchestrator(
        &[(ResourceClass::Color, 1, OrderingPolicy::StrictArrivalOrder)],
        sink.clone(),
    );
    let mut requesters = orch
        .prepare(
            &[ResourceClass::Color; 4],
            &mut FixedDurations::uniform(Duration::from_millis(1)),
        )
        .unwrap();
    // #2 never runs.
    let abandoned = requesters.remove(1);
    drop(abandoned);

    let report = orch.run(requesters).unwrap();
    assert_eq!(report.completed(), 3);
    assert_eq!(
        sink.sequences_in(ResourceClass::Color, RequestState::Admitted),
        vec![
            SequenceNumber::new(1),
            SequenceNumber::new(3),
            SequenceNumber::new(4)
        ]
    );
}

#[test]
fn test_sequence_numbers_unique_across_racing_constructors() {
    let sink = Arc::new(InMemoryEventSink::new(4096));
    let orch = orchestrator(
        &[
            (ResourceClass::Monochrome, 2, OrderingPolicy::StrictArrivalOrder),
            (ResourceClass::Color, 2, OrderingPolicy::Unordered),
        ],
        sink,
    );

    let mut all: Vec<u64> = thread::scope(|scope| {
        let handles: Vec<_> = ResourceClass::ALL
            .iter()
            .flat_map(|class| [*class; 4])
            .map(|class| {
                let orch = &orch;
                scope.spawn(move || {
                    orch.prepare(
                        &[class; 25],
                        &mut FixedDurations::uniform(Duration::ZERO),
                    )
                    .unwrap()
                    .iter()
                    .map(|r| r.sequence().get())
                    .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });
    all.sort_unstable();
    assert_eq!(all, (1..=200).collect::<Vec<_>>());

    let gate_entry = orch.registry().entry(ResourceClass::Monochrome).unwrap();
    assert!(gate_entry.gate().unwrap().pending().is_empty());
}
