//! Builds a requester population and runs it on one OS thread per requester.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::builders::build_registry;
use crate::config::SpoolConfig;
use crate::core::{
    ArrivalSequencer, CancelToken, CoordinationError, DurationSource, EventSink, RequestOutcome,
    Requester, ResourceClassRegistry, SleepWorkload, Workload,
};
use crate::util::serde::ResourceClass;

/// Result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier for correlating logs.
    pub run_id: Uuid,
    /// One outcome per requester, sorted by sequence number.
    pub outcomes: Vec<RequestOutcome>,
    /// Wall-clock time from the first spawn to the last join.
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn new(run_id: Uuid, mut outcomes: Vec<RequestOutcome>, elapsed: Duration) -> Self {
        outcomes.sort_by_key(|outcome| outcome.request().sequence);
        Self {
            run_id,
            outcomes,
            elapsed,
        }
    }

    /// Number of requests that reached `Done`.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    /// Number of requests that were cancelled.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// Owns the shared collaborators of a run.
///
/// The registry, sequencer and sink are shared by reference with every
/// requester; the orchestrator never mutates them after construction.
pub struct Orchestrator {
    registry: Arc<ResourceClassRegistry>,
    sequencer: Arc<ArrivalSequencer>,
    sink: Arc<dyn EventSink>,
    workload: Arc<dyn Workload>,
    cancel: CancelToken,
}

impl Orchestrator {
    /// Orchestrator over `registry` that sleeps for each workload.
    pub fn new(registry: ResourceClassRegistry, sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry: Arc::new(registry),
            sequencer: Arc::new(ArrivalSequencer::new()),
            sink,
            workload: Arc::new(SleepWorkload),
            cancel: CancelToken::new(),
        }
    }

    /// Build the registry from `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] for an invalid configuration.
    pub fn from_config(
        cfg: &SpoolConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, CoordinationError> {
        Ok(Self::new(build_registry(cfg)?, sink))
    }

    /// Replace the workload collaborator.
    #[must_use]
    pub fn with_workload(mut self, workload: Arc<dyn Workload>) -> Self {
        self.workload = workload;
        self
    }

    /// Registry shared by all requesters.
    #[must_use]
    pub fn registry(&self) -> &ResourceClassRegistry {
        &self.registry
    }

    /// Sequencer shared by all requesters.
    #[must_use]
    pub fn sequencer(&self) -> &ArrivalSequencer {
        &self.sequencer
    }

    /// Token that interrupts every blocked requester of this orchestrator.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn workload(&self) -> Arc<dyn Workload> {
        Arc::clone(&self.workload)
    }

    /// Create one requester per plan entry, in plan order.
    ///
    /// Sequence numbers are drawn here, so they follow the plan. Labels are
    /// `<class>-<n>` with `n` counting from 1 within each class.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] if the plan names a class
    /// missing from the registry. Requesters already built are dropped, which
    /// withdraws their sequence numbers.
    pub fn prepare(
        &self,
        plan: &[ResourceClass],
        durations: &mut dyn DurationSource,
    ) -> Result<Vec<Requester>, CoordinationError> {
        let mut counts: BTreeMap<ResourceClass, usize> = BTreeMap::new();
        let mut requesters = Vec::with_capacity(plan.len());
        for &class in plan {
            let n = counts.entry(class).or_default();
            *n += 1;
            let requester = Requester::new(
                format!("{class}-{n}"),
                class,
                durations.workload_duration(class),
                &self.registry,
                &self.sequencer,
                Arc::clone(&self.sink),
            )?
            .with_arrival_delay(durations.arrival_delay());
            requesters.push(requester);
        }
        tracing::debug!(requesters = requesters.len(), "population prepared");
        Ok(requesters)
    }

    /// Run every requester on its own named thread and wait for all of them.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Spawn`] if a thread cannot be started and
    /// [`CoordinationError::Runtime`] if a requester thread panics. Threads that
    /// did start are still joined before returning.
    pub fn run(&self, requesters: Vec<Requester>) -> Result<RunReport, CoordinationError> {
        let run_id = Uuid::new_v4();
        let total = requesters.len();
        tracing::info!(%run_id, requesters = total, "run started");
        let started = Instant::now();

        let workload: &dyn Workload = &*self.workload;
        let cancel = &self.cancel;
        let outcomes = thread::scope(|scope| -> Result<Vec<RequestOutcome>, CoordinationError> {
            let mut handles = Vec::with_capacity(total);
            for requester in requesters {
                let handle = thread::Builder::new()
                    .name(format!("spool-req-{}", requester.sequence()))
                    .spawn_scoped(scope, move || requester.run(workload, cancel))?;
                handles.push(handle);
            }

            let mut outcomes = Vec::with_capacity(handles.len());
            let mut failure = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(outcome)) => outcomes.push(outcome),
                    Ok(Err(err)) => {
                        failure.get_or_insert(err);
                    }
                    Err(_) => {
                        failure.get_or_insert_with(|| {
                            CoordinationError::Runtime("requester thread panicked".into())
                        });
                    }
                }
            }
            failure.map_or(Ok(outcomes), Err)
        })?;

        let report = RunReport::new(run_id, outcomes, started.elapsed());
        tracing::info!(
            %run_id,
            completed = report.completed(),
            cancelled = report.cancelled(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "run finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("sequencer", &self.sequencer)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
