//! Runs a requester population on the tokio blocking pool.
//!
//! Requesters block on `parking_lot` primitives, so each one goes to
//! [`tokio::task::spawn_blocking`]. Strict classes need every registered
//! requester to make progress; the population must not exceed the runtime's
//! blocking thread limit.

use std::time::Instant;

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::core::{CoordinationError, RequestOutcome, Requester};
use crate::runtime::{Orchestrator, RunReport};

/// Async counterpart of [`Orchestrator::run`].
///
/// # Errors
///
/// Returns [`CoordinationError::Runtime`] if a blocking task panics or is
/// aborted. Remaining tasks are still awaited.
pub async fn run_on_tokio(
    orchestrator: &Orchestrator,
    requesters: Vec<Requester>,
) -> Result<RunReport, CoordinationError> {
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, requesters = requesters.len(), "tokio run started");
    let started = Instant::now();

    let mut tasks: JoinSet<Result<RequestOutcome, CoordinationError>> = JoinSet::new();
    for requester in requesters {
        let workload = orchestrator.workload();
        let cancel = orchestrator.cancel_token();
        tasks.spawn_blocking(move || requester.run(&*workload, &cancel));
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(err)) => {
                failure.get_or_insert(err);
            }
            Err(join_err) => {
                failure.get_or_insert_with(|| {
                    CoordinationError::Runtime(format!("requester task failed: {join_err}"))
                });
            }
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    let report = RunReport::new(run_id, outcomes, started.elapsed());
    tracing::info!(%run_id, completed = report.completed(), "tokio run finished");
    Ok(report)
}
