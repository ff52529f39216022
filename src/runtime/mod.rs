//! Drivers that run a population of requesters to completion.

pub mod orchestrator;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_runner;

pub use orchestrator::{Orchestrator, RunReport};
#[cfg(feature = "tokio-runtime")]
pub use tokio_runner::run_on_tokio;
