//! # Print Spool
//!
//! Capacity-bounded admission to shared printers, with an optional strict
//! arrival-order guarantee per printer class.
//!
//! Each printer class owns a [`ResourcePool`](core::ResourcePool) of fixed
//! capacity. Under [`OrderingPolicy::StrictArrivalOrder`](core::OrderingPolicy)
//! the pool sits behind an [`OrderingGate`](core::OrderingGate): requests draw
//! a sequence number when they are created and are admitted in exactly that
//! order, however the OS schedules their threads. Under
//! [`OrderingPolicy::Unordered`](core::OrderingPolicy) the first thread to see a
//! free printer takes it.
//!
//! Only the admission attempt is serialized. Once a request holds a permit it
//! leaves the gate, so up to `capacity` class-mates print concurrently.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use print_spool::builders::{build_durations, build_plan};
//! use print_spool::config::SpoolConfig;
//! use print_spool::core::{OrderingPolicy, TracingEventSink};
//! use print_spool::runtime::Orchestrator;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
//! let orchestrator = Orchestrator::from_config(&cfg, Arc::new(TracingEventSink))?;
//! let requesters = orchestrator.prepare(&build_plan(&cfg), &mut build_durations(&cfg)?)?;
//! let report = orchestrator.run(requesters)?;
//! assert_eq!(report.completed(), 12);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving primitives directly
//!
//! ```rust
//! use print_spool::core::{
//!     ArrivalSequencer, CancelToken, OrderingGate, ResourcePool, WakePolicy,
//! };
//!
//! # fn main() -> Result<(), print_spool::core::CoordinationError> {
//! let pool = ResourcePool::new("color", 2, WakePolicy::Fifo)?;
//! let gate = OrderingGate::new(pool.clone())?;
//! let sequencer = ArrivalSequencer::new();
//!
//! let ticket = gate.register(&sequencer);
//! let permit = gate.admit(ticket, &CancelToken::new())?;
//! assert_eq!(pool.stats().held, 1);
//! drop(permit);
//! assert_eq!(pool.stats().held, 0);
//! # Ok(())
//! # }
//! ```
//!
//! For end-to-end runs, see `tests/admission_scenario_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Admission primitives and the requester lifecycle.
pub mod core;
/// Configuration models for printer classes and timing.
pub mod config;
/// Builders to construct admission components from configuration.
pub mod builders;
/// Drivers that run requesters to completion.
pub mod runtime;
/// Shared utilities.
pub mod util;
