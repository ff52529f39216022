//! Builders to construct admission components from configuration.

pub mod registry_builder;

pub use registry_builder::{build_durations, build_plan, build_registry};
