//! Configuration models for printer classes and run timing.

pub mod spool;

pub use spool::{ClassConfig, SpoolConfig};
