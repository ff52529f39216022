//! Builders to construct the class registry and timing sources from configuration.

use crate::config::SpoolConfig;
use crate::core::{CoordinationError, DurationRange, ResourceClassRegistry, SeededDurations};
use crate::util::serde::ResourceClass;

/// Build the resource class registry described by `cfg`.
///
/// # Errors
///
/// Returns [`CoordinationError::Configuration`] when `cfg` fails validation.
pub fn build_registry(cfg: &SpoolConfig) -> Result<ResourceClassRegistry, CoordinationError> {
    cfg.validate()
        .map_err(|e| CoordinationError::Configuration(format!("config invalid: {e}")))?;

    ResourceClassRegistry::new(
        cfg.classes
            .iter()
            .map(|(class, class_cfg)| (*class, class_cfg.capacity, class_cfg.policy)),
    )
}

/// Seeded duration source with the configured per-class ranges and jitter.
///
/// An absent seed draws one from the OS.
///
/// # Errors
///
/// Returns [`CoordinationError::Configuration`] when a duration bound does not
/// fit in a `Duration`.
pub fn build_durations(cfg: &SpoolConfig) -> Result<SeededDurations, CoordinationError> {
    let mut durations = cfg
        .seed
        .map_or_else(SeededDurations::from_os_rng, SeededDurations::new)
        .with_arrival_jitter(cfg.arrival_jitter());

    for (class, class_cfg) in &cfg.classes {
        let bound = |units: f64| {
            cfg.duration_of(units).map_err(|e| {
                CoordinationError::Configuration(format!("class `{class}` invalid: {e}"))
            })
        };
        durations = durations.with_range(
            *class,
            DurationRange::new(
                bound(class_cfg.min_duration_units)?,
                bound(class_cfg.max_duration_units)?,
            ),
        );
    }
    Ok(durations)
}

/// Arrival plan: every requester of the first class, then the next class.
///
/// Requesters built from this plan draw contiguous sequence numbers per class.
#[must_use]
pub fn build_plan(cfg: &SpoolConfig) -> Vec<ResourceClass> {
    cfg.classes
        .iter()
        .flat_map(|(class, class_cfg)| std::iter::repeat_n(*class, class_cfg.requesters))
        .collect()
}
