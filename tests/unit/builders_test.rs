//! Tests for builder modules

use print_spool::builders::{build_durations, build_plan, build_registry};
use print_spool::config::SpoolConfig;
use print_spool::core::{
    CoordinationError, DurationSource, OrderingPolicy, ResourceClass, WakePolicy,
};
use std::time::Duration;

#[test]
fn test_build_registry_from_printers() {
    let cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    let registry = build_registry(&cfg).unwrap();

    let mono = registry.entry(ResourceClass::Monochrome).unwrap();
    assert_eq!(mono.pool().capacity(), 3);
    assert_eq!(mono.pool().wake_policy(), WakePolicy::Fifo);
    assert!(mono.gate().is_some());

    let color = registry.entry(ResourceClass::Color).unwrap();
    assert_eq!(color.pool().capacity(), 2);
}

#[test]
fn test_build_registry_unordered_has_no_gate() {
    let cfg = SpoolConfig::printers(OrderingPolicy::Unordered);
    let registry = build_registry(&cfg).unwrap();
    for class in ResourceClass::ALL {
        let entry = registry.entry(class).unwrap();
        assert!(entry.gate().is_none());
        assert_eq!(entry.pool().wake_policy(), WakePolicy::Barging);
    }
}

#[test]
fn test_build_registry_rejects_invalid_config() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::Unordered);
    if let Some(mono) = cfg.classes.get_mut(&ResourceClass::Monochrome) {
        mono.capacity = 0;
    }
    let err = build_registry(&cfg).unwrap_err();
    assert!(matches!(err, CoordinationError::Configuration(_)));
}

#[test]
fn test_build_plan_groups_classes() {
    let cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    let plan = build_plan(&cfg);
    assert_eq!(plan.len(), 12);
    assert!(plan[..6].iter().all(|c| *c == ResourceClass::Monochrome));
    assert!(plan[6..].iter().all(|c| *c == ResourceClass::Color));
}

#[test]
fn test_build_durations_respects_ranges() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    cfg.seed = Some(11);
    cfg.time_unit_ms = 10;
    cfg.arrival_jitter_ms = 5;

    let mut durations = build_durations(&cfg).unwrap();
    for _ in 0..100 {
        let mono = durations.workload_duration(ResourceClass::Monochrome);
        assert!(mono >= Duration::from_millis(10) && mono <= Duration::from_millis(30));
        let color = durations.workload_duration(ResourceClass::Color);
        assert!(color >= Duration::from_millis(20) && color <= Duration::from_millis(40));
        assert!(durations.arrival_delay() <= Duration::from_millis(5));
    }
}

#[test]
fn test_build_durations_seed_is_reproducible() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::Unordered);
    cfg.seed = Some(42);

    let mut a = build_durations(&cfg).unwrap();
    let mut b = build_durations(&cfg).unwrap();
    for class in [ResourceClass::Color, ResourceClass::Monochrome, ResourceClass::Color] {
        assert_eq!(a.workload_duration(class), b.workload_duration(class));
        assert_eq!(a.arrival_delay(), b.arrival_delay());
    }
}

#[test]
fn test_build_durations_rejects_unrepresentable_bound() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    if let Some(color) = cfg.classes.get_mut(&ResourceClass::Color) {
        color.max_duration_units = 1e300;
    }
    let err = build_durations(&cfg).unwrap_err();
    assert!(matches!(err, CoordinationError::Configuration(_)));
    assert!(err.to_string().contains("color"));
}
