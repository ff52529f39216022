//! Tests for configuration validation

use print_spool::config::{ClassConfig, SpoolConfig};
use print_spool::core::{OrderingPolicy, ResourceClass};
use std::time::Duration;

fn class(capacity: u32) -> ClassConfig {
    ClassConfig {
        capacity,
        policy: OrderingPolicy::StrictArrivalOrder,
        requesters: 4,
        min_duration_units: 1.0,
        max_duration_units: 2.0,
    }
}

#[test]
fn test_class_config_validation() {
    assert!(class(2).validate().is_ok());
}

#[test]
fn test_class_config_invalid_capacity() {
    assert!(class(0).validate().is_err());
}

#[test]
fn test_class_config_invalid_durations() {
    let mut cfg = class(1);
    cfg.min_duration_units = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = class(1);
    cfg.max_duration_units = f64::NAN;
    assert!(cfg.validate().is_err());

    let mut cfg = class(1);
    cfg.min_duration_units = 3.0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_spool_config_requires_classes() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::Unordered);
    cfg.classes.clear();
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("at least one"));
}

#[test]
fn test_spool_config_rejects_zero_time_unit() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::Unordered);
    cfg.time_unit_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_spool_config_from_json() {
    let json = r#"{
        "time_unit_ms": 10,
        "arrival_jitter_ms": 0,
        "seed": 7,
        "classes": {
            "monochrome": {
                "capacity": 3,
                "policy": "strict_arrival_order",
                "requesters": 6,
                "min_duration_units": 1.0,
                "max_duration_units": 3.0
            },
            "color": {
                "capacity": 2,
                "policy": "unordered",
                "requesters": 6,
                "min_duration_units": 2.0,
                "max_duration_units": 4.0
            }
        }
    }"#;

    let cfg = SpoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.seed, Some(7));
    assert_eq!(cfg.time_unit(), Duration::from_millis(10));
    assert_eq!(cfg.arrival_jitter(), Duration::ZERO);
    assert_eq!(
        cfg.classes[&ResourceClass::Color].policy,
        OrderingPolicy::Unordered
    );
    assert_eq!(cfg.total_requesters(), 12);
}

#[test]
fn test_spool_config_json_defaults() {
    let json = r#"{
        "classes": {
            "color": {
                "capacity": 1,
                "policy": "unordered",
                "min_duration_units": 1.0,
                "max_duration_units": 1.0
            }
        }
    }"#;
    let cfg = SpoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.time_unit_ms, 1000);
    assert_eq!(cfg.arrival_jitter_ms, 100);
    assert_eq!(cfg.seed, None);
    assert_eq!(cfg.classes[&ResourceClass::Color].requesters, 0);
}

#[test]
fn test_spool_config_invalid_json() {
    let err = SpoolConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));

    let err = SpoolConfig::from_json_str(r#"{ "classes": {} }"#).unwrap_err();
    assert!(err.contains("at least one"));
}

#[test]
fn test_spool_config_round_trips_through_file() {
    let cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    let path = std::env::temp_dir().join(format!("print-spool-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();

    let loaded = SpoolConfig::from_json_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, cfg);
}

#[test]
fn test_spool_config_missing_file() {
    let err = SpoolConfig::from_json_file("/definitely/not/here.json").unwrap_err();
    assert!(err.contains("cannot read"));
}

#[test]
fn test_load_keeps_per_class_policies_without_override() {
    let mut cfg = SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder);
    if let Some(color) = cfg.classes.get_mut(&ResourceClass::Color) {
        color.policy = OrderingPolicy::Unordered;
    }
    let path = std::env::temp_dir().join(format!("print-spool-mixed-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();

    let kept = SpoolConfig::load(Some(&path), None).unwrap();
    let overridden = SpoolConfig::load(Some(&path), Some(OrderingPolicy::Unordered)).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(kept, cfg);
    assert_eq!(
        kept.classes[&ResourceClass::Monochrome].policy,
        OrderingPolicy::StrictArrivalOrder
    );
    assert_eq!(
        kept.classes[&ResourceClass::Color].policy,
        OrderingPolicy::Unordered
    );
    assert!(overridden
        .classes
        .values()
        .all(|c| c.policy == OrderingPolicy::Unordered));
}

#[test]
fn test_load_without_file_defaults_to_strict() {
    let cfg = SpoolConfig::load(None, None).unwrap();
    assert_eq!(cfg, SpoolConfig::printers(OrderingPolicy::StrictArrivalOrder));

    let cfg = SpoolConfig::load(None, Some(OrderingPolicy::Unordered)).unwrap();
    assert_eq!(cfg, SpoolConfig::printers(OrderingPolicy::Unordered));
}

#[test]
fn test_oversized_duration_rejected_from_json() {
    let json = r#"{
        "classes": {
            "color": {
                "capacity": 1,
                "policy": "unordered",
                "min_duration_units": 1.0,
                "max_duration_units": 1e300
            }
        }
    }"#;
    let err = SpoolConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("not a valid duration"), "{err}");
}
