//! Tests for shared identifiers and telemetry

use print_spool::util::{init_tracing, OrderingPolicy, ResourceClass};

#[test]
fn test_resource_class_parsing() {
    assert_eq!("monochrome".parse::<ResourceClass>(), Ok(ResourceClass::Monochrome));
    assert_eq!(" BW ".parse::<ResourceClass>(), Ok(ResourceClass::Monochrome));
    assert_eq!("Colour".parse::<ResourceClass>(), Ok(ResourceClass::Color));
    assert!("sepia".parse::<ResourceClass>().is_err());
}

#[test]
fn test_resource_class_display_pads() {
    assert_eq!(format!("{:<12}|", ResourceClass::Color), "color       |");
    assert_eq!(ResourceClass::Monochrome.as_str(), "monochrome");
}

#[test]
fn test_policy_serde() {
    let json = serde_json::to_string(&OrderingPolicy::StrictArrivalOrder).unwrap();
    assert_eq!(json, "\"strict_arrival_order\"");
    let policy: OrderingPolicy = serde_json::from_str("\"unordered\"").unwrap();
    assert_eq!(policy, OrderingPolicy::Unordered);
    assert_eq!(OrderingPolicy::Unordered.to_string(), "unordered");
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing("debug");
    init_tracing("info");
    tracing::info!("tracing initialised twice without panicking");
}
