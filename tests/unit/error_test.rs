//! Tests for error types

use print_spool::core::CoordinationError;

#[test]
fn test_configuration_error() {
    let err = CoordinationError::Configuration("capacity must be positive".to_string());
    assert_eq!(
        format!("{err}"),
        "configuration error: capacity must be positive"
    );
    assert!(!err.is_cancelled());
}

#[test]
fn test_cancelled_error() {
    let err = CoordinationError::Cancelled;
    assert_eq!(format!("{err}"), "wait cancelled");
    assert!(err.is_cancelled());
}

#[test]
fn test_protocol_violation_error() {
    let err = CoordinationError::ProtocolViolation("release without acquire".to_string());
    assert_eq!(
        format!("{err}"),
        "protocol violation: release without acquire"
    );
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::other("no threads left");
    let err: CoordinationError = io.into();
    assert!(matches!(err, CoordinationError::Spawn(_)));
    assert_eq!(format!("{err}"), "failed to spawn requester: no threads left");
}

#[test]
fn test_errors_convert_to_anyhow() {
    fn fails() -> print_spool::core::AppResult<()> {
        Err(CoordinationError::Runtime("join failed".into()))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert_eq!(err.to_string(), "runtime error: join failed");
    assert!(err.downcast_ref::<CoordinationError>().is_some());
}
