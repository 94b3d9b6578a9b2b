//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::temporal::TemporalError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Policy not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Policy not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("INR".to_string(), "USD".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
    assert!(core_error.to_string().contains("INR"));
}

#[test]
fn test_core_error_from_temporal_error() {
    let temporal = TemporalError::InvalidPeriod {
        start: "a".to_string(),
        end: "b".to_string(),
    };
    let core_error: CoreError = temporal.into();
    assert!(matches!(core_error, CoreError::Temporal(_)));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("PAYOUT_CLIENT_ID missing");

    match error {
        CoreError::Configuration(msg) => assert!(msg.contains("PAYOUT_CLIENT_ID")),
        _ => panic!("Expected Configuration error"),
    }
}
