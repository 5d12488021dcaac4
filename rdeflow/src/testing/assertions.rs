//! Test assertions for orchestration results.

use crate::core::OrchestrationResult;

/// Asserts that the result carries `key`.
pub fn assert_has_output(result: &OrchestrationResult, key: &str) {
    assert!(
        result.outputs.contains_key(key),
        "Expected output '{}', but it's missing. Keys: {:?}",
        key,
        result.outputs.keys().collect::<Vec<_>>()
    );
}

/// Asserts that `key` holds `expected`.
pub fn assert_output_eq(result: &OrchestrationResult, key: &str, expected: &str) {
    assert_has_output(result, key);
    assert_eq!(
        result.output(key),
        Some(expected),
        "Output '{key}' has an unexpected value"
    );
}

/// Asserts that `key` is present and marked secret.
pub fn assert_secret_output(result: &OrchestrationResult, key: &str) {
    assert_has_output(result, key);
    assert!(result.is_secret(key), "Expected output '{key}' to be secret");
}

/// Asserts that no output is marked secret.
pub fn assert_no_secrets(result: &OrchestrationResult) {
    assert!(
        result.secret_outputs.is_empty(),
        "Expected no secret outputs, got {:?}",
        result.secret_outputs
    );
}
