//! # Import Error Tests
//!
//! Recoverability, user messages and recovery suggestions for every failure kind.

use recipe_import::import_errors::{
    ImportError, ValidationError, ValidationSeverity, ValidationWarning,
};
use recipe_import::ingredient_model::ParsedIngredient;

fn network(retryable: bool, status_code: Option<u16>) -> ImportError {
    ImportError::Network {
        message: "connection reset".to_string(),
        retryable,
        status_code,
    }
}

fn every_kind() -> Vec<ImportError> {
    vec![
        ImportError::JsonParse {
            message: "expected value".to_string(),
            line: Some(3),
            column: Some(7),
        },
        ImportError::JsonInvalidSchema {
            message: "No Recipe schema found".to_string(),
        },
        ImportError::Validation {
            errors: vec![ValidationError::new("name", "Recipe name is required")],
        },
        ImportError::IngredientParse {
            failed_ingredients: vec!["a dash of magic".to_string()],
            partial_results: vec![ParsedIngredient::new("1 egg", "egg")],
            cause: "parser error".to_string(),
        },
        network(true, Some(503)),
        ImportError::SizeLimit {
            actual: 2_000_000,
            limit: 1_048_576,
            unit: "bytes".to_string(),
        },
        ImportError::Timeout {
            operation: "parse_ingredient_batch".to_string(),
            timeout_ms: 30_000,
        },
    ]
}

#[test]
fn test_recoverability_table() {
    let expected = [
        ("json_parse", true),
        ("json_invalid_schema", false),
        ("validation", true),
        ("ingredient_parse", true),
        ("network", true),
        ("size_limit", false),
        ("timeout", true),
    ];

    for (error, (kind, recoverable)) in every_kind().iter().zip(expected) {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.is_recoverable(), recoverable, "{kind}");
    }
}

#[test]
fn test_every_kind_has_a_suggestion_and_message() {
    for error in every_kind() {
        assert!(error.recovery_suggestion().is_some(), "{}", error.kind());
        assert!(!error.user_message().is_empty());
    }
}

#[test]
fn test_non_retryable_network_has_no_suggestion() {
    let error = network(false, None);
    assert!(error.is_recoverable());
    assert_eq!(error.recovery_suggestion(), None);
    assert_eq!(error.user_message(), "Network error: connection reset");

    assert_eq!(
        network(true, Some(503)).user_message(),
        "Network error (HTTP 503): connection reset"
    );
}

#[test]
fn test_json_parse_message_mentions_line_only_when_known() {
    let with_line = ImportError::JsonParse {
        message: "expected value".to_string(),
        line: Some(3),
        column: Some(7),
    };
    assert_eq!(
        with_line.user_message(),
        "Invalid JSON format at line 3: expected value"
    );

    let without_line = ImportError::JsonParse {
        message: "expected value".to_string(),
        line: None,
        column: None,
    };
    assert_eq!(without_line.user_message(), "Invalid JSON format: expected value");
    assert!(!without_line.user_message().contains("line"));
}

#[test]
fn test_messages_carry_counts_and_limits() {
    let errors = every_kind();

    assert_eq!(
        errors[2].user_message(),
        "Recipe validation failed with 1 error(s): Recipe name is required"
    );
    assert_eq!(
        errors[3].user_message(),
        "Failed to parse 1 ingredient(s); 1 ingredient(s) parsed successfully"
    );
    assert_eq!(
        errors[5].user_message(),
        "Input is too large: 2000000 bytes exceeds the limit of 1048576 bytes"
    );
    assert_eq!(
        errors[6].user_message(),
        "The operation 'parse_ingredient_batch' timed out after 30000ms"
    );
}

#[test]
fn test_severity_is_fixed_by_finding_type() {
    let error = ValidationError::new("image", "Recipe image is required");
    assert_eq!(error.severity(), ValidationSeverity::Error);

    let warning = ValidationWarning::new("recipeInstructions", "No instructions found", true);
    assert_eq!(warning.severity(), ValidationSeverity::Warning);

    let json = serde_json::to_value(&error).unwrap();
    assert!(json.get("severity").is_none());
}

#[test]
fn test_serialized_shape_is_tagged() {
    let json = serde_json::to_value(network(true, Some(429))).unwrap();
    assert_eq!(json["type"], "network");
    assert_eq!(json["retryable"], true);
    assert_eq!(json["status_code"], 429);

    let back: ImportError = serde_json::from_value(json).unwrap();
    assert_eq!(back, network(true, Some(429)));
}
