//! # Import Error Types Module
//!
//! This module defines the closed set of failures the import pipeline can report,
//! together with the field-level validation findings carried by the
//! `Validation` variant. Each failure knows whether it is recoverable, how to
//! describe itself to a user and what the user could try next.

use serde::{Deserialize, Serialize};

use crate::ingredient_model::ParsedIngredient;

/// Severity of a field-level validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    /// Blocks the import
    Error,
    /// Informational only
    Warning,
}

/// A field-level finding that blocks the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// A field-level finding that does not block the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    /// Whether the user can do something about it (e.g. add instructions by hand)
    pub actionable: bool,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn severity(&self) -> ValidationSeverity {
        ValidationSeverity::Error
    }
}

impl ValidationWarning {
    pub fn new(field: &str, message: &str, actionable: bool) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
            actionable,
        }
    }

    pub fn severity(&self) -> ValidationSeverity {
        ValidationSeverity::Warning
    }
}

/// Failures reported by the import pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportError {
    /// The input was not syntactically valid JSON
    JsonParse {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    /// Valid JSON that does not describe a Recipe
    JsonInvalidSchema { message: String },
    /// A Recipe was found but required fields are missing
    Validation { errors: Vec<ValidationError> },
    /// Some ingredient lines could not be parsed
    IngredientParse {
        failed_ingredients: Vec<String>,
        partial_results: Vec<ParsedIngredient>,
        cause: String,
    },
    /// A network collaborator failed
    Network {
        message: String,
        retryable: bool,
        status_code: Option<u16>,
    },
    /// The input exceeds a size limit
    SizeLimit { actual: u64, limit: u64, unit: String },
    /// An operation took longer than allowed
    Timeout { operation: String, timeout_ms: u64 },
}

impl ImportError {
    /// Build a `JsonParse` error carrying serde's line and column
    pub fn from_json_error(err: &serde_json::Error) -> Self {
        ImportError::JsonParse {
            message: err.to_string(),
            line: Some(err.line()).filter(|l| *l > 0),
            column: Some(err.column()).filter(|c| *c > 0),
        }
    }

    /// The snake_case tag of this variant
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::JsonParse { .. } => "json_parse",
            ImportError::JsonInvalidSchema { .. } => "json_invalid_schema",
            ImportError::Validation { .. } => "validation",
            ImportError::IngredientParse { .. } => "ingredient_parse",
            ImportError::Network { .. } => "network",
            ImportError::SizeLimit { .. } => "size_limit",
            ImportError::Timeout { .. } => "timeout",
        }
    }

    /// Whether the user can reasonably retry or continue the import
    ///
    /// A non-retryable network error is still recoverable; it just comes
    /// without a suggestion.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ImportError::JsonParse { .. } => true,
            ImportError::JsonInvalidSchema { .. } => false,
            ImportError::Validation { .. } => true,
            ImportError::IngredientParse { .. } => true,
            ImportError::Network { .. } => true,
            ImportError::SizeLimit { .. } => false,
            ImportError::Timeout { .. } => true,
        }
    }

    /// A single human-readable sentence describing the failure
    pub fn user_message(&self) -> String {
        match self {
            ImportError::JsonParse { message, line, .. } => match line {
                Some(line) => format!("Invalid JSON format at line {line}: {message}"),
                None => format!("Invalid JSON format: {message}"),
            },
            ImportError::JsonInvalidSchema { message } => {
                format!("The data is not a valid recipe: {message}")
            }
            ImportError::Validation { errors } => {
                let details = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                format!(
                    "Recipe validation failed with {} error(s): {}",
                    errors.len(),
                    details
                )
            }
            ImportError::IngredientParse {
                failed_ingredients,
                partial_results,
                ..
            } => format!(
                "Failed to parse {} ingredient(s); {} ingredient(s) parsed successfully",
                failed_ingredients.len(),
                partial_results.len()
            ),
            ImportError::Network {
                message,
                status_code,
                ..
            } => match status_code {
                Some(code) => format!("Network error (HTTP {code}): {message}"),
                None => format!("Network error: {message}"),
            },
            ImportError::SizeLimit {
                actual,
                limit,
                unit,
            } => format!("Input is too large: {actual} {unit} exceeds the limit of {limit} {unit}"),
            ImportError::Timeout {
                operation,
                timeout_ms,
            } => format!("The operation '{operation}' timed out after {timeout_ms}ms"),
        }
    }

    /// What the user could try next, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ImportError::JsonParse { .. } => {
                Some("Check that the pasted recipe data is complete and try again.")
            }
            ImportError::JsonInvalidSchema { .. } => {
                Some("Try a different recipe page, or enter the recipe manually.")
            }
            ImportError::Validation { .. } => {
                Some("Fill in the missing fields in the form and save again.")
            }
            ImportError::IngredientParse { .. } => {
                Some("Review the highlighted ingredients and edit them by hand.")
            }
            ImportError::Network { retryable, .. } => {
                retryable.then_some("Check your connection and try again.")
            }
            ImportError::SizeLimit { .. } => {
                Some("Import a smaller recipe or remove unneeded content first.")
            }
            ImportError::Timeout { .. } => {
                Some("Try again, or split the ingredient list into smaller parts.")
            }
        }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ImportError {}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::from_json_error(&err)
    }
}
