//! # Parsed Ingredient Data Model
//!
//! This module defines the structured form of a single ingredient line as it moves
//! through the import pipeline, plus the normalization step that every parsed
//! ingredient goes through before it is formatted or stored.
//!
//! ## Core Concepts
//!
//! - **Original text**: the raw line, never discarded
//! - **Quantity / unit**: optional, the unit is raw or canonical depending on stage
//! - **Metric amount**: filled only when a volume or weight conversion exists
//! - **Confidence**: how sure the parser was, 1.0 for manual or user entries
//!
//! ## Usage
//!
//! ```rust
//! use recipe_import::ingredient_model::{ParsedIngredient, ParsingMethod};
//!
//! let butter = ParsedIngredient::new("2 tbsp butter, softened", "butter")
//!     .with_quantity(2.0)
//!     .with_unit("tbsp")
//!     .with_preparation("softened")
//!     .with_method(ParsingMethod::Ai)
//!     .with_confidence(0.92);
//!
//! assert!(!butter.requires_manual_review);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::{normalize_unit, to_metric, MetricAmount};

/// How an ingredient's structure was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsingMethod {
    /// Structured by the external AI or rule-based batch parser
    Ai,
    /// Typed by hand and heuristically split
    Manual,
    /// Entered field-by-field by the user
    User,
}

/// One structured ingredient line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIngredient {
    /// The raw line this ingredient was parsed from
    pub original_text: String,

    pub quantity: Option<f64>,

    /// Unit token, raw before normalization and canonical afterwards
    pub unit: Option<String>,

    /// The ingredient name (e.g., "flour", "unsalted butter")
    pub ingredient: String,

    /// Preparation notes (e.g., "softened", "finely chopped")
    pub preparation: Option<String>,

    /// Metric equivalent, present only when a conversion exists
    pub metric: Option<MetricAmount>,

    /// Confidence in the parse (0.0 to 1.0)
    pub confidence: f32,

    pub parsing_method: ParsingMethod,

    pub requires_manual_review: bool,
}

impl ParsedIngredient {
    /// Create an ingredient with just its original text and name
    ///
    /// Defaults to a user-entered, fully trusted ingredient.
    pub fn new(original_text: &str, ingredient: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            quantity: None,
            unit: None,
            ingredient: ingredient.to_string(),
            preparation: None,
            metric: None,
            confidence: 1.0,
            parsing_method: ParsingMethod::User,
            requires_manual_review: false,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_preparation(mut self, preparation: &str) -> Self {
        self.preparation = Some(preparation.to_string());
        self
    }

    pub fn with_metric(mut self, metric: MetricAmount) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_method(mut self, method: ParsingMethod) -> Self {
        self.parsing_method = method;
        self
    }

    /// Set the confidence level, clamped to [0, 1]
    ///
    /// Review flagging against the configured threshold happens in
    /// [`normalize_parsed_ingredient`].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_manual_review(mut self, required: bool) -> Self {
        self.requires_manual_review = required;
        self
    }

    /// Whether the structure came from a person rather than a parser
    pub fn is_user_authored(&self) -> bool {
        matches!(
            self.parsing_method,
            ParsingMethod::Manual | ParsingMethod::User
        )
    }
}

/// Bring a parsed ingredient into its canonical stored shape
///
/// - the unit is replaced by its canonical token (absent stays absent)
/// - a metric amount is derived when none was supplied and a conversion exists
/// - confidence is clamped to [0, 1]
/// - anything below `review_threshold` is flagged for manual review
pub fn normalize_parsed_ingredient(
    mut ingredient: ParsedIngredient,
    review_threshold: f32,
) -> ParsedIngredient {
    if let Some(raw) = ingredient.unit.take() {
        let unit = normalize_unit(Some(&raw));
        ingredient.unit = Some(unit.as_str().to_string());

        if ingredient.metric.is_none() {
            if let Some(quantity) = ingredient.quantity {
                ingredient.metric = to_metric(quantity, unit);
            }
        }
    }

    ingredient.confidence = if ingredient.confidence.is_nan() {
        0.0
    } else {
        ingredient.confidence.clamp(0.0, 1.0)
    };

    if ingredient.confidence < review_threshold {
        ingredient.requires_manual_review = true;
    }

    ingredient
}

impl fmt::Display for ParsingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParsingMethod::Ai => "ai",
            ParsingMethod::Manual => "manual",
            ParsingMethod::User => "user",
        };
        write!(f, "{name}")
    }
}
