//! # Import Pipeline Integration
//!
//! This module wires the extractor, the batch parser, the unit normalizer and the
//! formatter together: JSON-LD in, a validated recipe with structured and
//! storage-ready ingredient lines out.

use serde::Serialize;
use tracing::info;

use crate::batch_parser::{
    calculate_optimal_batch_size, create_initial_progress, format_time_remaining,
    parse_ingredients_in_batches, validate_ingredient_lines, BatchParseError, BatchParseOptions,
    IngredientBatchParser,
};
use crate::import_config::ImportConfig;
use crate::import_errors::{ImportError, ValidationError, ValidationWarning};
use crate::ingredient_formatter::{format_ingredient_for_storage, parse_ingredient_string};
use crate::ingredient_model::{normalize_parsed_ingredient, ParsedIngredient, ParsingMethod};
use crate::recipe_extractor::{import_recipe_json_ld, Recipe};
use crate::units::is_valid_unit;

/// Confidence the rule-based parser gives a line with a quantity and a known unit
const RULE_CONFIDENCE_QUANTITY_AND_UNIT: f32 = 0.9;
const RULE_CONFIDENCE_QUANTITY_ONLY: f32 = 0.75;
const RULE_CONFIDENCE_NAME_ONLY: f32 = 0.6;

/// A local, deterministic stand-in for the external structured parser
///
/// Lines are split with the same heuristics as hand-edited lines; confidence
/// reflects how much structure was found.
#[derive(Debug, Clone)]
pub struct RuleBasedParser {
    review_threshold: f32,
}

impl RuleBasedParser {
    pub fn new(review_threshold: f32) -> Self {
        Self { review_threshold }
    }

    /// Parse one line without going through the batch machinery
    pub fn parse_line(&self, line: &str) -> ParsedIngredient {
        let mut parsed = parse_ingredient_string(line);

        parsed.confidence = match (parsed.quantity, parsed.unit.as_deref()) {
            (Some(_), Some(unit)) if is_valid_unit(Some(unit)) => RULE_CONFIDENCE_QUANTITY_AND_UNIT,
            (Some(_), _) => RULE_CONFIDENCE_QUANTITY_ONLY,
            _ => RULE_CONFIDENCE_NAME_ONLY,
        };
        parsed.parsing_method = ParsingMethod::Ai;
        parsed.requires_manual_review = false;

        normalize_parsed_ingredient(parsed, self.review_threshold)
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new(ImportConfig::default().manual_review_threshold)
    }
}

impl IngredientBatchParser for RuleBasedParser {
    async fn parse_batch(&self, batch: Vec<String>) -> anyhow::Result<Vec<ParsedIngredient>> {
        Ok(batch.iter().map(|line| self.parse_line(line)).collect())
    }
}

/// A fully imported recipe
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeImport {
    pub recipe: Recipe,
    pub warnings: Vec<ValidationWarning>,
    /// Structured, normalized ingredients from successful batches
    pub ingredients: Vec<ParsedIngredient>,
    /// Lines as they should be persisted, in input order; failed batches keep their raw lines
    pub ingredient_lines: Vec<String>,
    /// Set when some ingredient batches failed
    pub ingredient_error: Option<ImportError>,
}

/// Why a pipeline run stopped
#[derive(Debug)]
pub enum PipelineError {
    Import(ImportError),
    Cancelled(BatchParseError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Import(err) => write!(f, "{err}"),
            PipelineError::Cancelled(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ImportError> for PipelineError {
    fn from(err: ImportError) -> Self {
        PipelineError::Import(err)
    }
}

impl From<BatchParseError> for PipelineError {
    fn from(err: BatchParseError) -> Self {
        PipelineError::Cancelled(err)
    }
}

/// Import JSON-LD and structure its ingredient lines with `parser`
///
/// Batch sizes are spread evenly under the configured maximum. Failed batches
/// do not fail the import; their raw lines stay at their original position and
/// are reported through `ingredient_error`.
pub async fn import_recipe<P: IngredientBatchParser>(
    json_ld_text: &str,
    parser: &P,
    config: &ImportConfig,
    options: BatchParseOptions<'_>,
) -> Result<RecipeImport, PipelineError> {
    let imported = import_recipe_json_ld(json_ld_text, config)?;
    let lines = imported.recipe.ingredients.clone();

    if lines.is_empty() {
        return Ok(RecipeImport {
            recipe: imported.recipe,
            warnings: imported.warnings,
            ingredients: Vec::new(),
            ingredient_lines: Vec::new(),
            ingredient_error: None,
        });
    }

    validate_ingredient_lines(&lines, config.max_ingredient_length).map_err(|e| {
        ImportError::Validation {
            errors: vec![ValidationError::new("recipeIngredient", &e.to_string())],
        }
    })?;

    let initial = create_initial_progress(lines.len(), config);
    info!(
        ingredients = lines.len(),
        estimated = %format_time_remaining(initial.estimated_time_remaining_ms),
        "Structuring ingredient lines"
    );

    let options = BatchParseOptions {
        batch_size: calculate_optimal_batch_size(lines.len(), config.max_batch_size),
        ..options
    };
    let result = parse_ingredients_in_batches(&lines, parser, options).await?;

    let ingredients: Vec<ParsedIngredient> = result
        .parsed_ingredients
        .iter()
        .cloned()
        .map(|ingredient| normalize_parsed_ingredient(ingredient, config.manual_review_threshold))
        .collect();

    let ingredient_lines = result.lines_in_input_order(&ingredients, format_ingredient_for_storage);

    let ingredient_error = result.to_import_error("One or more ingredient batches failed to parse");

    info!(
        recipe = %imported.recipe.name,
        parsed = ingredients.len(),
        failed = result.failed_ingredients.len(),
        "Recipe import finished"
    );

    Ok(RecipeImport {
        recipe: imported.recipe,
        warnings: imported.warnings,
        ingredients,
        ingredient_lines,
        ingredient_error,
    })
}
