//! # Schema.org Recipe Extractor
//!
//! This module turns schema.org `Recipe` JSON-LD, as scraped from recipe
//! webpages, into a normalized [`Recipe`] plus validation findings.
//!
//! ## Features
//!
//! - Locates the Recipe node in a bare object, a top-level array or an `@graph` wrapper
//! - Normalizes images, instructions, authors, tag-like lists, nutrition and dates
//! - Always returns a best-effort partial recipe once a Recipe node was found,
//!   so a correction form can be pre-filled
//! - Never panics or fails past its boundary for malformed input
//!
//! ## Usage
//!
//! ```rust
//! use recipe_import::recipe_extractor::parse_recipe_json_ld;
//!
//! let result = parse_recipe_json_ld(r#"{"@type":"Recipe","name":"Tea","image":"http://x/y.jpg"}"#);
//! assert!(result.success);
//! assert_eq!(result.recipe.unwrap().name, "Tea");
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::import_config::ImportConfig;
use crate::import_errors::{ImportError, ValidationError, ValidationWarning};

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format";
pub const NO_RECIPE_MESSAGE: &str = "No Recipe schema found";
pub const NO_JSON_LD_MESSAGE: &str = "No JSON-LD data found";

lazy_static! {
    /// Finds JSON-LD script tags (case-insensitive for the type attribute)
    static ref JSON_LD_SCRIPT_REGEX: Regex = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#
    )
    .expect("JSON-LD script pattern should be valid");

    /// Leading numeric token of a nutrition value ("240 calories", "12.5 g"),
    /// matched after thousands separators are removed
    static ref NUMERIC_TOKEN_REGEX: Regex =
        Regex::new(r"\d*\.?\d+").expect("Numeric token pattern should be valid");

    /// ISO 8601 durations as used by prepTime/cookTime/totalTime
    static ref ISO_DURATION_REGEX: Regex = Regex::new(
        r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$"
    )
    .expect("ISO duration pattern should be valid");
}

/// A recipe extracted from JSON-LD, in the shape the persistence layer stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub description: Option<String>,
    /// Primary image URL, empty when none could be extracted
    pub image: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    /// Durations above in whole minutes, when they are valid ISO 8601
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub total_minutes: Option<u32>,
    pub servings: Option<String>,
    pub author: Option<String>,
    pub category: Vec<String>,
    pub cuisine: Vec<String>,
    pub keywords: Vec<String>,
    pub suitable_for_diet: Vec<String>,
    pub calories: Option<f64>,
    pub date_published: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
}

/// Outcome of one attempt to extract a Recipe from JSON-LD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeParseResult {
    /// True exactly when `errors` is empty
    pub success: bool,
    pub recipe: Option<Recipe>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RecipeParseResult {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            recipe: None,
            errors: vec![message.to_string()],
            warnings: Vec::new(),
        }
    }
}

/// A Recipe that passed validation, with its non-blocking findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedRecipe {
    pub recipe: Recipe,
    pub warnings: Vec<ValidationWarning>,
}

/// A located and extracted Recipe node, validated but not yet judged
struct Extraction {
    recipe: Recipe,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

/// Parse schema.org Recipe JSON-LD into a [`RecipeParseResult`]
///
/// Invalid JSON and JSON without a Recipe node produce a single-error failure
/// with no recipe. Otherwise the recipe is always populated, and missing name
/// or image are reported as errors while missing ingredients or instructions
/// are only warnings.
pub fn parse_recipe_json_ld(json_ld_text: &str) -> RecipeParseResult {
    match extract(json_ld_text) {
        Ok(extraction) => {
            let errors: Vec<String> = extraction.errors.into_iter().map(|e| e.message).collect();
            RecipeParseResult {
                success: errors.is_empty(),
                recipe: Some(extraction.recipe),
                errors,
                warnings: extraction.warnings.into_iter().map(|w| w.message).collect(),
            }
        }
        Err(ImportError::JsonParse { .. }) => RecipeParseResult::failure(INVALID_JSON_MESSAGE),
        Err(ImportError::JsonInvalidSchema { .. }) => RecipeParseResult::failure(NO_RECIPE_MESSAGE),
        Err(other) => RecipeParseResult::failure(&other.user_message()),
    }
}

/// Import JSON-LD with typed failures
///
/// Enforces the configured size limit first, then extracts and validates.
/// Blocking validation findings become [`ImportError::Validation`].
pub fn import_recipe_json_ld(
    json_ld_text: &str,
    config: &ImportConfig,
) -> Result<ImportedRecipe, ImportError> {
    let actual = json_ld_text.len() as u64;
    if actual > config.max_json_ld_bytes {
        warn!(actual, limit = config.max_json_ld_bytes, "Rejecting oversized JSON-LD payload");
        return Err(ImportError::SizeLimit {
            actual,
            limit: config.max_json_ld_bytes,
            unit: "bytes".to_string(),
        });
    }

    let extraction = extract(json_ld_text)?;
    if !extraction.errors.is_empty() {
        info!(
            recipe = %extraction.recipe.name,
            errors = extraction.errors.len(),
            "Recipe failed validation"
        );
        return Err(ImportError::Validation {
            errors: extraction.errors,
        });
    }

    Ok(ImportedRecipe {
        recipe: extraction.recipe,
        warnings: extraction.warnings,
    })
}

/// Return the contents of every `<script type="application/ld+json">` block
pub fn extract_json_ld_blocks(html: &str) -> Vec<String> {
    JSON_LD_SCRIPT_REGEX
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Parse the first JSON-LD block of an HTML page that contains a Recipe
pub fn parse_recipe_from_html(html: &str) -> RecipeParseResult {
    let blocks = extract_json_ld_blocks(html);
    if blocks.is_empty() {
        return RecipeParseResult::failure(NO_JSON_LD_MESSAGE);
    }

    debug!(blocks = blocks.len(), "Found JSON-LD blocks in HTML");

    blocks
        .iter()
        .map(|block| parse_recipe_json_ld(block))
        .find(|result| result.recipe.is_some())
        .unwrap_or_else(|| RecipeParseResult::failure(NO_RECIPE_MESSAGE))
}

/// Convert an ISO 8601 duration ("PT1H30M") to whole minutes
///
/// # Examples
///
/// ```rust
/// use recipe_import::recipe_extractor::parse_iso8601_minutes;
///
/// assert_eq!(parse_iso8601_minutes("PT1H30M"), Some(90));
/// assert_eq!(parse_iso8601_minutes("P1DT2H"), Some(1560));
/// assert_eq!(parse_iso8601_minutes("20 minutes"), None);
/// ```
pub fn parse_iso8601_minutes(duration: &str) -> Option<u32> {
    let duration = duration.trim();
    if duration == "P" || duration.ends_with('T') {
        return None;
    }
    let captures = ISO_DURATION_REGEX.captures(duration)?;

    let part = |index: usize| -> f64 {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let minutes = part(1) * 24.0 * 60.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    Some(minutes.round() as u32)
}

fn extract(json_ld_text: &str) -> Result<Extraction, ImportError> {
    let json: Value = serde_json::from_str(json_ld_text).map_err(|e| {
        debug!(error = %e, "JSON-LD is not valid JSON");
        ImportError::from_json_error(&e)
    })?;

    let node = find_recipe_node(&json).ok_or_else(|| {
        debug!("No Recipe node in JSON-LD");
        ImportError::JsonInvalidSchema {
            message: NO_RECIPE_MESSAGE.to_string(),
        }
    })?;

    let mut warnings = Vec::new();
    let recipe = extract_recipe_fields(node, &mut warnings);
    let errors = validate_recipe(&recipe, &mut warnings);

    Ok(Extraction {
        recipe,
        errors,
        warnings,
    })
}

/// Locate the Recipe node: top-level array, then `@graph`, then the object itself
fn find_recipe_node(json: &Value) -> Option<&Value> {
    if let Value::Array(items) = json {
        let found = items.iter().find(|item| is_recipe_type(item));
        if found.is_some() {
            debug!("Recipe node found in top-level array");
        }
        return found;
    }

    if let Some(Value::Array(graph)) = json.get("@graph") {
        if let Some(found) = graph.iter().find(|item| is_recipe_type(item)) {
            debug!("Recipe node found in @graph");
            return Some(found);
        }
    }

    if is_recipe_type(json) {
        debug!("Recipe node is the top-level object");
        return Some(json);
    }

    None
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind == "Recipe",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k == "Recipe"),
        _ => false,
    }
}

fn extract_recipe_fields(node: &Value, warnings: &mut Vec<ValidationWarning>) -> Recipe {
    let prep_time = optional_string(node, "prepTime");
    let cook_time = optional_string(node, "cookTime");
    let total_time = optional_string(node, "totalTime");

    Recipe {
        name: node
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        description: optional_string(node, "description"),
        image: extract_image(node.get("image")),
        ingredients: extract_ingredients(node),
        instructions: extract_instructions(node.get("recipeInstructions")),
        prep_minutes: prep_time.as_deref().and_then(parse_iso8601_minutes),
        cook_minutes: cook_time.as_deref().and_then(parse_iso8601_minutes),
        total_minutes: total_time.as_deref().and_then(parse_iso8601_minutes),
        prep_time,
        cook_time,
        total_time,
        servings: extract_yield(node.get("recipeYield")),
        author: extract_author(node.get("author")),
        category: string_list(node.get("recipeCategory")),
        cuisine: string_list(node.get("recipeCuisine")),
        keywords: string_list(node.get("keywords")),
        suitable_for_diet: string_list(node.get("suitableForDiet")),
        calories: extract_calories(node.get("nutrition")),
        date_published: extract_date(node.get("datePublished"), warnings),
        source_url: optional_string(node, "url"),
    }
}

/// Name and image are required; ingredients and instructions only warn
fn validate_recipe(recipe: &Recipe, warnings: &mut Vec<ValidationWarning>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if recipe.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "Recipe name is required"));
    }
    if recipe.image.is_empty() {
        errors.push(ValidationError::new("image", "Recipe image is required"));
    }
    if recipe.ingredients.is_empty() {
        warnings.push(ValidationWarning::new(
            "recipeIngredient",
            "No ingredients found; add them manually",
            true,
        ));
    }
    if recipe.instructions.is_empty() {
        warnings.push(ValidationWarning::new(
            "recipeInstructions",
            "No instructions found; add them manually",
            true,
        ));
    }

    errors
}

fn optional_string(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A single string, the first of an array of strings, or the first `{url}` object
fn extract_image(image: Option<&Value>) -> String {
    match image {
        Some(Value::String(url)) => url.trim().to_string(),
        Some(Value::Array(items)) => match items.first() {
            Some(Value::String(url)) => url.trim().to_string(),
            Some(first) => first
                .get("url")
                .and_then(Value::as_str)
                .map(|url| url.trim().to_string())
                .unwrap_or_default(),
            None => String::new(),
        },
        _ => String::new(),
    }
}

/// `recipeIngredient`, falling back to the deprecated `ingredients` property
fn extract_ingredients(node: &Value) -> Vec<String> {
    let raw = node
        .get("recipeIngredient")
        .or_else(|| node.get("ingredients"));

    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    }
}

fn extract_instructions(instructions: Option<&Value>) -> Vec<String> {
    let mut steps = Vec::new();
    match instructions {
        Some(Value::Array(items)) => {
            for item in items {
                collect_instruction_steps(item, &mut steps);
            }
        }
        Some(Value::String(text)) => steps.push(text.trim().to_string()),
        _ => {}
    }
    steps.retain(|step| !step.is_empty());
    steps
}

/// Plain strings, `{text, name?}` steps, and sections with `itemListElement`
fn collect_instruction_steps(item: &Value, steps: &mut Vec<String>) {
    if let Some(text) = item.as_str() {
        steps.push(text.trim().to_string());
        return;
    }

    if let Some(text) = item.get("text").and_then(Value::as_str) {
        let text = text.trim();
        match item.get("name").and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() && !text.is_empty() => {
                steps.push(format!("{name}: {text}"))
            }
            _ => steps.push(text.to_string()),
        }
        return;
    }

    if let Some(Value::Array(section)) = item.get("itemListElement") {
        for step in section {
            collect_instruction_steps(step, steps);
        }
    }
}

fn extract_author(author: Option<&Value>) -> Option<String> {
    let name = match author? {
        Value::String(name) => name.as_str(),
        other => other.get("name")?.as_str()?,
    };
    Some(name.trim().to_string()).filter(|n| !n.is_empty())
}

/// Accept a single string or an array of strings, always returning a list
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(single)) => Some(single.trim())
            .filter(|s| !s.is_empty())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn extract_yield(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => extract_yield(items.first()),
        _ => None,
    }
}

/// Leading numeric token of `nutrition.calories`
fn extract_calories(nutrition: Option<&Value>) -> Option<f64> {
    match nutrition?.get("calories")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits = s.replace(',', "");
            NUMERIC_TOKEN_REGEX
                .find(&digits)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        }
        _ => None,
    }
}

fn extract_date(value: Option<&Value>, warnings: &mut Vec<ValidationWarning>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        });

    if parsed.is_none() {
        warnings.push(ValidationWarning::new(
            "datePublished",
            &format!("Could not parse publish date '{raw}'"),
            false,
        ));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_variants() {
        assert_eq!(extract_image(Some(&json!("a.jpg"))), "a.jpg");
        assert_eq!(extract_image(Some(&json!(["a.jpg", "b.jpg"]))), "a.jpg");
        assert_eq!(extract_image(Some(&json!([{"url": "c.jpg"}]))), "c.jpg");
        assert_eq!(extract_image(Some(&json!({"url": "d.jpg"}))), "");
        assert_eq!(extract_image(None), "");
    }

    #[test]
    fn test_instruction_steps_with_names() {
        let instructions = json!([
            {"@type": "HowToStep", "name": "Boil", "text": "Boil the water."},
            {"@type": "HowToStep", "text": "Steep the tea."},
            "  ",
            {"@type": "HowToSection", "itemListElement": [{"text": "Serve."}]}
        ]);
        assert_eq!(
            extract_instructions(Some(&instructions)),
            vec!["Boil: Boil the water.", "Steep the tea.", "Serve."]
        );
    }

    #[test]
    fn test_author_forms() {
        assert_eq!(extract_author(Some(&json!("Ann"))), Some("Ann".to_string()));
        assert_eq!(
            extract_author(Some(&json!({"@type": "Person", "name": "Bo"}))),
            Some("Bo".to_string())
        );
        assert_eq!(extract_author(Some(&json!(42))), None);
        assert_eq!(extract_author(None), None);
    }

    #[test]
    fn test_string_list_normalization() {
        assert_eq!(string_list(Some(&json!("Dessert"))), vec!["Dessert"]);
        assert_eq!(string_list(Some(&json!(["A", "B"]))), vec!["A", "B"]);
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn test_calories_extraction() {
        assert_eq!(extract_calories(Some(&json!({"calories": "240 calories"}))), Some(240.0));
        assert_eq!(extract_calories(Some(&json!({"calories": "12.5 kcal"}))), Some(12.5));
        assert_eq!(extract_calories(Some(&json!({"calories": 310}))), Some(310.0));
        assert_eq!(extract_calories(Some(&json!({"calories": "1,200 kcal"}))), Some(1200.0));
        assert_eq!(extract_calories(Some(&json!({"calories": "12,345.5 calories"}))), Some(12345.5));
        assert_eq!(extract_calories(Some(&json!({"calories": "unknown"}))), None);
        assert_eq!(extract_calories(Some(&json!({"fatContent": "3 g"}))), None);
        assert_eq!(extract_calories(None), None);
    }

    #[test]
    fn test_date_formats() {
        let mut warnings = Vec::new();
        let date = extract_date(Some(&json!("2024-03-01")), &mut warnings).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let date = extract_date(Some(&json!("2024-03-01T10:30:00+02:00")), &mut warnings).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T08:30:00+00:00");
        assert!(warnings.is_empty());

        assert!(extract_date(Some(&json!("last tuesday")), &mut warnings).is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_yield_forms() {
        assert_eq!(extract_yield(Some(&json!("4 servings"))), Some("4 servings".to_string()));
        assert_eq!(extract_yield(Some(&json!(6))), Some("6".to_string()));
        assert_eq!(extract_yield(Some(&json!(["8", "8 cookies"]))), Some("8".to_string()));
    }
}
