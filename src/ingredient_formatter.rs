//! # Ingredient Formatter
//!
//! This module renders structured ingredients back into display and storage
//! strings, and reverse-parses hand-edited lines into a low-confidence structure.
//!
//! ## Features
//!
//! - Display and storage presets, with optional metric parenthetical
//! - Confidence labels and badge colors sharing one set of thresholds
//! - Best-effort reverse parsing of "2 cups flour, sifted" style lines
//! - Pure grouping and filtering helpers over ingredient lists
//!
//! ## Usage
//!
//! ```rust
//! use recipe_import::ingredient_formatter::{format_ingredient, FormatOptions, parse_ingredient_string};
//!
//! let parsed = parse_ingredient_string("2 cups flour, sifted");
//! assert_eq!(parsed.ingredient, "flour");
//! assert_eq!(parsed.preparation.as_deref(), Some("sifted"));
//!
//! let line = format_ingredient(&parsed, &FormatOptions::default());
//! assert_eq!(line, "2 cups flour, sifted");
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::import_config::{HIGH_CONFIDENCE, MEDIUM_CONFIDENCE};
use crate::ingredient_model::{ParsedIngredient, ParsingMethod};
use crate::units::{is_valid_unit, Unit};

lazy_static! {
    /// Optional quantity run, optional unit word, then the ingredient name
    static ref INGREDIENT_LINE_REGEX: Regex = Regex::new(
        r"^(?P<qty>[\d\s/.\-½⅓⅔¼¾⅛⅜⅝⅞]+)?\s*(?P<unit>[a-zA-Z]+\.?)?\s+(?P<name>.+)$"
    )
    .expect("Ingredient line pattern should be valid");
}

/// Confidence assigned to heuristically reverse-parsed lines
pub const REVERSE_PARSE_CONFIDENCE: f32 = 0.5;

/// Target of a formatted ingredient string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatStyle {
    /// On-screen rendering, canonical units use their display labels
    #[default]
    Display,
    /// Persisted rendering, unit tokens are written as stored
    Storage,
}

/// Options for [`format_ingredient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub include_metric: bool,
    pub include_preparation: bool,
    pub format: FormatStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            include_metric: false,
            include_preparation: true,
            format: FormatStyle::Display,
        }
    }
}

/// Coarse confidence bucket shared by labels and badge colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(confidence: f32) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }

    pub fn badge_color(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "green",
            ConfidenceLevel::Medium => "yellow",
            ConfidenceLevel::Low => "red",
        }
    }
}

/// Ingredients partitioned by how they were parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientsByMethod<'a> {
    pub ai: Vec<&'a ParsedIngredient>,
    pub manual: Vec<&'a ParsedIngredient>,
    pub user: Vec<&'a ParsedIngredient>,
}

/// Render an ingredient as a single line
///
/// Pieces are assembled in order: quantity, unit, metric parenthetical,
/// name, then a comma-appended preparation note. Missing pieces are skipped
/// without leaving stray separators.
pub fn format_ingredient(ingredient: &ParsedIngredient, options: &FormatOptions) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(quantity) = ingredient.quantity {
        parts.push(format_quantity(quantity));
    }

    if let Some(unit) = ingredient.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        parts.push(format_unit(unit, options.format));
    }

    if options.include_metric {
        if let Some(metric) = &ingredient.metric {
            let unit = match options.format {
                FormatStyle::Display => metric.unit.display_label(),
                FormatStyle::Storage => metric.unit.as_str(),
            };
            parts.push(format!("({} {})", format_quantity(metric.quantity), unit));
        }
    }

    let name = ingredient.ingredient.trim();
    if !name.is_empty() {
        parts.push(name.to_string());
    }

    let mut line = parts.join(" ");

    if options.include_preparation {
        if let Some(preparation) = ingredient
            .preparation
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if line.is_empty() {
                line.push_str(preparation);
            } else {
                line.push_str(", ");
                line.push_str(preparation);
            }
        }
    }

    line
}

/// Display preset: metric parenthetical and preparation notes included
pub fn format_ingredient_for_display(ingredient: &ParsedIngredient) -> String {
    format_ingredient(
        ingredient,
        &FormatOptions {
            include_metric: true,
            include_preparation: true,
            format: FormatStyle::Display,
        },
    )
}

/// Storage preset
///
/// Manual and user ingredients are stored as their original text verbatim.
pub fn format_ingredient_for_storage(ingredient: &ParsedIngredient) -> String {
    if ingredient.is_user_authored() {
        return ingredient.original_text.clone();
    }

    format_ingredient(
        ingredient,
        &FormatOptions {
            include_metric: false,
            include_preparation: true,
            format: FormatStyle::Storage,
        },
    )
}

/// Standalone metric rendering, e.g. `"237ml"`
pub fn format_metric_conversion(ingredient: &ParsedIngredient) -> Option<String> {
    ingredient
        .metric
        .as_ref()
        .map(|metric| format!("{}{}", format_quantity(metric.quantity), metric.unit.as_str()))
}

pub fn format_confidence_label(confidence: f32) -> &'static str {
    ConfidenceLevel::from_score(confidence).label()
}

pub fn confidence_badge_color(confidence: f32) -> &'static str {
    ConfidenceLevel::from_score(confidence).badge_color()
}

/// Best-effort reverse parse of a hand-typed ingredient line
///
/// The line is split on its first comma into the main part and preparation
/// notes. The main part is matched against "quantity, unit word, name"; a word
/// only counts as a unit when it follows a quantity and is a known unit. When the
/// pattern does not match, the whole main part becomes the name.
///
/// The result is always a low-confidence manual parse that needs review.
///
/// # Examples
///
/// ```rust
/// use recipe_import::ingredient_formatter::parse_ingredient_string;
///
/// let parsed = parse_ingredient_string("1 1/2 tbsp olive oil");
/// assert_eq!(parsed.quantity, Some(1.5));
/// assert_eq!(parsed.unit.as_deref(), Some("tbsp"));
/// assert_eq!(parsed.ingredient, "olive oil");
/// assert!(parsed.requires_manual_review);
/// ```
pub fn parse_ingredient_string(text: &str) -> ParsedIngredient {
    let (main_part, preparation) = match text.split_once(',') {
        Some((main, notes)) => (main.trim(), Some(notes.trim()).filter(|n| !n.is_empty())),
        None => (text.trim(), None),
    };

    let mut quantity = None;
    let mut unit = None;
    let mut name = main_part.to_string();

    if let Some(captures) = INGREDIENT_LINE_REGEX.captures(main_part) {
        quantity = captures.name("qty").and_then(|m| parse_quantity(m.as_str()));
        let rest = captures.name("name").map(|m| m.as_str().trim()).unwrap_or("");

        match captures.name("unit").map(|m| m.as_str()) {
            Some(word) if quantity.is_some() && is_valid_unit(Some(word)) => {
                unit = Some(word.to_string());
                name = rest.to_string();
            }
            Some(word) => name = format!("{word} {rest}"),
            None => name = rest.to_string(),
        }

        // A quantity run that is not a number belongs to the name
        if quantity.is_none() {
            if let Some(raw_qty) = captures.name("qty").map(|m| m.as_str().trim()) {
                if !raw_qty.is_empty() {
                    name = format!("{raw_qty} {name}");
                }
            }
        }
    }

    let mut parsed = ParsedIngredient::new(text, name.trim())
        .with_method(ParsingMethod::Manual)
        .with_confidence(REVERSE_PARSE_CONFIDENCE)
        .with_manual_review(true);
    parsed.quantity = quantity;
    parsed.unit = unit;
    parsed.preparation = preparation.map(str::to_string);
    parsed
}

/// Wrap a hand-written line as a trusted manual ingredient
pub fn create_manual_parsed_ingredient(text: &str) -> ParsedIngredient {
    let mut parsed = parse_ingredient_string(text);
    parsed.confidence = 1.0;
    parsed.requires_manual_review = false;
    parsed
}

pub fn group_ingredients_by_method(ingredients: &[ParsedIngredient]) -> IngredientsByMethod<'_> {
    let mut groups = IngredientsByMethod::default();
    for ingredient in ingredients {
        match ingredient.parsing_method {
            ParsingMethod::Ai => groups.ai.push(ingredient),
            ParsingMethod::Manual => groups.manual.push(ingredient),
            ParsingMethod::User => groups.user.push(ingredient),
        }
    }
    groups
}

pub fn ingredients_needing_review(ingredients: &[ParsedIngredient]) -> Vec<&ParsedIngredient> {
    ingredients
        .iter()
        .filter(|i| i.requires_manual_review)
        .collect()
}

pub fn has_metric_conversion(ingredient: &ParsedIngredient) -> bool {
    ingredient.metric.is_some()
}

pub fn has_preparation_notes(ingredient: &ParsedIngredient) -> bool {
    ingredient
        .preparation
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty())
}

/// At most two decimals, integers without a fractional part
fn format_quantity(quantity: f64) -> String {
    let rounded = (quantity * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

fn format_unit(unit: &str, style: FormatStyle) -> String {
    match (style, Unit::from_canonical(unit)) {
        (FormatStyle::Display, Some(canonical)) => canonical.display_label().to_string(),
        _ => unit.to_string(),
    }
}

/// Parse a quantity run: integers, decimals, fractions, mixed numbers,
/// unicode vulgar fractions and ranges (lower bound kept)
fn parse_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((low, _high)) = text.split_once('-') {
        return parse_amount(low);
    }

    parse_amount(text)
}

fn parse_amount(text: &str) -> Option<f64> {
    let mut tokens = text.split_whitespace().peekable();
    tokens.peek()?;

    let mut total = 0.0;
    for token in tokens {
        total += parse_amount_token(token)?;
    }
    Some(total)
}

fn parse_amount_token(token: &str) -> Option<f64> {
    if let Some((numerator, denominator)) = token.split_once('/') {
        let numerator: f64 = numerator.parse().ok()?;
        let denominator: f64 = denominator.parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    if let Some(last) = token.chars().last() {
        if let Some(fraction) = vulgar_fraction_value(last) {
            let whole = &token[..token.len() - last.len_utf8()];
            let whole: f64 = if whole.is_empty() { 0.0 } else { whole.parse().ok()? };
            return Some(whole + fraction);
        }
    }

    token.parse().ok()
}

fn vulgar_fraction_value(c: char) -> Option<f64> {
    match c {
        '½' => Some(1.0 / 2.0),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(1.0 / 4.0),
        '¾' => Some(3.0 / 4.0),
        '⅛' => Some(1.0 / 8.0),
        '⅜' => Some(3.0 / 8.0),
        '⅝' => Some(5.0 / 8.0),
        '⅞' => Some(7.0 / 8.0),
        _ => None,
    }
}
