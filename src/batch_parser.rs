//! # Batch Ingredient Parsing Module
//!
//! This module splits large ingredient lists into bounded batches and drives an
//! injected parser over them one batch at a time, reporting progress and an ETA
//! after every batch.
//!
//! ## Behavior
//!
//! - Batches run strictly sequentially, so the parser never sees overlapping calls
//!   and the parsed list keeps input order
//! - A batch whose parse call fails is not retried; its lines are recorded as
//!   failed and the run continues with the next batch
//! - Cancellation is cooperative and checked before every batch; a batch already
//!   in flight is awaited to completion
//!
//! ## Usage
//!
//! ```rust
//! use recipe_import::batch_parser::{parse_ingredients_in_batches, BatchParseOptions};
//! use recipe_import::ingredient_formatter::parse_ingredient_string;
//! use recipe_import::ingredient_model::ParsedIngredient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let lines = vec!["2 cups flour".to_string(), "1 tsp salt".to_string()];
//! let parser = |batch: Vec<String>| async move {
//!     Ok::<Vec<ParsedIngredient>, anyhow::Error>(
//!         batch.iter().map(|line| parse_ingredient_string(line)).collect(),
//!     )
//! };
//!
//! let result = parse_ingredients_in_batches(&lines, &parser, BatchParseOptions::default()).await?;
//! assert_eq!(result.parsed_ingredients.len(), 2);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::import_config::{ImportConfig, MAX_BATCH_SIZE};
use crate::import_errors::ImportError;
use crate::ingredient_model::ParsedIngredient;

/// An external capability that structures a batch of raw ingredient lines
///
/// Implementations may be slow and may fail; the pipeline assumes nothing else.
/// Async closures taking `Vec<String>` implement this trait automatically.
pub trait IngredientBatchParser {
    fn parse_batch(
        &self,
        batch: Vec<String>,
    ) -> impl Future<Output = anyhow::Result<Vec<ParsedIngredient>>>;
}

impl<F, Fut> IngredientBatchParser for F
where
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<ParsedIngredient>>>,
{
    fn parse_batch(
        &self,
        batch: Vec<String>,
    ) -> impl Future<Output = anyhow::Result<Vec<ParsedIngredient>>> {
        self(batch)
    }
}

/// Wraps a parser so each batch call fails with [`ImportError::Timeout`]
/// once `timeout` elapses
pub struct WithTimeout<P> {
    inner: P,
    timeout: Duration,
}

impl<P> WithTimeout<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<P: IngredientBatchParser> IngredientBatchParser for WithTimeout<P> {
    async fn parse_batch(&self, batch: Vec<String>) -> anyhow::Result<Vec<ParsedIngredient>> {
        match tokio::time::timeout(self.timeout, self.inner.parse_batch(batch)).await {
            Ok(result) => result,
            Err(_) => Err(ImportError::Timeout {
                operation: "parse_ingredient_batch".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}

/// Snapshot of a batch run, emitted after every batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientParsingProgress {
    /// Number of batches finished so far
    pub current_batch: usize,
    pub total_batches: usize,
    /// Lines processed so far, parsed or failed
    pub parsed_count: usize,
    pub total_count: usize,
    pub estimated_time_remaining_ms: u64,
    pub can_cancel: bool,
}

/// What happened to one batch, in batch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// `count` entries were appended to `parsed_ingredients`
    Parsed { count: usize },
    /// `count` raw lines were appended to `failed_ingredients`
    Failed { count: usize },
}

/// Outcome of a complete batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchParsingResult {
    /// Successfully parsed ingredients in input order
    pub parsed_ingredients: Vec<ParsedIngredient>,
    /// Raw lines of failed batches, in batch order
    pub failed_ingredients: Vec<String>,
    /// One entry per batch, to interleave parsed and failed lines back into input order
    pub batch_outcomes: Vec<BatchOutcome>,
    pub total_batches: usize,
    pub duration_ms: u64,
}

impl BatchParsingResult {
    pub fn has_failures(&self) -> bool {
        !self.failed_ingredients.is_empty()
    }

    /// Describe the failed lines as an [`ImportError::IngredientParse`]
    pub fn to_import_error(&self, cause: &str) -> Option<ImportError> {
        if !self.has_failures() {
            return None;
        }
        Some(ImportError::IngredientParse {
            failed_ingredients: self.failed_ingredients.clone(),
            partial_results: self.parsed_ingredients.clone(),
            cause: cause.to_string(),
        })
    }

    /// Rebuild one line per entry in input order
    ///
    /// Parsed entries go through `render`; failed batches contribute their raw
    /// lines at the position the batch had in the input.
    pub fn lines_in_input_order<F>(&self, parsed: &[ParsedIngredient], render: F) -> Vec<String>
    where
        F: Fn(&ParsedIngredient) -> String,
    {
        let mut parsed = parsed.iter();
        let mut failed = self.failed_ingredients.iter();
        let mut lines = Vec::with_capacity(self.parsed_ingredients.len() + self.failed_ingredients.len());

        for outcome in &self.batch_outcomes {
            match *outcome {
                BatchOutcome::Parsed { count } => {
                    lines.extend(parsed.by_ref().take(count).map(&render));
                }
                BatchOutcome::Failed { count } => {
                    lines.extend(failed.by_ref().take(count).cloned());
                }
            }
        }
        lines
    }
}

/// Errors that stop a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchParseError {
    /// The caller cancelled the run before the given batch started
    Cancelled { completed_batches: usize },
}

impl std::fmt::Display for BatchParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchParseError::Cancelled { completed_batches } => write!(
                f,
                "Ingredient parsing was cancelled after {completed_batches} batch(es)"
            ),
        }
    }
}

impl std::error::Error for BatchParseError {}

/// Reasons an ingredient batch is rejected before parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchValidationError {
    NotAnArray,
    Empty,
    NotAString { index: usize },
    TooLong { index: usize, length: usize, max: usize },
}

impl std::fmt::Display for BatchValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchValidationError::NotAnArray => write!(f, "Ingredients must be an array"),
            BatchValidationError::Empty => write!(f, "Ingredients list cannot be empty"),
            BatchValidationError::NotAString { index } => {
                write!(f, "Ingredient at index {index} must be a string")
            }
            BatchValidationError::TooLong { index, length, max } => write!(
                f,
                "Ingredient at index {index} is {length} characters long, exceeding the maximum of {max}"
            ),
        }
    }
}

impl std::error::Error for BatchValidationError {}

/// Options for [`parse_ingredients_in_batches`]
pub struct BatchParseOptions<'a> {
    /// Called with a progress snapshot after every batch
    pub on_progress: Option<&'a mut dyn FnMut(&IngredientParsingProgress)>,
    /// Checked before every batch
    pub signal: Option<&'a CancellationToken>,
    pub batch_size: usize,
}

impl Default for BatchParseOptions<'_> {
    fn default() -> Self {
        Self {
            on_progress: None,
            signal: None,
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

/// Partition `items` into chunks of `size`; the last chunk may be shorter
///
/// A `size` of zero is treated as one.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Parse ingredient lines batch by batch with the given parser
///
/// # Errors
///
/// Returns [`BatchParseError::Cancelled`] when the signal is set before a batch
/// starts. No partial result is returned in that case. Parser failures never
/// surface here; they land in `failed_ingredients`.
pub async fn parse_ingredients_in_batches<P: IngredientBatchParser>(
    ingredients: &[String],
    parser: &P,
    mut options: BatchParseOptions<'_>,
) -> Result<BatchParsingResult, BatchParseError> {
    let start = Instant::now();
    let batches = chunk(ingredients, options.batch_size);
    let total_batches = batches.len();

    info!(
        ingredients = ingredients.len(),
        batches = total_batches,
        batch_size = options.batch_size,
        "Starting batch ingredient parsing"
    );

    let mut parsed_ingredients = Vec::with_capacity(ingredients.len());
    let mut failed_ingredients = Vec::new();
    let mut batch_outcomes = Vec::with_capacity(total_batches);
    let mut processed = 0;

    for (index, batch) in batches.into_iter().enumerate() {
        if options.signal.is_some_and(CancellationToken::is_cancelled) {
            info!(completed_batches = index, "Batch parsing cancelled");
            return Err(BatchParseError::Cancelled {
                completed_batches: index,
            });
        }

        let batch_len = batch.len();
        debug!(batch = index, size = batch_len, "Parsing ingredient batch");

        match parser.parse_batch(batch.clone()).await {
            Ok(parsed) => {
                debug!(batch = index, parsed = parsed.len(), "Batch parsed");
                batch_outcomes.push(BatchOutcome::Parsed { count: parsed.len() });
                parsed_ingredients.extend(parsed);
            }
            Err(e) => {
                warn!(batch = index, size = batch_len, error = %e, "Batch parsing failed, marking ingredients as failed");
                batch_outcomes.push(BatchOutcome::Failed { count: batch_len });
                failed_ingredients.extend(batch);
            }
        }

        processed += batch_len;
        let completed = index + 1;

        if let Some(on_progress) = options.on_progress.as_deref_mut() {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let average_ms = elapsed_ms / completed as u64;
            let progress = IngredientParsingProgress {
                current_batch: completed,
                total_batches,
                parsed_count: processed,
                total_count: ingredients.len(),
                estimated_time_remaining_ms: (total_batches - completed) as u64 * average_ms,
                can_cancel: options.signal.is_some(),
            };
            on_progress(&progress);
        }
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        parsed = parsed_ingredients.len(),
        failed = failed_ingredients.len(),
        duration_ms,
        "Batch ingredient parsing finished"
    );

    Ok(BatchParsingResult {
        parsed_ingredients,
        failed_ingredients,
        batch_outcomes,
        total_batches,
        duration_ms,
    })
}

/// Validate an untrusted ingredient list (e.g. a request body) before parsing
///
/// Returns the lines on success.
pub fn validate_ingredient_batch(
    ingredients: &Value,
    max_length: usize,
) -> Result<Vec<String>, BatchValidationError> {
    let items = ingredients
        .as_array()
        .ok_or(BatchValidationError::NotAnArray)?;

    let lines = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or(BatchValidationError::NotAString { index })
        })
        .collect::<Result<Vec<_>, _>>()?;

    validate_ingredient_lines(&lines, max_length)?;
    Ok(lines)
}

/// Validate already-typed ingredient lines: non-empty, none longer than `max_length`
pub fn validate_ingredient_lines(
    lines: &[String],
    max_length: usize,
) -> Result<(), BatchValidationError> {
    if lines.is_empty() {
        return Err(BatchValidationError::Empty);
    }

    for (index, line) in lines.iter().enumerate() {
        let length = line.chars().count();
        if length > max_length {
            return Err(BatchValidationError::TooLong {
                index,
                length,
                max: max_length,
            });
        }
    }

    Ok(())
}

/// Spread `total` items as evenly as possible over the fewest batches of at most `max`
///
/// # Examples
///
/// ```rust
/// use recipe_import::batch_parser::calculate_optimal_batch_size;
///
/// assert_eq!(calculate_optimal_batch_size(15, 20), 15);
/// assert_eq!(calculate_optimal_batch_size(25, 20), 13);
/// assert_eq!(calculate_optimal_batch_size(45, 20), 15);
/// ```
pub fn calculate_optimal_batch_size(total: usize, max: usize) -> usize {
    let max = max.max(1);
    if total <= max {
        return total;
    }
    let batches = total.div_ceil(max);
    total.div_ceil(batches)
}

/// Estimated parse time in milliseconds for `count` lines, at
/// `config.batch_time_ms` per batch of `config.max_batch_size`
pub fn estimate_parsing_time(count: usize, config: &ImportConfig) -> u64 {
    count.div_ceil(config.max_batch_size.max(1)) as u64 * config.batch_time_ms
}

pub fn create_initial_progress(total: usize, config: &ImportConfig) -> IngredientParsingProgress {
    IngredientParsingProgress {
        current_batch: 0,
        total_batches: total.div_ceil(config.max_batch_size.max(1)),
        parsed_count: 0,
        total_count: total,
        estimated_time_remaining_ms: estimate_parsing_time(total, config),
        can_cancel: true,
    }
}

pub fn needs_batch_processing(count: usize, config: &ImportConfig) -> bool {
    count > config.max_batch_size
}

/// Whole-number completion percentage, 0 when there is nothing to parse
pub fn format_progress_percentage(progress: &IngredientParsingProgress) -> u32 {
    if progress.total_count == 0 {
        return 0;
    }
    ((progress.parsed_count as f64 / progress.total_count as f64) * 100.0).round() as u32
}

/// Render a remaining time as `"<1s"`, `"42s"`, `"2m"` or `"2m 5s"`
pub fn format_time_remaining(ms: u64) -> String {
    if ms < 1000 {
        return "<1s".to_string();
    }

    let seconds = ms.div_ceil(1000);
    if seconds < 60 {
        return format!("{seconds}s");
    }

    let minutes = seconds / 60;
    let remainder = seconds % 60;
    if remainder == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m {remainder}s")
    }
}
