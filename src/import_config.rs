//! # Import Configuration Module
//!
//! This module defines the tunable limits of the import pipeline: batch sizing,
//! ingredient line length, the manual-review confidence threshold and the
//! maximum accepted JSON-LD payload size.

use std::env;
use std::str::FromStr;

use tracing::warn;

// Constants for import configuration
pub const MAX_BATCH_SIZE: usize = 20;
pub const MAX_INGREDIENT_LENGTH: usize = 500;
pub const MANUAL_REVIEW_THRESHOLD: f32 = 0.7;
pub const DEFAULT_BATCH_TIME_MS: u64 = 2000;
pub const MAX_JSON_LD_BYTES: u64 = 1024 * 1024; // 1MB limit for scraped JSON-LD

/// Confidence thresholds used for labels and badge colors
pub const HIGH_CONFIDENCE: f32 = 0.85;
pub const MEDIUM_CONFIDENCE: f32 = 0.70;

/// Configuration structure for recipe and ingredient imports
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Maximum number of ingredient lines sent to the parser in one batch
    pub max_batch_size: usize,
    /// Maximum length of a single ingredient line in characters
    pub max_ingredient_length: usize,
    /// Ingredients with a confidence below this value require manual review
    pub manual_review_threshold: f32,
    /// Expected parse time per batch in milliseconds, used for ETA estimates
    pub batch_time_ms: u64,
    /// Maximum accepted JSON-LD payload size in bytes
    pub max_json_ld_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_ingredient_length: MAX_INGREDIENT_LENGTH,
            manual_review_threshold: MANUAL_REVIEW_THRESHOLD,
            batch_time_ms: DEFAULT_BATCH_TIME_MS,
            max_json_ld_bytes: MAX_JSON_LD_BYTES,
        }
    }
}

impl ImportConfig {
    /// Build a configuration from `RECIPE_IMPORT_*` environment variables
    ///
    /// Every variable is optional; missing or unparseable values keep the default.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `RECIPE_IMPORT_MAX_BATCH_SIZE` | `max_batch_size` |
    /// | `RECIPE_IMPORT_MAX_INGREDIENT_LENGTH` | `max_ingredient_length` |
    /// | `RECIPE_IMPORT_REVIEW_THRESHOLD` | `manual_review_threshold` |
    /// | `RECIPE_IMPORT_BATCH_TIME_MS` | `batch_time_ms` |
    /// | `RECIPE_IMPORT_MAX_JSON_LD_BYTES` | `max_json_ld_bytes` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_batch_size: env_or("RECIPE_IMPORT_MAX_BATCH_SIZE", defaults.max_batch_size),
            max_ingredient_length: env_or(
                "RECIPE_IMPORT_MAX_INGREDIENT_LENGTH",
                defaults.max_ingredient_length,
            ),
            manual_review_threshold: env_or(
                "RECIPE_IMPORT_REVIEW_THRESHOLD",
                defaults.manual_review_threshold,
            ),
            batch_time_ms: env_or("RECIPE_IMPORT_BATCH_TIME_MS", defaults.batch_time_ms),
            max_json_ld_bytes: env_or("RECIPE_IMPORT_MAX_JSON_LD_BYTES", defaults.max_json_ld_bytes),
        }
    }

    /// Check that the configuration values are usable
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be at least 1".to_string());
        }
        if self.max_ingredient_length == 0 {
            return Err("max_ingredient_length must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.manual_review_threshold) {
            return Err(format!(
                "manual_review_threshold must be between 0 and 1, got {}",
                self.manual_review_threshold
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}
