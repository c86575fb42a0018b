//! # Recipe Import
//!
//! Turns schema.org Recipe JSON-LD and free-text ingredient lines into validated,
//! normalized recipe records with consistent quantities and units, plus the
//! confidence and manual-review metadata needed to defer ambiguous lines to a person.

pub mod batch_parser;
pub mod import_config;
pub mod import_errors;
pub mod import_pipeline;
pub mod ingredient_formatter;
pub mod ingredient_model;
pub mod recipe_extractor;
pub mod units;
