//! # Recipe Import CLI
//!
//! Imports a recipe from a JSON-LD file or an HTML page containing JSON-LD,
//! structures its ingredient lines and prints the result as JSON.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recipe_import::batch_parser::{
    format_progress_percentage, format_time_remaining, BatchParseOptions, IngredientParsingProgress,
};
use recipe_import::import_config::ImportConfig;
use recipe_import::import_pipeline::{import_recipe, PipelineError, RuleBasedParser};
use recipe_import::ingredient_formatter::format_ingredient_for_display;
use recipe_import::recipe_extractor::{extract_json_ld_blocks, parse_recipe_json_ld};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => bail!("usage: recipe-import <recipe.json|page.html>"),
    };

    let config = ImportConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    info!("Importing recipe from {}", path);

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;

    let json_ld = if path.ends_with(".html") || path.ends_with(".htm") {
        extract_json_ld_blocks(&content)
            .into_iter()
            .find(|block| parse_recipe_json_ld(block).recipe.is_some())
            .context("No JSON-LD Recipe found in HTML page")?
    } else {
        content
    };

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested, stopping after the current batch");
            ctrl_c_token.cancel();
        }
    });

    let parser = RuleBasedParser::new(config.manual_review_threshold);
    let mut report_progress = |progress: &IngredientParsingProgress| {
        info!(
            "Parsed batch {}/{} ({}%, {} remaining)",
            progress.current_batch,
            progress.total_batches,
            format_progress_percentage(progress),
            format_time_remaining(progress.estimated_time_remaining_ms)
        );
    };
    let options = BatchParseOptions {
        on_progress: Some(&mut report_progress),
        signal: Some(&cancel),
        ..Default::default()
    };

    match import_recipe(&json_ld, &parser, &config, options).await {
        Ok(import) => {
            let display: Vec<String> = import
                .ingredients
                .iter()
                .map(format_ingredient_for_display)
                .collect();
            let output = json!({
                "recipe": import.recipe,
                "warnings": import.warnings,
                "ingredients": import.ingredients,
                "displayLines": display,
                "storageLines": import.ingredient_lines,
                "ingredientError": import.ingredient_error.as_ref().map(|e| json!({
                    "message": e.user_message(),
                    "recoverable": e.is_recoverable(),
                    "suggestion": e.recovery_suggestion(),
                })),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(PipelineError::Import(err)) => {
            error!(kind = err.kind(), recoverable = err.is_recoverable(), "Import failed: {}", err);
            if let Some(suggestion) = err.recovery_suggestion() {
                eprintln!("{err}\n{suggestion}");
            } else {
                eprintln!("{err}");
            }
            std::process::exit(1);
        }
        Err(PipelineError::Cancelled(err)) => {
            eprintln!("{err}");
            std::process::exit(130);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_output = env::var("RECIPE_IMPORT_LOG_FORMAT").is_ok_and(|format| format == "json");

    if json_output {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
