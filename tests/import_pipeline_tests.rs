//! # Import Pipeline Integration Tests
//!
//! End-to-end runs from JSON-LD text to normalized ingredients and
//! storage-ready lines.

use tokio_util::sync::CancellationToken;

use recipe_import::batch_parser::{BatchParseError, BatchParseOptions, IngredientParsingProgress};
use recipe_import::import_config::ImportConfig;
use recipe_import::import_errors::ImportError;
use recipe_import::import_pipeline::{import_recipe, PipelineError, RuleBasedParser};
use recipe_import::ingredient_formatter::format_ingredient_for_display;
use recipe_import::ingredient_model::{ParsedIngredient, ParsingMethod};
use recipe_import::units::{normalize_unit, Unit};

fn recipe_json(ingredients: &[String]) -> String {
    serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Recipe",
        "name": "Pancakes",
        "image": "http://x/pancakes.jpg",
        "recipeIngredient": ingredients,
        "recipeInstructions": ["Mix.", "Fry."]
    })
    .to_string()
}

fn pancake_lines() -> Vec<String> {
    vec![
        "2 Cups flour, sifted".to_string(),
        "1 Tablespoon sugar".to_string(),
        "2 eggs".to_string(),
        "a little butter".to_string(),
    ]
}

#[tokio::test]
async fn test_import_structures_ingredients() {
    let json = recipe_json(&pancake_lines());
    let parser = RuleBasedParser::default();

    let import = import_recipe(&json, &parser, &ImportConfig::default(), BatchParseOptions::default())
        .await
        .unwrap();

    assert_eq!(import.recipe.name, "Pancakes");
    assert!(import.warnings.is_empty());
    assert!(import.ingredient_error.is_none());
    assert_eq!(import.ingredients.len(), 4);

    let flour = &import.ingredients[0];
    assert_eq!(flour.unit.as_deref(), Some("cup"));
    assert_eq!(flour.quantity, Some(2.0));
    assert_eq!(flour.preparation.as_deref(), Some("sifted"));
    assert_eq!(format_ingredient_for_display(flour), "2 cup (473 mL) flour, sifted");

    assert_eq!(import.ingredients[1].unit.as_deref(), Some("tbsp"));
    assert!(import.ingredients[3].requires_manual_review);

    assert_eq!(
        import.ingredient_lines,
        vec!["2 cup flour, sifted", "1 tbsp sugar", "2 eggs", "a little butter"]
    );
}

#[tokio::test]
async fn test_import_keeps_failed_lines_raw() {
    let lines: Vec<String> = (1..=30).map(|i| format!("{i} g spice {i}")).collect();
    let json = recipe_json(&lines);
    let rule_based = RuleBasedParser::default();

    // 30 lines spread into two batches of 15; the second one fails
    let parser = |batch: Vec<String>| {
        let fails = batch.iter().any(|line| line == "30 g spice 30");
        let parsed: Vec<ParsedIngredient> = batch.iter().map(|l| rule_based.parse_line(l)).collect();
        async move {
            if fails {
                anyhow::bail!("model overloaded");
            }
            Ok(parsed)
        }
    };

    let import = import_recipe(&json, &parser, &ImportConfig::default(), BatchParseOptions::default())
        .await
        .unwrap();

    assert_eq!(import.ingredients.len(), 15);
    assert_eq!(import.ingredient_lines.len(), 30);
    assert_eq!(import.ingredient_lines[15], "16 g spice 16");
    assert_eq!(import.ingredient_lines[29], "30 g spice 30");

    match import.ingredient_error {
        Some(ImportError::IngredientParse {
            failed_ingredients,
            partial_results,
            ..
        }) => {
            assert_eq!(failed_ingredients.len(), 15);
            assert_eq!(partial_results.len(), 15);
        }
        other => panic!("Expected IngredientParse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_import_reports_progress() {
    let lines: Vec<String> = (1..=25).map(|i| format!("{i} tsp salt")).collect();
    let json = recipe_json(&lines);
    let mut seen: Vec<IngredientParsingProgress> = Vec::new();
    let mut record = |progress: &IngredientParsingProgress| seen.push(progress.clone());

    let options = BatchParseOptions {
        on_progress: Some(&mut record),
        ..Default::default()
    };
    import_recipe(&json, &RuleBasedParser::default(), &ImportConfig::default(), options)
        .await
        .unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].parsed_count, 13);
    assert_eq!(seen[1].parsed_count, 25);
}

#[tokio::test]
async fn test_import_without_ingredients_skips_parsing() {
    let json = r#"{"@type":"Recipe","name":"Water","image":"w.jpg","recipeInstructions":"Pour."}"#;
    let mut seen = 0;
    let mut record = |_: &IngredientParsingProgress| seen += 1;
    let options = BatchParseOptions {
        on_progress: Some(&mut record),
        ..Default::default()
    };

    let import = import_recipe(json, &RuleBasedParser::default(), &ImportConfig::default(), options)
        .await
        .unwrap();

    assert_eq!(seen, 0);
    assert!(import.ingredients.is_empty());
    assert!(import.ingredient_lines.is_empty());
    assert!(import.ingredient_error.is_none());
    assert_eq!(import.warnings.len(), 1);
}

#[tokio::test]
async fn test_import_rejects_overlong_lines() {
    let json = recipe_json(&["x".repeat(40)]);
    let config = ImportConfig {
        max_ingredient_length: 30,
        ..Default::default()
    };

    let err = import_recipe(&json, &RuleBasedParser::default(), &config, BatchParseOptions::default())
        .await
        .unwrap_err();

    match err {
        PipelineError::Import(ImportError::Validation { errors }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "recipeIngredient");
        }
        other => panic!("Expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_import_propagates_extraction_errors() {
    let err = import_recipe(
        "not json",
        &RuleBasedParser::default(),
        &ImportConfig::default(),
        BatchParseOptions::default(),
    )
    .await
    .unwrap_err();

    match err {
        PipelineError::Import(error) => {
            assert_eq!(error.kind(), "json_parse");
            assert!(error.is_recoverable());
        }
        other => panic!("Expected Import, got {other:?}"),
    }
}

#[tokio::test]
async fn test_import_cancelled_before_parsing() {
    let json = recipe_json(&pancake_lines());
    let token = CancellationToken::new();
    token.cancel();

    let options = BatchParseOptions {
        signal: Some(&token),
        ..Default::default()
    };
    let err = import_recipe(&json, &RuleBasedParser::default(), &ImportConfig::default(), options)
        .await
        .unwrap_err();

    match err {
        PipelineError::Cancelled(BatchParseError::Cancelled { completed_batches }) => {
            assert_eq!(completed_batches, 0)
        }
        other => panic!("Expected Cancelled, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_first_batch_keeps_input_order() {
    let lines: Vec<String> = (1..=6).map(|i| format!("{i} g item{i}")).collect();
    let json = recipe_json(&lines);
    let rule_based = RuleBasedParser::default();
    let config = ImportConfig {
        max_batch_size: 3,
        ..Default::default()
    };

    let parser = |batch: Vec<String>| {
        let fails = batch.iter().any(|line| line == "1 g item1");
        let parsed: Vec<ParsedIngredient> = batch.iter().map(|l| rule_based.parse_line(l)).collect();
        async move {
            if fails {
                anyhow::bail!("model overloaded");
            }
            Ok(parsed)
        }
    };

    let import = import_recipe(&json, &parser, &config, BatchParseOptions::default())
        .await
        .unwrap();

    assert_eq!(import.ingredients.len(), 3);
    assert_eq!(import.ingredient_lines, lines);
}

#[tokio::test]
async fn test_failures_in_the_middle_stay_in_place() {
    let lines: Vec<String> = (1..=9).map(|i| format!("{i} tsp spice{i}")).collect();
    let json = recipe_json(&lines);
    let rule_based = RuleBasedParser::default();
    let config = ImportConfig {
        max_batch_size: 3,
        ..Default::default()
    };

    let parser = |batch: Vec<String>| {
        let fails = batch.iter().any(|line| line == "4 tsp spice4");
        let parsed: Vec<ParsedIngredient> = batch.iter().map(|l| rule_based.parse_line(l)).collect();
        async move {
            if fails {
                anyhow::bail!("model overloaded");
            }
            Ok(parsed)
        }
    };

    let import = import_recipe(&json, &parser, &config, BatchParseOptions::default())
        .await
        .unwrap();

    assert_eq!(import.ingredient_lines, lines);
    assert!(import.ingredient_error.is_some());
}

#[tokio::test]
async fn test_every_output_ingredient_respects_review_and_metric_rules() {
    let config = ImportConfig {
        manual_review_threshold: 0.8,
        ..Default::default()
    };
    let lines = vec![
        "1 cup milk".to_string(),
        "2 tbsp honey".to_string(),
        "3 oz cheese".to_string(),
        "1 pinch salt".to_string(),
        "250 ml stock".to_string(),
        "2 cloves garlic".to_string(),
        "1 lb beef".to_string(),
        "4 eggs".to_string(),
    ];
    let json = recipe_json(&lines);

    // Confidences straddle the configured threshold; units are raw aliases
    let confidences = [0.79_f32, 0.8, 0.81, 0.5, 0.95, 0.7999, 1.2, -0.1];
    let raw_units = [Some("Cups"), Some("Tbsp."), Some("ounces"), Some("pinch"), Some("mL"), Some("cloves"), Some("lbs"), None];

    let parser = |batch: Vec<String>| async move {
        Ok::<Vec<ParsedIngredient>, anyhow::Error>(
            batch
                .iter()
                .map(|line| {
                    let index = lines_index(line);
                    let mut words = line.splitn(3, ' ');
                    let quantity: f64 = words.next().and_then(|q| q.parse().ok()).unwrap_or(1.0);
                    let mut ingredient = ParsedIngredient::new(line, line)
                        .with_quantity(quantity)
                        .with_method(ParsingMethod::Ai);
                    ingredient.confidence = confidences[index];
                    ingredient.unit = raw_units[index].map(str::to_string);
                    ingredient
                })
                .collect(),
        )
    };

    let import = import_recipe(&json, &parser, &config, BatchParseOptions::default())
        .await
        .unwrap();

    assert_eq!(import.ingredients.len(), lines.len());
    for ingredient in &import.ingredients {
        assert!((0.0..=1.0).contains(&ingredient.confidence));
        if ingredient.confidence < config.manual_review_threshold {
            assert!(ingredient.requires_manual_review, "{}", ingredient.original_text);
        }
        if let Some(metric) = &ingredient.metric {
            let unit = normalize_unit(ingredient.unit.as_deref());
            assert!(unit.is_convertible(), "{}", ingredient.original_text);
            assert!(matches!(metric.unit, Unit::Ml | Unit::G));
        }
    }

    let flagged: Vec<&str> = import
        .ingredients
        .iter()
        .filter(|i| i.requires_manual_review)
        .map(|i| i.original_text.as_str())
        .collect();
    assert_eq!(flagged, vec!["1 cup milk", "1 pinch salt", "2 cloves garlic", "4 eggs"]);

    assert!(import.ingredients[0].metric.is_some());
    assert!(import.ingredients[3].metric.is_none());
    assert!(import.ingredients[4].metric.is_none());
    assert!(import.ingredients[7].metric.is_none());
}

fn lines_index(line: &str) -> usize {
    ["milk", "honey", "cheese", "salt", "stock", "garlic", "beef", "eggs"]
        .iter()
        .position(|name| line.ends_with(name))
        .unwrap_or(0)
}
