//! # Unit Normalization Module
//!
//! This module canonicalizes free-form unit tokens ("Tablespoons", "tbsp.", "mL")
//! into a fixed vocabulary so conversion and formatting code never has to
//! special-case synonyms.
//!
//! ## Families
//!
//! Every canonical unit belongs to exactly one family:
//!
//! - **Volume (imperial)**: cup, tbsp, tsp
//! - **Weight (imperial)**: oz, lb
//! - **Volume (metric)**: ml, l
//! - **Weight (metric)**: g, kg
//! - **Non-convertible**: pinch, dash, clove, whole, can, package, each
//!
//! `each` is the fallback for absent or unrecognized units.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical measurement units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Cup,
    Tbsp,
    Tsp,
    Oz,
    Lb,
    Ml,
    L,
    G,
    Kg,
    Pinch,
    Dash,
    Clove,
    Whole,
    Can,
    Package,
    Each,
}

/// The conversion family a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    VolumeImperial,
    WeightImperial,
    VolumeMetric,
    WeightMetric,
    NonConvertible,
}

/// A metric quantity paired with its unit
///
/// Kept as one value so a quantity can never exist without its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAmount {
    pub quantity: f64,
    pub unit: Unit,
}

const ML_PER_CUP: f64 = 236.588;
const ML_PER_TBSP: f64 = 14.787;
const ML_PER_TSP: f64 = 4.929;
const GRAMS_PER_OZ: f64 = 28.3495;
const GRAMS_PER_LB: f64 = 453.592;

lazy_static! {
    /// Surface forms mapped to their canonical unit, keyed by lowercase spelling
    static ref UNIT_ALIASES: HashMap<&'static str, Unit> = {
        let mut map = HashMap::new();

        // Volume (imperial)
        map.insert("cups", Unit::Cup);
        map.insert("c", Unit::Cup);
        map.insert("c.", Unit::Cup);
        map.insert("tablespoon", Unit::Tbsp);
        map.insert("tablespoons", Unit::Tbsp);
        map.insert("tbsp.", Unit::Tbsp);
        map.insert("tbsps", Unit::Tbsp);
        map.insert("tbs", Unit::Tbsp);
        map.insert("tbl", Unit::Tbsp);
        map.insert("teaspoon", Unit::Tsp);
        map.insert("teaspoons", Unit::Tsp);
        map.insert("tsp.", Unit::Tsp);
        map.insert("tsps", Unit::Tsp);

        // Weight (imperial)
        map.insert("ounce", Unit::Oz);
        map.insert("ounces", Unit::Oz);
        map.insert("oz.", Unit::Oz);
        map.insert("pound", Unit::Lb);
        map.insert("pounds", Unit::Lb);
        map.insert("lbs", Unit::Lb);
        map.insert("lb.", Unit::Lb);
        map.insert("lbs.", Unit::Lb);

        // Volume (metric)
        map.insert("milliliter", Unit::Ml);
        map.insert("milliliters", Unit::Ml);
        map.insert("millilitre", Unit::Ml);
        map.insert("millilitres", Unit::Ml);
        map.insert("mls", Unit::Ml);
        map.insert("liter", Unit::L);
        map.insert("liters", Unit::L);
        map.insert("litre", Unit::L);
        map.insert("litres", Unit::L);

        // Weight (metric)
        map.insert("gram", Unit::G);
        map.insert("grams", Unit::G);
        map.insert("gramme", Unit::G);
        map.insert("grammes", Unit::G);
        map.insert("gr", Unit::G);
        map.insert("kilogram", Unit::Kg);
        map.insert("kilograms", Unit::Kg);
        map.insert("kilo", Unit::Kg);
        map.insert("kilos", Unit::Kg);
        map.insert("kgs", Unit::Kg);

        // Non-convertible
        map.insert("pinches", Unit::Pinch);
        map.insert("dashes", Unit::Dash);
        map.insert("cloves", Unit::Clove);
        map.insert("cans", Unit::Can);
        map.insert("tin", Unit::Can);
        map.insert("tins", Unit::Can);
        map.insert("packages", Unit::Package);
        map.insert("pkg", Unit::Package);
        map.insert("pkgs", Unit::Package);
        map.insert("packet", Unit::Package);
        map.insert("packets", Unit::Package);
        map.insert("piece", Unit::Each);
        map.insert("pieces", Unit::Each);
        map.insert("item", Unit::Each);
        map.insert("items", Unit::Each);
        map.insert("ea", Unit::Each);

        map
    };
}

impl Unit {
    /// All canonical units, in vocabulary order
    pub const ALL: [Unit; 16] = [
        Unit::Cup,
        Unit::Tbsp,
        Unit::Tsp,
        Unit::Oz,
        Unit::Lb,
        Unit::Ml,
        Unit::L,
        Unit::G,
        Unit::Kg,
        Unit::Pinch,
        Unit::Dash,
        Unit::Clove,
        Unit::Whole,
        Unit::Can,
        Unit::Package,
        Unit::Each,
    ];

    /// The canonical token for this unit
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Cup => "cup",
            Unit::Tbsp => "tbsp",
            Unit::Tsp => "tsp",
            Unit::Oz => "oz",
            Unit::Lb => "lb",
            Unit::Ml => "ml",
            Unit::L => "l",
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Pinch => "pinch",
            Unit::Dash => "dash",
            Unit::Clove => "clove",
            Unit::Whole => "whole",
            Unit::Can => "can",
            Unit::Package => "package",
            Unit::Each => "each",
        }
    }

    /// Look up a canonical token exactly (already case-folded and trimmed)
    pub fn from_canonical(token: &str) -> Option<Unit> {
        Unit::ALL.iter().copied().find(|unit| unit.as_str() == token)
    }

    /// On-screen label, which differs from the token for metric volumes
    pub fn display_label(&self) -> &'static str {
        match self {
            Unit::Ml => "mL",
            Unit::L => "L",
            other => other.as_str(),
        }
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            Unit::Cup | Unit::Tbsp | Unit::Tsp => UnitFamily::VolumeImperial,
            Unit::Oz | Unit::Lb => UnitFamily::WeightImperial,
            Unit::Ml | Unit::L => UnitFamily::VolumeMetric,
            Unit::G | Unit::Kg => UnitFamily::WeightMetric,
            Unit::Pinch
            | Unit::Dash
            | Unit::Clove
            | Unit::Whole
            | Unit::Can
            | Unit::Package
            | Unit::Each => UnitFamily::NonConvertible,
        }
    }

    /// Check if this unit has a metric counterpart we convert to
    pub fn is_convertible(&self) -> bool {
        matches!(
            self.family(),
            UnitFamily::VolumeImperial | UnitFamily::WeightImperial
        )
    }

    pub fn is_metric(&self) -> bool {
        matches!(
            self.family(),
            UnitFamily::VolumeMetric | UnitFamily::WeightMetric
        )
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a free-form unit string to its canonical unit
///
/// The input is trimmed and lowercased. Canonical tokens win over aliases,
/// then the alias table is consulted, and anything else becomes [`Unit::Each`].
///
/// # Examples
///
/// ```rust
/// use recipe_import::units::{normalize_unit, Unit};
///
/// assert_eq!(normalize_unit(Some(" Tablespoons ")), Unit::Tbsp);
/// assert_eq!(normalize_unit(Some("mL")), Unit::Ml);
/// assert_eq!(normalize_unit(None), Unit::Each);
/// assert_eq!(normalize_unit(Some("totally-unknown-unit")), Unit::Each);
/// ```
pub fn normalize_unit(input: Option<&str>) -> Unit {
    let folded = match input.map(|s| s.trim().to_lowercase()) {
        Some(s) if !s.is_empty() => s,
        _ => return Unit::Each,
    };

    if let Some(unit) = Unit::from_canonical(&folded) {
        return unit;
    }

    UNIT_ALIASES.get(folded.as_str()).copied().unwrap_or(Unit::Each)
}

/// Check whether a unit string is canonical or has a registered alias
pub fn is_valid_unit(input: Option<&str>) -> bool {
    let folded = match input.map(|s| s.trim().to_lowercase()) {
        Some(s) if !s.is_empty() => s,
        _ => return false,
    };

    Unit::from_canonical(&folded).is_some() || UNIT_ALIASES.contains_key(folded.as_str())
}

/// Convert an imperial quantity into its metric equivalent
///
/// Volumes convert to millilitres and weights to grams. Metric and
/// non-convertible units return `None`.
pub fn to_metric(quantity: f64, unit: Unit) -> Option<MetricAmount> {
    let (factor, metric_unit) = match unit {
        Unit::Cup => (ML_PER_CUP, Unit::Ml),
        Unit::Tbsp => (ML_PER_TBSP, Unit::Ml),
        Unit::Tsp => (ML_PER_TSP, Unit::Ml),
        Unit::Oz => (GRAMS_PER_OZ, Unit::G),
        Unit::Lb => (GRAMS_PER_LB, Unit::G),
        _ => return None,
    };

    Some(MetricAmount {
        quantity: round_metric(quantity * factor),
        unit: metric_unit,
    })
}

/// Whole numbers from 10 upwards, one decimal place below that
fn round_metric(value: f64) -> f64 {
    if value >= 10.0 {
        value.round()
    } else {
        (value * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_unit_has_one_family() {
        for unit in Unit::ALL {
            let family = unit.family();
            assert_eq!(unit.is_convertible(), matches!(family, UnitFamily::VolumeImperial | UnitFamily::WeightImperial));
        }
        assert_eq!(Unit::Each.family(), UnitFamily::NonConvertible);
        assert_eq!(Unit::Ml.family(), UnitFamily::VolumeMetric);
    }

    #[test]
    fn test_aliases_never_shadow_canonical_tokens() {
        for unit in Unit::ALL {
            assert!(!UNIT_ALIASES.contains_key(unit.as_str()), "{unit} is also an alias");
        }
    }

    #[test]
    fn test_aliases_are_lowercase() {
        for alias in UNIT_ALIASES.keys() {
            assert_eq!(*alias, alias.to_lowercase());
        }
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(Unit::Ml.display_label(), "mL");
        assert_eq!(Unit::L.display_label(), "L");
        assert_eq!(Unit::Cup.display_label(), "cup");
    }

    #[test]
    fn test_to_metric() {
        assert_eq!(
            to_metric(1.0, Unit::Cup),
            Some(MetricAmount { quantity: 237.0, unit: Unit::Ml })
        );
        assert_eq!(
            to_metric(1.0, Unit::Tsp),
            Some(MetricAmount { quantity: 4.9, unit: Unit::Ml })
        );
        assert_eq!(
            to_metric(2.0, Unit::Lb),
            Some(MetricAmount { quantity: 907.0, unit: Unit::G })
        );
        assert_eq!(to_metric(250.0, Unit::G), None);
        assert_eq!(to_metric(1.0, Unit::Pinch), None);
    }
}
