use std::collections::BTreeSet;

use nutrient_table::{ReferenceNutrientEntry, UnitTable};
use serde::{Deserialize, Serialize};

/// One recipe observation from a single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub name: String,
    /// Name before upstream cleanup, used for provenance when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Provenance tag of the harvesting source (crawler, dataset, manual import...).
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientQuantity>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<String>,
    #[serde(
        default,
        alias = "category_group",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub time_minutes: u32,
    #[serde(default)]
    pub servings: u32,
    #[serde(default)]
    pub nutrition: NutrientProfile,
    /// Names of every record folded into this one. Empty unless merged.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub merged_from: BTreeSet<String>,
    /// Number of ingredients matched to the reference table.
    #[serde(default)]
    pub nutrition_matched: usize,
    /// Ingredients with no reference match, by raw name.
    #[serde(default)]
    pub nutrition_unmatched: Vec<String>,
}

impl RecipeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The name recorded in `merged_from` when this record is merged.
    pub fn provenance_name(&self) -> &str {
        self.original_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// True if an optional text field holds something other than whitespace.
pub fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// One ingredient line as produced by upstream parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientQuantity {
    pub name: String,
    #[serde(default)]
    pub amount: Amount,
    #[serde(default)]
    pub unit: String,
}

impl IngredientQuantity {
    pub fn new(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: Amount::Value(amount),
            unit: unit.into(),
        }
    }

    /// Gram equivalent of this quantity under `units`.
    pub fn grams(&self, units: &UnitTable) -> f64 {
        match &self.amount {
            Amount::Value(value) => units.grams_for(*value, &self.unit),
            Amount::Text(text) => units.to_grams(text, &self.unit),
            Amount::Missing => units.to_grams("", &self.unit),
        }
    }
}

/// Ingredient amount: a number, or the text a source gave ("1/2", "약간").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Value(f64),
    Text(String),
    #[default]
    Missing,
}

/// Recipe nutrition totals.
///
/// kcal for calories, grams for protein/fat/carbs, mg for sodium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub sodium: f64,
}

impl NutrientProfile {
    /// All-zero nutrition means "not yet computed".
    pub fn is_unset(&self) -> bool {
        self.calories == 0.0
            && self.protein == 0.0
            && self.fat == 0.0
            && self.carbs == 0.0
            && self.sodium == 0.0
    }

    /// Add `ratio` times a per-100 g profile.
    pub fn add_scaled(&mut self, per_100g: &NutrientProfile, ratio: f64) {
        self.calories += per_100g.calories * ratio;
        self.protein += per_100g.protein * ratio;
        self.fat += per_100g.fat * ratio;
        self.carbs += per_100g.carbs * ratio;
        self.sodium += per_100g.sodium * ratio;
    }

    /// Every value rounded to one decimal place.
    pub fn rounded(&self) -> Self {
        Self {
            calories: round1(self.calories),
            protein: round1(self.protein),
            fat: round1(self.fat),
            carbs: round1(self.carbs),
            sodium: round1(self.sodium),
        }
    }
}

impl From<&ReferenceNutrientEntry> for NutrientProfile {
    fn from(entry: &ReferenceNutrientEntry) -> Self {
        Self {
            calories: entry.calories,
            protein: entry.protein,
            fat: entry.fat,
            carbs: entry.carbs,
            sodium: entry.sodium,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Indices of input records believed to describe the same recipe.
///
/// Indices are ascending. A singleton group means no duplicate was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub indices: Vec<usize>,
}

/// Audit entry for one merged group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateLogEntry {
    pub indices: Vec<usize>,
    pub names: Vec<String>,
    pub count: usize,
}

/// A successful ingredient match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedIngredient {
    /// Ingredient name as given in the recipe.
    pub name: String,
    /// Canonical name of the reference entry.
    pub matched_to: String,
    /// Match confidence, two decimal places.
    pub score: f64,
    pub amount_g: f64,
    /// Nutrients per 100 g of the matched reference entry.
    #[serde(default)]
    pub per_100g: NutrientProfile,
}

impl MatchedIngredient {
    /// What this ingredient adds to the recipe total.
    pub fn contribution(&self) -> NutrientProfile {
        let mut profile = NutrientProfile::default();
        profile.add_scaled(&self.per_100g, self.amount_g / 100.0);
        profile
    }
}

/// Outcome of matching one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched(MatchedIngredient),
    Unmatched,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeStats {
    pub input: usize,
    /// Groups with more than one member.
    pub groups: usize,
    pub removed: usize,
    pub output: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStats {
    pub total: usize,
    /// Every ingredient matched.
    pub fully_matched: usize,
    /// Some but not all ingredients matched.
    pub partially_matched: usize,
    /// No ingredient matched.
    pub unmatched: usize,
    /// Records whose existing nutrition was left untouched.
    pub kept_existing: usize,
}

/// Output from the deduplicate step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupeOutput {
    pub records: Vec<RecipeRecord>,
    /// One entry per merged group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<DuplicateLogEntry>,
    pub stats: DedupeStats,
}

/// Output from the enrich_nutrition step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichOutput {
    pub records: Vec<RecipeRecord>,
    pub stats: EnrichmentStats,
}
