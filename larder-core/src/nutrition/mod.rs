//! Ingredient-to-reference matching and nutrient aggregation.
//!
//! Every ingredient of a record is matched against the reference index; each
//! match contributes its per-100 g profile scaled by the ingredient's gram
//! weight. Matching is a full scan of the index per ingredient, which is the
//! dominant cost of enrichment. Records are processed in parallel and written
//! back in input order.

use std::path::Path;

use nutrient_table::{ReferenceMatch, ReferenceNutrientIndex, UnitTable};
use rayon::prelude::*;

use crate::config::MatchConfig;
use crate::error::EnrichError;
use crate::types::{
    EnrichOutput, EnrichmentStats, IngredientQuantity, MatchResult, MatchedIngredient,
    NutrientProfile, RecipeRecord,
};

/// Looks up the reference entry an ingredient name refers to.
///
/// Implementations are shared read-only across worker threads.
pub trait IngredientMatcher: Send + Sync {
    /// Best-scoring entry at or above `threshold`.
    fn best_match(&self, name: &str, threshold: f64) -> Option<ReferenceMatch<'_>>;
}

impl IngredientMatcher for ReferenceNutrientIndex {
    fn best_match(&self, name: &str, threshold: f64) -> Option<ReferenceMatch<'_>> {
        self.find_best_match(name, threshold)
    }
}

/// Load the reference table enrichment depends on.
///
/// A table with no usable rows is an error: enriching against it would
/// silently produce all-zero nutrition.
pub fn load_reference_index(
    path: &Path,
    encoding: Option<&str>,
) -> Result<ReferenceNutrientIndex, EnrichError> {
    let index = ReferenceNutrientIndex::from_path(path, encoding)?;
    if index.is_empty() {
        return Err(EnrichError::EmptyReferenceTable(path.display().to_string()));
    }
    Ok(index)
}

/// Match one ingredient and work out its gram weight.
pub fn match_ingredient(
    ingredient: &IngredientQuantity,
    matcher: &dyn IngredientMatcher,
    units: &UnitTable,
    config: &MatchConfig,
) -> MatchResult {
    let Some(found) = matcher.best_match(&ingredient.name, config.match_threshold) else {
        return MatchResult::Unmatched;
    };
    MatchResult::Matched(MatchedIngredient {
        name: ingredient.name.clone(),
        matched_to: found.entry.name.clone(),
        score: (found.score * 100.0).round() / 100.0,
        amount_g: ingredient.grams(units),
        per_100g: NutrientProfile::from(found.entry),
    })
}

/// Nutrition computed for one record, before it is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutritionResult {
    /// Totals rounded to one decimal place.
    pub nutrition: NutrientProfile,
    pub matched: Vec<MatchedIngredient>,
    /// Raw names of ingredients with no reference match.
    pub unmatched: Vec<String>,
}

/// Sum the scaled reference profiles of every matched ingredient.
pub fn aggregate_record(
    record: &RecipeRecord,
    matcher: &dyn IngredientMatcher,
    units: &UnitTable,
    config: &MatchConfig,
) -> NutritionResult {
    let mut totals = NutrientProfile::default();
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for ingredient in &record.ingredients {
        match match_ingredient(ingredient, matcher, units, config) {
            MatchResult::Matched(ingredient_match) => {
                let ratio = ingredient_match.amount_g / 100.0;
                totals.add_scaled(&ingredient_match.per_100g, ratio);
                matched.push(ingredient_match);
            }
            MatchResult::Unmatched => unmatched.push(ingredient.name.clone()),
        }
    }

    NutritionResult {
        nutrition: totals.rounded(),
        matched,
        unmatched,
    }
}

/// How a record fared, for [`EnrichmentStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    Full,
    Partial,
    None,
}

impl NutritionResult {
    fn coverage(&self) -> Coverage {
        match (self.matched.is_empty(), self.unmatched.is_empty()) {
            (false, true) => Coverage::Full,
            (false, false) => Coverage::Partial,
            (true, _) => Coverage::None,
        }
    }
}

/// Write a result into a record. Returns false if existing nutrition was kept.
///
/// Nutrition is only replaced when the record's profile is all zero; the
/// match diagnostics are always refreshed.
pub fn apply(record: &mut RecipeRecord, result: NutritionResult) -> bool {
    let replaced = record.nutrition.is_unset();
    if replaced {
        record.nutrition = result.nutrition;
    }
    record.nutrition_matched = result.matched.len();
    record.nutrition_unmatched = result.unmatched;
    replaced
}

/// Enrich every record with aggregated nutrition.
pub fn enrich_records(
    records: Vec<RecipeRecord>,
    matcher: &dyn IngredientMatcher,
    units: &UnitTable,
    config: &MatchConfig,
) -> EnrichOutput {
    let outcomes: Vec<(RecipeRecord, Coverage, bool)> = records
        .into_par_iter()
        .map(|mut record| {
            let result = aggregate_record(&record, matcher, units, config);
            let coverage = result.coverage();
            let replaced = apply(&mut record, result);
            (record, coverage, replaced)
        })
        .collect();

    let mut stats = EnrichmentStats {
        total: outcomes.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(outcomes.len());
    for (record, coverage, replaced) in outcomes {
        match coverage {
            Coverage::Full => stats.fully_matched += 1,
            Coverage::Partial => stats.partially_matched += 1,
            Coverage::None => stats.unmatched += 1,
        }
        if !replaced {
            stats.kept_existing += 1;
        }
        records.push(record);
    }

    tracing::info!(
        total = stats.total,
        fully_matched = stats.fully_matched,
        partially_matched = stats.partially_matched,
        unmatched = stats.unmatched,
        kept_existing = stats.kept_existing,
        "enriched nutrition"
    );

    EnrichOutput { records, stats }
}
