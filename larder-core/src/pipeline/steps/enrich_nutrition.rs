//! Enrich step - aggregate per-recipe nutrition from the reference table.

use std::path::Path;
use std::time::Instant;

use nutrient_table::UnitTable;

use crate::config::MatchConfig;
use crate::error::EnrichError;
use crate::nutrition::{enrich_records, load_reference_index, IngredientMatcher};
use crate::pipeline::steps::DeduplicateStep;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::types::{DedupeOutput, RecipeRecord};

/// Step that fills in nutrition totals and match diagnostics.
///
/// Works on the deduplicate output when one is stored, otherwise on the raw
/// input. An unusable reference table fails this step only.
pub struct EnrichNutritionStep {
    reference: Result<Box<dyn IngredientMatcher>, EnrichError>,
    units: UnitTable,
    config: MatchConfig,
}

impl EnrichNutritionStep {
    /// Step name constant.
    pub const NAME: &'static str = "enrich_nutrition";

    pub fn new(
        matcher: Box<dyn IngredientMatcher>,
        units: UnitTable,
        config: MatchConfig,
    ) -> Self {
        Self {
            reference: Ok(matcher),
            units,
            config,
        }
    }

    /// Load the reference table now; a load failure is reported when the
    /// step runs.
    pub fn from_table(
        path: &Path,
        encoding: Option<&str>,
        units: UnitTable,
        config: MatchConfig,
    ) -> Self {
        let reference = load_reference_index(path, encoding)
            .map(|index| Box::new(index) as Box<dyn IngredientMatcher>);
        Self {
            reference,
            units,
            config,
        }
    }

    fn input_records(ctx: &StepContext<'_>) -> Result<Vec<RecipeRecord>, String> {
        match ctx.outputs.get_output(DeduplicateStep::NAME) {
            Some(value) => serde_json::from_value::<DedupeOutput>(value)
                .map(|output| output.records)
                .map_err(|e| format!("Failed to parse deduplicate output: {}", e)),
            None => Ok(ctx.records.to_vec()),
        }
    }
}

impl PipelineStep for EnrichNutritionStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Aggregate recipe nutrition from the reference table",
            continues_on_failure: true, // deduplicated records are still usable
        }
    }

    fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let matcher = match &self.reference {
            Ok(matcher) => matcher.as_ref(),
            Err(e) => return StepResult::failed(Self::NAME, e.to_string(), start, None),
        };

        let records = match Self::input_records(ctx) {
            Ok(records) => records,
            Err(e) => return StepResult::failed(Self::NAME, e, start, None),
        };

        let output = enrich_records(records, matcher, &self.units, &self.config);

        match serde_json::to_value(&output) {
            Ok(value) => StepResult::succeeded(Self::NAME, value, start, None),
            Err(e) => StepResult::failed(
                Self::NAME,
                format!("Failed to serialize enrich output: {}", e),
                start,
                None,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{MemoryOutputStore, StepOutputStore};
    use crate::types::{EnrichOutput, IngredientQuantity};
    use nutrient_table::{ReferenceNutrientEntry, ReferenceNutrientIndex};

    fn step() -> EnrichNutritionStep {
        let index = ReferenceNutrientIndex::from_entries([ReferenceNutrientEntry {
            calories: 242.0,
            ..ReferenceNutrientEntry::named("돼지고기")
        }]);
        EnrichNutritionStep::new(
            Box::new(index),
            UnitTable::standard(),
            MatchConfig::default(),
        )
    }

    fn pork_stew(name: &str, grams: f64) -> RecipeRecord {
        RecipeRecord {
            ingredients: vec![IngredientQuantity::new("돼지고기", grams, "g")],
            ..RecipeRecord::new(name)
        }
    }

    #[test]
    fn test_uses_raw_input_without_dedupe_output() {
        let records = vec![pork_stew("김치찌개", 300.0)];
        let store = MemoryOutputStore::new();
        let ctx = StepContext {
            records: &records,
            outputs: &store,
        };

        let result = step().execute(&ctx);
        assert!(result.success);
        let output: EnrichOutput = serde_json::from_value(result.output).unwrap();
        assert_eq!(output.records[0].nutrition.calories, 726.0);
        assert_eq!(output.records[0].nutrition_matched, 1);
    }

    #[test]
    fn test_prefers_dedupe_output() {
        let raw = vec![pork_stew("raw", 100.0)];
        let deduped = DedupeOutput {
            records: vec![pork_stew("deduped", 200.0)],
            ..Default::default()
        };
        let mut store = MemoryOutputStore::new();
        store
            .save_output(
                DeduplicateStep::NAME,
                &serde_json::to_value(&deduped).unwrap(),
            )
            .unwrap();
        let ctx = StepContext {
            records: &raw,
            outputs: &store,
        };

        let output: EnrichOutput = serde_json::from_value(step().execute(&ctx).output).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].name, "deduped");
        assert_eq!(output.records[0].nutrition.calories, 484.0);
    }

    #[test]
    fn test_missing_table_fails_step() {
        let step = EnrichNutritionStep::from_table(
            Path::new("/nonexistent/foods.csv"),
            None,
            UnitTable::standard(),
            MatchConfig::default(),
        );
        assert!(step.metadata().continues_on_failure);

        let records = vec![pork_stew("김치찌개", 300.0)];
        let store = MemoryOutputStore::new();
        let ctx = StepContext {
            records: &records,
            outputs: &store,
        };
        let result = step.execute(&ctx);
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Reference nutrient table")));
    }
}
