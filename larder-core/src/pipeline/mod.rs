//! Step pipeline for recipe resolution.
//!
//! This module provides a trait-based pipeline system where:
//! - Steps are defined via the `PipelineStep` trait
//! - Each step returns `next_step` to indicate what runs next
//! - Outputs go through a `StepOutputStore`, so a run can resume from a
//!   later step using outputs saved by an earlier run

mod executor;
mod step;
pub mod steps;

pub use executor::{run_pipeline, StepRegistry};
pub use step::{
    MemoryOutputStore, PipelineStep, StepContext, StepMetadata, StepOutputStore, StepResult,
};

use nutrient_table::UnitTable;

use crate::config::ResolveConfig;
use crate::nutrition::IngredientMatcher;
use steps::{DeduplicateStep, EnrichNutritionStep};

/// Registry with the deduplicate and enrich_nutrition steps.
pub fn default_registry(
    config: &ResolveConfig,
    matcher: Box<dyn IngredientMatcher>,
    units: UnitTable,
) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(Box::new(DeduplicateStep::new(config.dedupe)));
    registry.register(Box::new(EnrichNutritionStep::new(
        matcher,
        units,
        config.matching,
    )));
    registry
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use nutrient_table::{ReferenceNutrientEntry, ReferenceNutrientIndex};

    use super::*;
    use crate::types::{EnrichOutput, IngredientQuantity, RecipeRecord};

    #[test]
    fn step_names_are_unique() {
        let names = [DeduplicateStep::NAME, EnrichNutritionStep::NAME];

        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(
            names.len(),
            unique.len(),
            "Duplicate step names detected! Names: {:?}",
            names
        );
    }

    fn registry() -> StepRegistry {
        let index = ReferenceNutrientIndex::from_entries([ReferenceNutrientEntry {
            calories: 242.0,
            protein: 27.0,
            ..ReferenceNutrientEntry::named("돼지고기")
        }]);
        default_registry(
            &ResolveConfig::default(),
            Box::new(index),
            UnitTable::standard(),
        )
    }

    #[test]
    fn test_full_run_follows_next_step() {
        let records = vec![
            RecipeRecord {
                ingredients: vec![IngredientQuantity::new("돼지고기", 300.0, "g")],
                ..RecipeRecord::new("김치찌개")
            },
            RecipeRecord::new("김치 찌개"),
        ];
        let mut store = MemoryOutputStore::new();

        let results = run_pipeline(DeduplicateStep::NAME, &records, &mut store, &registry());
        let names: Vec<_> = results.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(names, vec!["deduplicate", "enrich_nutrition"]);
        assert!(results.iter().all(|r| r.success));

        let enriched: EnrichOutput =
            serde_json::from_value(store.get_output(EnrichNutritionStep::NAME).unwrap()).unwrap();
        assert_eq!(enriched.records.len(), 1);
        assert_eq!(enriched.records[0].nutrition.calories, 726.0);
        assert_eq!(enriched.records[0].merged_from.len(), 2);
    }

    #[test]
    fn test_unknown_step_stops() {
        let mut store = MemoryOutputStore::new();
        let results = run_pipeline("no_such_step", &[], &mut store, &registry());
        assert!(results.is_empty());
    }

    #[test]
    fn test_failed_enrichment_keeps_dedupe_output() {
        let mut registry = StepRegistry::new();
        registry.register(Box::new(DeduplicateStep::new(Default::default())));
        registry.register(Box::new(EnrichNutritionStep::from_table(
            std::path::Path::new("/nonexistent/foods.csv"),
            None,
            UnitTable::standard(),
            Default::default(),
        )));

        let records = vec![RecipeRecord::new("잡채")];
        let mut store = MemoryOutputStore::new();
        let results = run_pipeline(DeduplicateStep::NAME, &records, &mut store, &registry);

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(store.get_output(DeduplicateStep::NAME).is_some());
        assert!(store.get_output(EnrichNutritionStep::NAME).is_none());
    }
}
