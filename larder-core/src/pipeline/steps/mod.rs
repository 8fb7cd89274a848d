//! Pipeline step implementations.

mod deduplicate;
mod enrich_nutrition;

pub use deduplicate::DeduplicateStep;
pub use enrich_nutrition::EnrichNutritionStep;
