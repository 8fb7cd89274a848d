pub mod config;
pub mod dedupe;
pub mod error;
pub mod nutrition;
pub mod pipeline;
pub mod types;

pub use config::{ClusterStrategy, DedupeConfig, MatchConfig, ResolveConfig};
pub use dedupe::{completeness, deduplicate, find_duplicate_groups, is_duplicate, merge_group};
pub use error::{ConfigError, EnrichError, StoreError};
pub use nutrition::{
    aggregate_record, enrich_records, load_reference_index, match_ingredient, IngredientMatcher,
};
pub use types::{
    Amount, DedupeOutput, DedupeStats, DuplicateGroup, DuplicateLogEntry, EnrichOutput,
    EnrichmentStats, IngredientQuantity, MatchResult, MatchedIngredient, NutrientProfile,
    RecipeRecord,
};

/// Unique identifier for this build, generated at compile time.
/// Recorded in run reports to tell which build produced a set of step outputs.
pub const BUILD_ID: &str = env!("LARDER_BUILD_ID");
