//! Deduplicate step - cluster near-duplicate records and merge each cluster.

use std::time::Instant;

use crate::config::DedupeConfig;
use crate::dedupe::deduplicate;
use crate::pipeline::steps::EnrichNutritionStep;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};

/// Step that merges duplicate records from the input.
///
/// Needs nothing but the input records, so it runs even when the reference
/// nutrient table is unavailable.
pub struct DeduplicateStep {
    config: DedupeConfig,
}

impl DeduplicateStep {
    /// Step name constant.
    pub const NAME: &'static str = "deduplicate";

    pub fn new(config: DedupeConfig) -> Self {
        Self { config }
    }
}

impl PipelineStep for DeduplicateStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Merge near-duplicate recipe records",
            continues_on_failure: false,
        }
    }

    fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let output = deduplicate(ctx.records.to_vec(), &self.config);

        match serde_json::to_value(&output) {
            Ok(value) => {
                StepResult::succeeded(Self::NAME, value, start, Some(EnrichNutritionStep::NAME))
            }
            Err(e) => StepResult::failed(
                Self::NAME,
                format!("Failed to serialize dedupe output: {}", e),
                start,
                None,
            ),
        }
    }
}
