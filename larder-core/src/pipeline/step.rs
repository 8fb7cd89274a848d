//! Pipeline step trait and supporting types.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreError;
use crate::types::RecipeRecord;

/// Metadata about a pipeline step.
#[derive(Debug, Clone)]
pub struct StepMetadata {
    /// Unique identifier for this step (e.g., "deduplicate", "enrich_nutrition")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// If true, failures don't fail the overall pipeline
    pub continues_on_failure: bool,
}

/// Result of executing a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Name of the step that produced this result
    pub step_name: String,
    /// Whether the step succeeded
    pub success: bool,
    /// The output data (JSON)
    pub output: JsonValue,
    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// How long the step took in milliseconds
    pub duration_ms: u64,
    /// Name of the next step to run (the step decides what's next)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

impl StepResult {
    pub fn succeeded(
        step_name: &str,
        output: JsonValue,
        started: Instant,
        next_step: Option<&str>,
    ) -> Self {
        Self {
            step_name: step_name.to_string(),
            success: true,
            output,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
            next_step: next_step.map(str::to_string),
        }
    }

    pub fn failed(
        step_name: &str,
        error: impl Into<String>,
        started: Instant,
        next_step: Option<&str>,
    ) -> Self {
        let error = error.into();
        Self {
            step_name: step_name.to_string(),
            success: false,
            output: serde_json::json!({ "error": error }),
            error: Some(error),
            duration_ms: started.elapsed().as_millis() as u64,
            next_step: next_step.map(str::to_string),
        }
    }
}

/// Abstraction for reading/writing step outputs.
/// Implemented in memory here and on disk by the CLI.
pub trait StepOutputStore: Send + Sync {
    /// Get the output from a previous step by name.
    fn get_output(&self, step_name: &str) -> Option<JsonValue>;

    /// Save the output from a step.
    fn save_output(&mut self, step_name: &str, output: &JsonValue) -> Result<(), StoreError>;
}

/// Step outputs held in memory for the duration of one run.
#[derive(Debug, Default)]
pub struct MemoryOutputStore {
    outputs: HashMap<String, JsonValue>,
}

impl MemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepOutputStore for MemoryOutputStore {
    fn get_output(&self, step_name: &str) -> Option<JsonValue> {
        self.outputs.get(step_name).cloned()
    }

    fn save_output(&mut self, step_name: &str, output: &JsonValue) -> Result<(), StoreError> {
        self.outputs.insert(step_name.to_string(), output.clone());
        Ok(())
    }
}

/// Context provided to steps during execution.
pub struct StepContext<'a> {
    /// Records as read from the input
    pub records: &'a [RecipeRecord],
    /// Access to prior step outputs
    pub outputs: &'a dyn StepOutputStore,
}

/// The main trait for pipeline steps.
pub trait PipelineStep: Send + Sync {
    /// Return metadata about this step.
    fn metadata(&self) -> StepMetadata;

    /// Execute the step.
    fn execute(&self, ctx: &StepContext<'_>) -> StepResult;
}
