//! Full pipeline runs with a per-run output directory and report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use larder_core::pipeline::steps::{DeduplicateStep, EnrichNutritionStep};
use larder_core::pipeline::{run_pipeline, StepOutputStore, StepRegistry, StepResult};
use larder_core::{DedupeOutput, EnrichOutput, RecipeRecord, ResolveConfig, BUILD_ID};
use serde::{Deserialize, Serialize};

use crate::commands::{read_records, units_for, write_json};
use crate::output_store::FileOutputStore;

// ============================================================================
// Configuration
// ============================================================================

pub struct RunConfig {
    pub input: PathBuf,
    pub table: PathBuf,
    pub table_encoding: Option<String>,
    pub output: PathBuf,
    /// Reuse this directory (and any outputs already in it) instead of a fresh one
    pub run_dir: Option<PathBuf>,
    pub runs_root: PathBuf,
    pub from_step: String,
    pub require_nutrition: bool,
    pub resolve: ResolveConfig,
}

// ============================================================================
// Run report
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub build_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub input: String,
    pub table: String,
    pub from_step: String,
    pub config: ResolveConfig,
    pub steps: Vec<StepSummary>,
    pub status: RunStatus,
    pub output_records: usize,
}

/// A step result without its (large) output, which lives in the step directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub step_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl From<&StepResult> for StepSummary {
    fn from(result: &StepResult) -> Self {
        Self {
            step_name: result.step_name.clone(),
            success: result.success,
            error: result.error.clone(),
            duration_ms: result.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Deduplicated records were written but enrichment failed
    CompletedWithoutNutrition,
    Failed,
}

// ============================================================================
// Main orchestrator
// ============================================================================

pub fn run(config: RunConfig) -> Result<RunReport> {
    let now = Utc::now();
    let run_id = now.format("%Y-%m-%d_%H-%M-%S").to_string();
    let run_dir = config
        .run_dir
        .clone()
        .unwrap_or_else(|| config.runs_root.join(&run_id));
    let start_time = Instant::now();

    let records = read_records(&config.input)?;

    let mut registry = StepRegistry::new();
    registry.register(Box::new(DeduplicateStep::new(config.resolve.dedupe)));
    registry.register(Box::new(EnrichNutritionStep::from_table(
        &config.table,
        config.table_encoding.as_deref(),
        units_for(&config.resolve),
        config.resolve.matching,
    )));
    if !registry.contains(&config.from_step) {
        bail!(
            "Unknown step {:?}, expected {} or {}",
            config.from_step,
            DeduplicateStep::NAME,
            EnrichNutritionStep::NAME
        );
    }

    println!("Pipeline Starting");
    println!("=================");
    println!("Run ID: {}", run_id);
    println!("Build: {}", BUILD_ID);
    println!("Records: {}", records.len());
    println!("Run directory: {}", run_dir.display());
    println!();

    let mut store = FileOutputStore::new(&run_dir);
    let results = run_pipeline(&config.from_step, &records, &mut store, &registry);

    let enrich_result = results
        .iter()
        .find(|r| r.step_name == EnrichNutritionStep::NAME);
    let (final_records, status) = match enrich_result {
        Some(result) if result.success => {
            let output: EnrichOutput = serde_json::from_value(result.output.clone())
                .context("Failed to read enrich_nutrition output")?;
            (Some(output.records), RunStatus::Completed)
        }
        _ => match saved_dedupe_records(&store)? {
            Some(records) => (Some(records), RunStatus::CompletedWithoutNutrition),
            None => (None, RunStatus::Failed),
        },
    };

    if let Some(records) = &final_records {
        write_json(&config.output, records)?;
    }

    let report = RunReport {
        run_id: run_id.clone(),
        build_id: BUILD_ID.to_string(),
        started_at: now.to_rfc3339(),
        completed_at: Utc::now().to_rfc3339(),
        input: config.input.display().to_string(),
        table: config.table.display().to_string(),
        from_step: config.from_step.clone(),
        config: config.resolve,
        steps: results.iter().map(StepSummary::from).collect(),
        status,
        output_records: final_records.as_ref().map_or(0, Vec::len),
    };
    save_report(&run_dir, &report)?;

    print_summary(&report, &results, start_time, &config.output);

    match status {
        RunStatus::Completed => {}
        RunStatus::CompletedWithoutNutrition => {
            let reason = failure_reason(&results, EnrichNutritionStep::NAME);
            if config.require_nutrition {
                bail!("Nutrition enrichment failed: {}", reason);
            }
            tracing::warn!(
                reason = %reason,
                "Wrote deduplicated records without nutrition"
            );
        }
        RunStatus::Failed => {
            bail!(
                "Pipeline produced no records: {}",
                failure_reason(&results, DeduplicateStep::NAME)
            );
        }
    }

    Ok(report)
}

/// Records from a deduplicate output, whether from this run or an earlier
/// one in the same directory.
fn saved_dedupe_records(store: &dyn StepOutputStore) -> Result<Option<Vec<RecipeRecord>>> {
    match store.get_output(DeduplicateStep::NAME) {
        Some(value) => {
            let output: DedupeOutput =
                serde_json::from_value(value).context("Failed to read deduplicate output")?;
            Ok(Some(output.records))
        }
        None => Ok(None),
    }
}

fn failure_reason(results: &[StepResult], step_name: &str) -> String {
    results
        .iter()
        .find(|r| r.step_name == step_name)
        .and_then(|r| r.error.clone())
        .unwrap_or_else(|| format!("{} did not run", step_name))
}

fn save_report(run_dir: &Path, report: &RunReport) -> Result<()> {
    write_json(&run_dir.join("report.json"), report)
}

fn print_summary(report: &RunReport, results: &[StepResult], start: Instant, output: &Path) {
    println!("Pipeline Results");
    println!("================");
    for result in results {
        let status = if result.success { "ok" } else { "FAILED" };
        println!(
            "  {:<18} {:<7} {:>6}ms",
            result.step_name, status, result.duration_ms
        );
        if let Some(error) = &result.error {
            println!("    {}", error);
        }
    }
    println!("Duration: {:.1}s", start.elapsed().as_secs_f64());
    println!("Output records: {}", report.output_records);
    if report.status != RunStatus::Failed {
        println!("Output file: {}", output.display());
    }
}
