mod commands;
mod output_store;
mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use larder_core::config::{parse_grams, parse_ratio};
use larder_core::pipeline::steps::DeduplicateStep;
use larder_core::{ClusterStrategy, ResolveConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::run::RunConfig;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Recipe deduplication and nutrition enrichment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deduplicate then enrich, saving every step output under a run directory
    Run {
        /// Recipe records (JSON array)
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        /// Where to write the resulting records
        #[arg(long)]
        output: PathBuf,
        /// Run directory; reusing one resumes from its saved step outputs
        #[arg(long)]
        run_dir: Option<PathBuf>,
        /// Parent of generated run directories
        #[arg(long, env = "LARDER_RUNS_DIR", default_value = "data/larder-runs")]
        runs_root: PathBuf,
        /// Step to start from (deduplicate or enrich_nutrition)
        #[arg(long, default_value = DeduplicateStep::NAME)]
        from_step: String,
        /// Fail instead of writing records without nutrition
        #[arg(long)]
        require_nutrition: bool,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Merge near-duplicate records
    Dedupe {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write the merged groups as JSON
        #[arg(long)]
        log: Option<PathBuf>,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Aggregate nutrition for records from the reference table
    Enrich {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        table: TableArgs,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Show the reference entry each ingredient name matches
    Lookup {
        #[command(flatten)]
        table: TableArgs,
        /// Ingredient names to look up
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        tuning: TuningArgs,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Reference nutrient table (CSV, UTF-8 or EUC-KR)
    #[arg(long, env = "LARDER_TABLE")]
    table: PathBuf,
    /// Encoding label for the table (e.g. euc-kr); detected when omitted
    #[arg(long, env = "LARDER_TABLE_ENCODING")]
    table_encoding: Option<String>,
}

/// Overrides for values otherwise taken from LARDER_* variables or defaults.
#[derive(Args)]
struct TuningArgs {
    /// Name similarity at which records are duplicates
    #[arg(long, value_parser = ratio_arg)]
    name_threshold: Option<f64>,
    /// Name similarity at which ingredient overlap is checked
    #[arg(long, value_parser = ratio_arg)]
    candidate_threshold: Option<f64>,
    /// Ingredient Jaccard similarity required for candidates
    #[arg(long, value_parser = ratio_arg)]
    ingredient_overlap: Option<f64>,
    /// Minimum ingredient-to-reference match score
    #[arg(long, value_parser = ratio_arg)]
    match_threshold: Option<f64>,
    /// Grams assumed for quantities without a known unit
    #[arg(long, value_parser = grams_arg)]
    default_piece_grams: Option<f64>,
    /// How duplicate pairs become groups
    #[arg(long)]
    strategy: Option<ClusterStrategy>,
}

fn ratio_arg(raw: &str) -> Result<f64, String> {
    parse_ratio("value", raw).map_err(|e| e.to_string())
}

fn grams_arg(raw: &str) -> Result<f64, String> {
    parse_grams("value", raw).map_err(|e| e.to_string())
}

impl TuningArgs {
    fn resolve(&self) -> Result<ResolveConfig> {
        let mut config =
            ResolveConfig::from_env().context("Invalid LARDER_* environment variable")?;

        if let Some(v) = self.name_threshold {
            config.dedupe.name_threshold = v;
        }
        if let Some(v) = self.candidate_threshold {
            config.dedupe.candidate_threshold = v;
        }
        if let Some(v) = self.ingredient_overlap {
            config.dedupe.ingredient_overlap = v;
        }
        if let Some(v) = self.match_threshold {
            config.matching.match_threshold = v;
        }
        if let Some(v) = self.default_piece_grams {
            config.default_piece_grams = v;
        }
        if let Some(strategy) = self.strategy {
            config.dedupe.strategy = strategy;
        }

        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }
}

/// Log to stderr, filtered by RUST_LOG (default: info).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            table,
            output,
            run_dir,
            runs_root,
            from_step,
            require_nutrition,
            tuning,
        } => {
            run::run(RunConfig {
                input,
                table: table.table,
                table_encoding: table.table_encoding,
                output,
                run_dir,
                runs_root,
                from_step,
                require_nutrition,
                resolve: tuning.resolve()?,
            })?;
        }
        Commands::Dedupe {
            input,
            output,
            log,
            tuning,
        } => {
            commands::dedupe(&input, &output, log.as_deref(), &tuning.resolve()?)?;
        }
        Commands::Enrich {
            input,
            table,
            output,
            tuning,
        } => {
            commands::enrich(
                &input,
                &table.table,
                table.table_encoding.as_deref(),
                &output,
                &tuning.resolve()?,
            )?;
        }
        Commands::Lookup {
            table,
            names,
            tuning,
        } => {
            commands::lookup(
                &table.table,
                table.table_encoding.as_deref(),
                &names,
                &tuning.resolve()?,
            )?;
        }
    }

    Ok(())
}
