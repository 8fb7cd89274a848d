//! Single-stage commands: dedupe, enrich, lookup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use larder_core::{
    deduplicate, enrich_records, load_reference_index, RecipeRecord, ResolveConfig,
};
use nutrient_table::UnitTable;
use serde::Serialize;

/// Read a JSON array of records.
pub fn read_records(path: &Path) -> Result<Vec<RecipeRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records JSON in {}", path.display()))
}

/// Write pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn units_for(config: &ResolveConfig) -> UnitTable {
    UnitTable::standard().with_default_piece_grams(config.default_piece_grams)
}

pub fn dedupe(
    input: &Path,
    output: &Path,
    log: Option<&Path>,
    config: &ResolveConfig,
) -> Result<()> {
    let records = read_records(input)?;
    let result = deduplicate(records, &config.dedupe);

    write_json(output, &result.records)?;
    if let Some(log) = log {
        write_json(log, &result.duplicates)?;
    }

    println!("Input records:    {}", result.stats.input);
    println!("Duplicate groups: {}", result.stats.groups);
    println!("Removed:          {}", result.stats.removed);
    println!("Output records:   {}", result.stats.output);
    println!("Output file:      {}", output.display());
    Ok(())
}

pub fn enrich(
    input: &Path,
    table: &Path,
    table_encoding: Option<&str>,
    output: &Path,
    config: &ResolveConfig,
) -> Result<()> {
    let index = load_reference_index(table, table_encoding)
        .context("Cannot enrich without a reference nutrient table")?;
    println!("Reference foods:   {}", index.len());

    let records = read_records(input)?;
    let result = enrich_records(records, &index, &units_for(config), &config.matching);
    write_json(output, &result.records)?;

    println!("Recipes:           {}", result.stats.total);
    println!("Fully matched:     {}", result.stats.fully_matched);
    println!("Partially matched: {}", result.stats.partially_matched);
    println!("Unmatched:         {}", result.stats.unmatched);
    println!("Kept existing:     {}", result.stats.kept_existing);
    println!("Output file:       {}", output.display());
    Ok(())
}

pub fn lookup(
    table: &Path,
    table_encoding: Option<&str>,
    names: &[String],
    config: &ResolveConfig,
) -> Result<()> {
    let index = load_reference_index(table, table_encoding)
        .context("Failed to load reference nutrient table")?;
    let threshold = config.matching.match_threshold;

    for name in names {
        match index.find_best_match(name, threshold) {
            Some(found) => println!(
                "{} -> {} ({:.2}, {} kcal / {})",
                name,
                found.entry.name,
                found.score,
                found.entry.calories,
                found.entry.reference_amount
            ),
            None => println!("{} -> no match at threshold {:.2}", name, threshold),
        }
    }
    Ok(())
}
