//! Reference nutrient table and fuzzy name lookup.
//!
//! Nutrient values are stored per 100 g of the food, as published in the
//! national food-composition table. The table is read once and never
//! modified, so one index can serve any number of matching threads.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::charset::decode_table_bytes;
use crate::error::TableError;
use crate::text::{normalize_name, string_similarity};

/// Score reported for an exact normalized-name match.
pub const EXACT_MATCH_SCORE: f64 = 1.0;

/// Score assigned when one normalized name contains the other.
pub const CONTAINMENT_SCORE: f64 = 0.9;

/// Reference amount assumed when the table does not state one.
pub const DEFAULT_REFERENCE_AMOUNT: &str = "100g";

// =============================================================================
// Data structures
// =============================================================================

/// One food of the reference table, nutrients per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceNutrientEntry {
    pub name: String,
    /// kcal
    pub calories: f64,
    /// g
    pub protein: f64,
    /// g
    pub fat: f64,
    /// g
    pub carbs: f64,
    /// g
    pub sugar: f64,
    /// g
    pub fiber: f64,
    /// mg
    pub sodium: f64,
    /// mg
    pub calcium: f64,
    /// mg
    pub iron: f64,
    /// Informational label such as "100g".
    pub reference_amount: String,
}

impl ReferenceNutrientEntry {
    /// An entry with every nutrient zero.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calories: 0.0,
            protein: 0.0,
            fat: 0.0,
            carbs: 0.0,
            sugar: 0.0,
            fiber: 0.0,
            sodium: 0.0,
            calcium: 0.0,
            iron: 0.0,
            reference_amount: DEFAULT_REFERENCE_AMOUNT.to_string(),
        }
    }
}

/// Entry plus its precomputed comparison key.
#[derive(Debug, Clone)]
struct IndexedEntry {
    entry: ReferenceNutrientEntry,
    normalized: String,
}

/// Best reference entry found for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceMatch<'a> {
    pub entry: &'a ReferenceNutrientEntry,
    pub score: f64,
}

/// Immutable canonical-name → nutrient profile index.
#[derive(Debug, Clone, Default)]
pub struct ReferenceNutrientIndex {
    /// Entries in table order; lookups scan in this order.
    entries: Vec<IndexedEntry>,
    /// Canonical name -> position in `entries`
    positions: HashMap<String, usize>,
}

// =============================================================================
// Column mapping
// =============================================================================

/// Accepted header names for each column. The Korean names are those of the
/// national food-composition standard data export.
const NAME_COLUMNS: &[&str] = &["식품명", "food_name", "name"];
const CALORIE_COLUMNS: &[&str] = &["에너지(kcal)", "energy_kcal", "calories", "kcal"];
const PROTEIN_COLUMNS: &[&str] = &["단백질(g)", "protein_g", "protein"];
const FAT_COLUMNS: &[&str] = &["지방(g)", "fat_g", "fat"];
const CARB_COLUMNS: &[&str] = &["탄수화물(g)", "carbohydrate_g", "carbohydrate", "carbs"];
const SUGAR_COLUMNS: &[&str] = &["당류(g)", "sugar_g", "sugar"];
const FIBER_COLUMNS: &[&str] = &["식이섬유(g)", "fiber_g", "fiber"];
const SODIUM_COLUMNS: &[&str] = &["나트륨(mg)", "sodium_mg", "sodium"];
const CALCIUM_COLUMNS: &[&str] = &["칼슘(mg)", "calcium_mg", "calcium"];
const IRON_COLUMNS: &[&str] = &["철(mg)", "iron_mg", "iron"];
const REFERENCE_AMOUNT_COLUMNS: &[&str] = &["영양성분함량기준량", "reference_amount"];

/// Header positions resolved for one CSV file.
struct ColumnMap {
    name: usize,
    calories: Option<usize>,
    protein: Option<usize>,
    fat: Option<usize>,
    carbs: Option<usize>,
    sugar: Option<usize>,
    fiber: Option<usize>,
    sodium: Option<usize>,
    calcium: Option<usize>,
    iron: Option<usize>,
    reference_amount: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, TableError> {
        let headers: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias))
        };

        let name = find(NAME_COLUMNS)
            .ok_or_else(|| TableError::MissingNameColumn(NAME_COLUMNS.join(", ")))?;

        Ok(Self {
            name,
            calories: find(CALORIE_COLUMNS),
            protein: find(PROTEIN_COLUMNS),
            fat: find(FAT_COLUMNS),
            carbs: find(CARB_COLUMNS),
            sugar: find(SUGAR_COLUMNS),
            fiber: find(FIBER_COLUMNS),
            sodium: find(SODIUM_COLUMNS),
            calcium: find(CALCIUM_COLUMNS),
            iron: find(IRON_COLUMNS),
            reference_amount: find(REFERENCE_AMOUNT_COLUMNS),
        })
    }

    /// Build an entry from a row, or `None` if the row has no name.
    fn entry(&self, row: &csv::StringRecord) -> Option<ReferenceNutrientEntry> {
        let name = row.get(self.name).map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        let number = |column: Option<usize>| {
            column
                .and_then(|i| row.get(i))
                .map(parse_nutrient)
                .unwrap_or(0.0)
        };
        let reference_amount = self
            .reference_amount
            .and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_REFERENCE_AMOUNT);

        Some(ReferenceNutrientEntry {
            name: name.to_string(),
            calories: number(self.calories),
            protein: number(self.protein),
            fat: number(self.fat),
            carbs: number(self.carbs),
            sugar: number(self.sugar),
            fiber: number(self.fiber),
            sodium: number(self.sodium),
            calcium: number(self.calcium),
            iron: number(self.iron),
            reference_amount: reference_amount.to_string(),
        })
    }
}

/// Parse a nutrient cell. Blank, "-", negative or unparseable values are 0.
fn parse_nutrient(cell: &str) -> f64 {
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

// =============================================================================
// Loading
// =============================================================================

impl ReferenceNutrientIndex {
    /// Build an index from entries in table order.
    ///
    /// A repeated name keeps its first position and takes the later values.
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceNutrientEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    fn insert(&mut self, entry: ReferenceNutrientEntry) {
        if let Some(&pos) = self.positions.get(&entry.name) {
            self.entries[pos].entry = entry;
            return;
        }
        self.positions.insert(entry.name.clone(), self.entries.len());
        self.entries.push(IndexedEntry {
            normalized: normalize_name(&entry.name),
            entry,
        });
    }

    /// Parse a table from CSV text. Rows with an empty name are skipped.
    pub fn from_csv_str(text: &str) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let columns = ColumnMap::resolve(reader.headers()?)?;

        let mut index = Self::default();
        let mut skipped = 0usize;
        for row in reader.records() {
            match columns.entry(&row?) {
                Some(entry) => index.insert(entry),
                None => skipped += 1,
            }
        }

        tracing::debug!(entries = index.len(), skipped, "parsed reference table");
        Ok(index)
    }

    /// Parse a table from raw bytes, decoding with `encoding` or by detection.
    pub fn from_csv_bytes(bytes: &[u8], encoding: Option<&str>) -> Result<Self, TableError> {
        let text = decode_table_bytes(bytes, encoding)?;
        Self::from_csv_str(&text)
    }

    /// Read and parse a table file.
    pub fn from_path(path: &Path, encoding: Option<&str>) -> Result<Self, TableError> {
        let bytes = fs::read(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_csv_bytes(&bytes, encoding)?;
        tracing::info!(
            path = %path.display(),
            entries = index.len(),
            "loaded reference nutrient table"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its canonical (unnormalized) name.
    pub fn get(&self, name: &str) -> Option<&ReferenceNutrientEntry> {
        self.positions.get(name).map(|&pos| &self.entries[pos].entry)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceNutrientEntry> {
        self.entries.iter().map(|e| &e.entry)
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Find the reference entry that best matches `ingredient_name`.
    ///
    /// Scans the whole table (O(table size) per query, which dominates the
    /// cost of enrichment). For each candidate, comparing normalized names:
    /// 1. Exact match scores 1.0 and ends the scan
    /// 2. Containment in either direction scores 0.9
    /// 3. Otherwise the Ratcliff/Obershelp ratio is the score
    ///
    /// A candidate replaces the current best only if its score is strictly
    /// higher and at least `threshold`; ties keep the earlier table row.
    /// A query that normalizes to nothing matches nothing.
    pub fn find_best_match(
        &self,
        ingredient_name: &str,
        threshold: f64,
    ) -> Option<ReferenceMatch<'_>> {
        let query = normalize_name(ingredient_name);
        if query.is_empty() {
            return None;
        }

        let mut best: Option<&IndexedEntry> = None;
        let mut best_score = 0.0;

        for candidate in &self.entries {
            let key = candidate.normalized.as_str();
            if key.is_empty() {
                continue;
            }

            if key == query {
                return Some(ReferenceMatch {
                    entry: &candidate.entry,
                    score: EXACT_MATCH_SCORE,
                });
            }

            let contains = query.contains(key) || key.contains(query.as_str());
            if contains && CONTAINMENT_SCORE > best_score && CONTAINMENT_SCORE >= threshold {
                best = Some(candidate);
                best_score = CONTAINMENT_SCORE;
                continue;
            }

            let score = string_similarity(&query, key);
            if score > best_score && score >= threshold {
                best = Some(candidate);
                best_score = score;
            }
        }

        best.map(|candidate| ReferenceMatch {
            entry: &candidate.entry,
            score: best_score,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
