//! Reference nutrient lookup for recipe ingredients.
//!
//! This crate provides the pieces shared by recipe deduplication and
//! nutrition enrichment:
//! - name normalization and Ratcliff/Obershelp / Jaccard similarity
//! - a reference nutrient table (nutrients per 100 g) with fuzzy lookup
//! - conversion of free-text quantities ("1/2 컵", "2 tbsp") to grams
//!
//! Data sources:
//! - National food-composition standard data (CSV, UTF-8 or EUC-KR)
//! - Embedded unit table of household measures
//!
//! # Example
//!
//! ```
//! use nutrient_table::{ReferenceNutrientIndex, UnitTable};
//!
//! let csv = "식품명,에너지(kcal),단백질(g)\n돼지고기,242,27\n";
//! let index = ReferenceNutrientIndex::from_csv_str(csv).unwrap();
//! let units = UnitTable::standard();
//!
//! if let Some(found) = index.find_best_match("돼지고기 앞다리살", 0.6) {
//!     let grams = units.to_grams("300", "g");
//!     let kcal = found.entry.calories * grams / 100.0;
//!     println!("{} -> {kcal} kcal", found.entry.name);
//! }
//! ```

mod charset;
mod error;
mod reference;
mod text;
mod units;

pub use charset::decode_table_bytes;
pub use error::TableError;
pub use reference::{
    ReferenceMatch, ReferenceNutrientEntry, ReferenceNutrientIndex, CONTAINMENT_SCORE,
    DEFAULT_REFERENCE_AMOUNT, EXACT_MATCH_SCORE,
};
pub use text::{jaccard, normalize_name, string_similarity};
pub use units::{parse_amount, UnitTable};
