//! Loading tests for reference tables on disk.
//!
//! The fixtures hold the same rows in UTF-8 and EUC-KR, with the column
//! layout of the national food-composition export (extra columns included).

use nutrient_table::{ReferenceNutrientIndex, TableError};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn names(index: &ReferenceNutrientIndex) -> Vec<String> {
    index.iter().map(|e| e.name.clone()).collect()
}

#[test]
fn test_utf8_and_euc_kr_tables_agree() {
    let utf8 = ReferenceNutrientIndex::from_path(&fixture("food_standard_utf8.csv"), None)
        .expect("UTF-8 fixture should load");
    let euc_kr = ReferenceNutrientIndex::from_path(&fixture("food_standard_euckr.csv"), None)
        .expect("EUC-KR fixture should load");

    assert_eq!(utf8.len(), 5);
    assert_eq!(names(&utf8), names(&euc_kr));
    for entry in utf8.iter() {
        assert_eq!(Some(entry), euc_kr.get(&entry.name));
    }
}

#[test]
fn test_explicit_encoding_label() {
    let index =
        ReferenceNutrientIndex::from_path(&fixture("food_standard_euckr.csv"), Some("euc-kr"))
            .expect("EUC-KR fixture should load with explicit label");
    let rice = index.get("쌀밥").expect("쌀밥 should be present");
    assert_eq!(rice.calories, 143.0);
    assert_eq!(rice.reference_amount, "210g");
}

#[test]
fn test_columns_are_found_by_header_not_position() {
    let index = ReferenceNutrientIndex::from_path(&fixture("food_standard_utf8.csv"), None)
        .expect("UTF-8 fixture should load");
    let pork = index.get("돼지고기").expect("돼지고기 should be present");
    assert_eq!(pork.calories, 242.0);
    assert_eq!(pork.protein, 27.0);
    assert_eq!(pork.fat, 14.0);
    assert_eq!(pork.calcium, 10.0);
    assert_eq!(pork.iron, 1.2);
    assert_eq!(pork.sodium, 60.0);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let result = ReferenceNutrientIndex::from_path(&fixture("does_not_exist.csv"), None);
    assert!(matches!(result, Err(TableError::Io { .. })));
}

#[test]
fn test_lookup_against_fixture() {
    let index = ReferenceNutrientIndex::from_path(&fixture("food_standard_euckr.csv"), None)
        .expect("EUC-KR fixture should load");
    let found = index
        .find_best_match("국산 돼지고기", 0.6)
        .expect("돼지고기 should match by containment");
    assert_eq!(found.entry.name, "돼지고기");
}
