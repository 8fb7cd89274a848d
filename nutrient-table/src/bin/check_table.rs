//! Validate a reference nutrient table and report what was loaded.
//!
//! Usage:
//!   cargo run -p nutrient-table --bin check_table -- <table.csv> [encoding]
//!
//! Prints the number of foods and the rows whose energy value is zero,
//! which usually point at a column that failed to parse.

use std::path::PathBuf;
use std::process::ExitCode;

use nutrient_table::ReferenceNutrientIndex;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: check_table <table.csv> [encoding]");
        return ExitCode::FAILURE;
    };
    let encoding = args.next();

    let index = match ReferenceNutrientIndex::from_path(&path, encoding.as_deref()) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let zero_energy: Vec<&str> = index
        .iter()
        .filter(|e| e.calories == 0.0)
        .map(|e| e.name.as_str())
        .collect();

    println!("{}: {} foods", path.display(), index.len());
    if !zero_energy.is_empty() {
        println!("{} foods with 0 kcal:", zero_energy.len());
        for name in zero_energy.iter().take(20) {
            println!("  {name}");
        }
    }

    if index.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
