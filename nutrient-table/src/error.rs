use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown table encoding: {0}")]
    UnknownEncoding(String),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Reference table has no food name column (expected one of: {0})")]
    MissingNameColumn(String),

    #[error("Invalid unit table: {0}")]
    InvalidUnitTable(String),
}
