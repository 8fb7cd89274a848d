use nutrient_table::TableError;
use thiserror::Error;

/// Failure of the enrichment stage.
///
/// Deduplication never needs the reference table, so callers can still emit
/// deduplicated records when this is returned.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Reference nutrient table unavailable: {0}")]
    ReferenceTable(#[from] TableError),

    #[error("Reference nutrient table {0} contains no foods")]
    EmptyReferenceTable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write step output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize step output: {0}")]
    Serialize(#[from] serde_json::Error),
}
